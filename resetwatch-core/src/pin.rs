//! Reset PIN generation.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::error::{ResetError, Result};

/// Bytes of entropy behind every PIN (256 bits).
pub const PIN_ENTROPY_BYTES: usize = 32;

/// Generate a fresh reset PIN.
///
/// The PIN is URL-safe base64 without padding, so it can be embedded in a
/// reset link query string as-is.
pub fn generate_pin() -> Result<String> {
    let mut rng = OsRng;
    let mut bytes = [0u8; PIN_ENTROPY_BYTES];

    rng.try_fill_bytes(&mut bytes)
        .map_err(|_| ResetError::TokenGeneration)?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_are_url_safe_and_distinct() {
        let first = generate_pin().unwrap();
        let second = generate_pin().unwrap();

        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_eq!(URL_SAFE_NO_PAD.decode(&first).unwrap().len(), PIN_ENTROPY_BYTES);
    }
}
