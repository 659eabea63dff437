//! Users file backing the user directory and address book.
//!
//! ```toml
//! [[users]]
//! id = "u-1001"
//! name = "alice"
//! address = "alice@example.com"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use resetwatch_core::{AddressBook, DirectoryResponse, DirectoryUser, UserDirectory};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryFileError {
    #[error("failed to read users file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid users file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("users file {path} lists id {id} more than once")]
    DuplicateId { path: PathBuf, id: String },
    #[error("users file {path} lists name {name} more than once")]
    DuplicateName { path: PathBuf, name: String },
}

#[derive(Debug, Clone, Deserialize)]
struct UserEntry {
    id: String,
    name: String,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: Vec<UserEntry>,
}

#[derive(Debug, Default, Clone)]
pub struct FileDirectory {
    by_id: HashMap<String, UserEntry>,
    id_by_name: HashMap<String, String>,
}

impl FileDirectory {
    pub fn load(path: &Path) -> Result<Self, DirectoryFileError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DirectoryFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, DirectoryFileError> {
        let file: UsersFile = toml::from_str(contents).map_err(|err| DirectoryFileError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let mut directory = Self::default();
        for entry in file.users {
            if directory.by_id.contains_key(&entry.id) {
                return Err(DirectoryFileError::DuplicateId {
                    path: path.to_path_buf(),
                    id: entry.id,
                });
            }
            if directory.id_by_name.contains_key(&entry.name) {
                return Err(DirectoryFileError::DuplicateName {
                    path: path.to_path_buf(),
                    name: entry.name,
                });
            }
            directory
                .id_by_name
                .insert(entry.name.clone(), entry.id.clone());
            directory.by_id.insert(entry.id.clone(), entry);
        }
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn found(entry: &UserEntry) -> DirectoryResponse {
        DirectoryResponse::new(
            DirectoryUser {
                id: entry.id.clone(),
                name: entry.name.clone(),
            },
            resetwatch_core::ports::STATUS_OK,
        )
    }
}

#[async_trait]
impl UserDirectory for FileDirectory {
    async fn user_by_id(&self, user_id: &str) -> resetwatch_core::Result<DirectoryResponse> {
        Ok(self
            .by_id
            .get(user_id)
            .map(Self::found)
            .unwrap_or_else(DirectoryResponse::not_found))
    }

    async fn user_by_name(&self, username: &str) -> resetwatch_core::Result<DirectoryResponse> {
        Ok(self
            .id_by_name
            .get(username)
            .and_then(|id| self.by_id.get(id))
            .map(Self::found)
            .unwrap_or_else(DirectoryResponse::not_found))
    }
}

#[async_trait]
impl AddressBook for FileDirectory {
    async fn address_or_name(&self, user_id: &str) -> String {
        match self.by_id.get(user_id) {
            Some(entry) => entry
                .address
                .as_deref()
                .map(str::trim)
                .filter(|address| !address.is_empty())
                .unwrap_or(entry.name.as_str())
                .to_string(),
            None => String::new(),
        }
    }
}
