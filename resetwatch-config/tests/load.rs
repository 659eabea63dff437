//! Loader behaviour against temporary search roots and injected environments.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use resetwatch_config::{ConfigLoadError, ConfigLoader, ConfigSource};
use resetwatch_core::fs_watch::DEFAULT_CHANNEL_CAPACITY;

const NO_ENV: [(&str, &str); 0] = [];

#[test]
fn empty_root_falls_back_to_defaults() -> Result<()> {
    let root = tempfile::tempdir()?;
    let load = ConfigLoader::with_env(NO_ENV).search_root(root.path()).load()?;

    assert_eq!(load.source, ConfigSource::Default);
    assert_eq!(load.config.password_resets.file_marker, "passwordreset");
    assert_eq!(load.config.password_resets.internal_lifetime_minutes, 30);
    assert_eq!(
        load.config.password_resets.channel_capacity,
        DEFAULT_CHANNEL_CAPACITY
    );
    assert!(load.config.notifications.enabled);
    assert!(load.config.password_resets.watch_settings().is_none());
    assert!(!load.config.password_resets.link_builder().is_enabled());
    assert_eq!(load.warnings.items.len(), 2);
    Ok(())
}

#[test]
fn default_toml_file_is_discovered() -> Result<()> {
    let root = tempfile::tempdir()?;
    fs::write(
        root.path().join("resetwatch.toml"),
        r#"
[password_resets]
watch_directory = "/var/lib/identity/resets"
url_base = "https://accounts.example.com/"
channel_capacity = 8
"#,
    )?;

    let load = ConfigLoader::with_env(NO_ENV).search_root(root.path()).load()?;

    assert_eq!(
        load.source,
        ConfigSource::File(root.path().join("resetwatch.toml"))
    );
    let watch = load
        .config
        .password_resets
        .watch_settings()
        .expect("watch settings");
    assert_eq!(watch.directory, PathBuf::from("/var/lib/identity/resets"));
    assert_eq!(watch.channel_capacity, 8);
    assert_eq!(
        load.config.password_resets.link_builder().link("abc")?,
        "https://accounts.example.com/reset?pin=abc"
    );
    assert!(load.warnings.is_empty());
    Ok(())
}

#[test]
fn nested_json_candidate_is_used_when_no_root_file_exists() -> Result<()> {
    let root = tempfile::tempdir()?;
    fs::create_dir_all(root.path().join("config"))?;
    let path = root.path().join("config/resetwatch.json");
    fs::write(&path, r#"{"notifications": {"enabled": false}}"#)?;

    let load = ConfigLoader::with_env(NO_ENV).search_root(root.path()).load()?;

    assert_eq!(load.source, ConfigSource::File(path));
    assert!(!load.config.notifications.enabled);
    assert!(!load.config.processor_settings().notifications_enabled);
    Ok(())
}

#[test]
fn env_path_wins_over_inline_json_and_default_files() -> Result<()> {
    let root = tempfile::tempdir()?;
    fs::write(
        root.path().join("resetwatch.toml"),
        "[password_resets]\nfile_marker = \"from-default\"\n",
    )?;
    let explicit = root.path().join("explicit.conf");
    fs::write(&explicit, "[password_resets]\nfile_marker = \"from-env-path\"\n")?;

    let load = ConfigLoader::with_env([
        ("RESETWATCH_CONFIG_PATH", explicit.to_string_lossy().into_owned()),
        (
            "RESETWATCH_CONFIG_JSON",
            r#"{"password_resets": {"file_marker": "from-inline"}}"#.to_string(),
        ),
    ])
    .search_root(root.path())
    .load()?;

    assert_eq!(load.source, ConfigSource::EnvPath(explicit));
    assert_eq!(load.config.password_resets.file_marker, "from-env-path");
    Ok(())
}

#[test]
fn inline_json_wins_over_default_files() -> Result<()> {
    let root = tempfile::tempdir()?;
    fs::write(
        root.path().join("resetwatch.toml"),
        "[password_resets]\nfile_marker = \"from-default\"\n",
    )?;

    let load = ConfigLoader::with_env([(
        "RESETWATCH_CONFIG_JSON",
        r#"{"password_resets": {"file_marker": "from-inline", "internal_lifetime_minutes": 10}}"#,
    )])
    .search_root(root.path())
    .load()?;

    assert_eq!(load.source, ConfigSource::EnvInline);
    assert_eq!(load.config.password_resets.file_marker, "from-inline");
    assert_eq!(
        load.config.password_resets.internal_lifetime(),
        chrono::Duration::minutes(10)
    );
    Ok(())
}

#[test]
fn env_overrides_apply_on_top_of_file_values() -> Result<()> {
    let root = tempfile::tempdir()?;
    fs::write(
        root.path().join("resetwatch.toml"),
        r#"
[password_resets]
watch_directory = "/from/file"
url_base = "https://file.example.com"

[notifications]
enabled = true
"#,
    )?;

    let load = ConfigLoader::with_env([
        ("RESETWATCH_WATCH_DIRECTORY", "/from/env"),
        ("RESETWATCH_URL_BASE", "https://env.example.com"),
        ("RESETWATCH_NOTIFICATIONS_ENABLED", "off"),
    ])
    .search_root(root.path())
    .load()?;

    let resets = &load.config.password_resets;
    assert_eq!(resets.watch_directory, Some(PathBuf::from("/from/env")));
    assert_eq!(resets.url_base.as_deref(), Some("https://env.example.com"));
    assert!(!load.config.notifications.enabled);
    Ok(())
}

#[test]
fn blank_values_are_normalized_away() -> Result<()> {
    let root = tempfile::tempdir()?;
    let load = ConfigLoader::with_env([(
        "RESETWATCH_CONFIG_JSON",
        r#"{"password_resets": {"watch_directory": "", "url_base": "   ", "file_marker": " "}}"#,
    )])
    .search_root(root.path())
    .load()?;

    let resets = &load.config.password_resets;
    assert_eq!(resets.watch_directory, None);
    assert_eq!(resets.url_base, None);
    assert_eq!(resets.file_marker, "passwordreset");
    Ok(())
}

#[test]
fn invalid_flag_is_rejected() -> Result<()> {
    let root = tempfile::tempdir()?;
    let err = ConfigLoader::with_env([("RESETWATCH_NOTIFICATIONS_ENABLED", "sometimes")])
        .search_root(root.path())
        .load()
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigLoadError::InvalidFlag { value, .. } if value == "sometimes"
    ));
    Ok(())
}

#[test]
fn malformed_inline_json_reports_origin() -> Result<()> {
    let root = tempfile::tempdir()?;
    let err = ConfigLoader::with_env([("RESETWATCH_CONFIG_JSON", "{not json")])
        .search_root(root.path())
        .load()
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigLoadError::Parse { ref origin, .. } if origin == "RESETWATCH_CONFIG_JSON"
    ));
    Ok(())
}

#[test]
fn missing_env_path_is_an_io_error() -> Result<()> {
    let root = tempfile::tempdir()?;
    let missing = root.path().join("nope.toml");
    let err = ConfigLoader::with_env([(
        "RESETWATCH_CONFIG_PATH",
        missing.to_string_lossy().into_owned(),
    )])
    .search_root(root.path())
    .load()
    .unwrap_err();

    assert!(matches!(err, ConfigLoadError::Io { path, .. } if path == missing));
    Ok(())
}
