//! # Config loading tests
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test config_test
//! ```

use std::io::Write;
use tempfile::NamedTempFile;

use story_audio_api::config::AppConfig;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_minimal_config_gets_defaults() {
    let file = write_config(
        r#"
database_path = "/tmp/stories.db"
admin_token = "s3cret"
"#,
    );
    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.admin_token, "s3cret");
    assert_eq!(config.archive.fetch_timeout_secs, 5);
    assert!(config.archive.metadata_url.starts_with("https://archive.org/"));
}

#[test]
fn test_explicit_values_override_defaults() {
    let file = write_config(
        r#"
port = 9000
database_path = "/tmp/stories.db"
admin_token = "s3cret"

[archive]
metadata_url = "https://mirror.example.com/metadata"
download_url = "https://mirror.example.com/download"
fetch_timeout_secs = 2
"#,
    );
    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.port, 9000);
    assert_eq!(config.archive.metadata_url, "https://mirror.example.com/metadata");
    assert_eq!(config.archive.fetch_timeout_secs, 2);
}

#[test]
fn test_missing_admin_token_fails() {
    let file = write_config(
        r#"
database_path = "/tmp/stories.db"
"#,
    );
    let err = AppConfig::load(file.path()).unwrap_err();
    assert!(err.contains("admin_token"), "got: {}", err);
}

#[test]
fn test_blank_admin_token_fails() {
    let file = write_config(
        r#"
database_path = "/tmp/stories.db"
admin_token = "   "
"#,
    );
    let err = AppConfig::load(file.path()).unwrap_err();
    assert!(err.contains("admin_token"), "got: {}", err);
}

#[test]
fn test_zero_fetch_timeout_fails() {
    let file = write_config(
        r#"
database_path = "/tmp/stories.db"
admin_token = "s3cret"

[archive]
fetch_timeout_secs = 0
"#,
    );
    let err = AppConfig::load(file.path()).unwrap_err();
    assert!(err.contains("fetch_timeout_secs"), "got: {}", err);
}

#[test]
fn test_missing_file_fails() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/config.toml")).unwrap_err();
    assert!(err.contains("Failed to read config file"));
}
