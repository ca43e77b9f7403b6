//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read and parse a TOML file without validating it.
///
/// Used when further overrides are applied before the final check.
pub fn read_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let config = read_config(path)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:4433");
        assert_eq!(config.listener.tls.cert_path, "cert.pem");
        assert_eq!(config.origins.allowed, vec!["localhost".to_string()]);
        assert!(!config.observability.debug);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9443"
            max_sessions = 64

            [listener.tls]
            cert_path = "/etc/qt/cert.pem"

            [origins]
            allowed = ["example.com", "localhost"]
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9443");
        assert_eq!(config.listener.max_sessions, Some(64));
        assert_eq!(config.listener.tls.cert_path, "/etc/qt/cert.pem");
        assert_eq!(config.listener.tls.key_path, "key.pem");
        assert_eq!(config.origins.allowed.len(), 2);
        assert_eq!(config.lifecycle.shutdown_timeout_secs, 10);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"\"").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors, vec![ValidationError::MissingBindAddress]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn read_skips_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"\"").unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "");
    }

    #[test]
    fn load_reports_syntax_and_io_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));

        let missing = file.path().with_extension("missing");
        assert!(matches!(load_config(&missing), Err(ConfigError::Io(_))));
    }
}
