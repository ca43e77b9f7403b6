//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "quic-transport-server")]
#[command(about = "QuicTransport session bootstrap and stream relay server", long_about = None)]
pub struct Cli {
    /// TOML configuration file; flags override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind [default: 0.0.0.0:4433]
    #[arg(long)]
    pub addr: Option<String>,

    /// TLS certificate file [default: cert.pem]
    #[arg(long)]
    pub cert: Option<String>,

    /// TLS private key file [default: key.pem]
    #[arg(long)]
    pub key: Option<String>,

    /// Allowed origin, appended to the configured list (repeatable)
    #[arg(long = "allowed", value_name = "ORIGIN")]
    pub allowed: Vec<String>,

    /// Show debug messages
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Read the config file if one was given, then apply flag overrides.
    ///
    /// The merged result is not validated here; `Server::run` checks it.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };
        Ok(self.apply(config))
    }

    /// Apply flag overrides to `config`.
    pub fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(addr) = self.addr {
            config.listener.bind_address = addr;
        }
        if let Some(cert) = self.cert {
            config.listener.tls.cert_path = cert;
        }
        if let Some(key) = self.key {
            config.listener.tls.key_path = key;
        }
        config.origins.allowed.extend(self.allowed);
        if self.debug {
            config.observability.debug = true;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::validate_config;
    use std::io::Write;

    #[test]
    fn no_flags_keep_defaults() {
        let config = Cli::try_parse_from(["quic-transport-server"]).unwrap().apply(ServerConfig::default());
        assert_eq!(config.listener.bind_address, "0.0.0.0:4433");
        assert_eq!(config.listener.tls.key_path, "key.pem");
        assert_eq!(config.origins.allowed, vec!["localhost".to_string()]);
        assert!(!config.observability.debug);
    }

    #[test]
    fn flags_override_and_append() {
        let cli = Cli::try_parse_from([
            "quic-transport-server",
            "--addr",
            "127.0.0.1:5000",
            "--cert",
            "server.crt",
            "--allowed",
            "example.com",
            "--allowed",
            "example.org",
            "--debug",
        ])
        .unwrap();
        let config = cli.apply(ServerConfig::default());

        assert_eq!(config.listener.bind_address, "127.0.0.1:5000");
        assert_eq!(config.listener.tls.cert_path, "server.crt");
        assert_eq!(config.listener.tls.key_path, "key.pem");
        assert_eq!(config.origins.allowed, vec!["localhost", "example.com", "example.org"]);
        assert!(config.observability.debug);
    }

    #[test]
    fn flag_overrides_invalid_file_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"\"\n\n[origins]\nallowed = [\"example.com\"]").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["quic-transport-server", "--config", path, "--addr", "0.0.0.0:4433"]).unwrap();
        let config = cli.into_config().unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:4433");
        assert_eq!(config.origins.allowed, vec!["example.com"]);
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["quic-transport-server", "--config", "/nonexistent/qt.toml"]).unwrap();
        assert!(matches!(cli.into_config(), Err(ConfigError::Io(_))));
    }
}
