//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required settings present: bind address, certificate, private key
//! - Bind address has a host:port shape, metrics address parses, limits are positive
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before any socket is bound

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::net::listener::split_host_port;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address is not specified")]
    MissingBindAddress,
    #[error("listener.bind_address '{0}' is not of the form host:port")]
    InvalidBindAddress(String),
    #[error("listener.tls.cert_path is not specified")]
    MissingCertPath,
    #[error("listener.tls.key_path is not specified")]
    MissingKeyPath,
    #[error("listener.max_sessions must be greater than zero")]
    ZeroMaxSessions,
    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let bind = config.listener.bind_address.trim();
    if bind.is_empty() {
        errors.push(ValidationError::MissingBindAddress);
    } else if split_host_port(bind).is_none() {
        errors.push(ValidationError::InvalidBindAddress(bind.to_string()));
    }

    if config.listener.tls.cert_path.trim().is_empty() {
        errors.push(ValidationError::MissingCertPath);
    }
    if config.listener.tls.key_path.trim().is_empty() {
        errors.push(ValidationError::MissingKeyPath);
    }

    if config.listener.max_sessions == Some(0) {
        errors.push(ValidationError::ZeroMaxSessions);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
