//! Server-level errors that reach the process boundary.
//!
//! Session-scoped failures (`SessionError`) are logged and end only their
//! session; everything here is fatal.

use thiserror::Error;

use crate::config::ConfigError;
use crate::net::listener::ListenerError;
use crate::net::tls::TlsError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// Certificate or key could not be loaded.
    #[error("failed to load TLS identity: {0}")]
    Tls(#[from] TlsError),
    /// The QUIC endpoint could not be bound.
    #[error("failed to listen QUIC transport: {0}")]
    Listener(#[from] ListenerError),
    /// The listener stopped producing sessions.
    #[error("failed to accept client connection: {0}")]
    Accept(#[source] TransportError),
}
