//! QUIC listener.
//!
//! # Responsibilities
//! - Bind a QUIC endpoint to the configured address
//! - Complete the QUIC/TLS handshake of incoming connections
//! - Hand established sessions to the dispatcher
//!
//! # Design Decisions
//! - Handshakes complete on their own tasks; a slow peer never blocks accept
//! - A failed handshake only drops that connection; the listener keeps going
//! - The endpoint going away is the only accept failure surfaced

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use quinn::{Connection, Endpoint};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::transport::{SessionListener, TransportError};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The bind address is not of the form `host:port`.
    #[error("invalid bind address '{address}': expected host:port")]
    Address { address: String },
    /// The host part of the bind address did not resolve.
    #[error("failed to resolve bind address '{address}': {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to bind the UDP socket.
    #[error("failed to bind: {0}")]
    Bind(#[source] std::io::Error),
}

/// A QUIC listener accepting QuicTransport sessions.
pub struct QuicListener {
    endpoint: Endpoint,
    established: mpsc::Receiver<Connection>,
    acceptor: JoinHandle<()>,
}

/// Handshaken connections buffered ahead of the dispatcher.
const ESTABLISHED_BACKLOG: usize = 128;

impl QuicListener {
    /// Bind to `bind_address` with the given server configuration.
    ///
    /// See [`resolve_bind_address`] for the accepted address forms.
    pub async fn bind(bind_address: &str, server_config: quinn::ServerConfig) -> Result<Self, ListenerError> {
        let addr = resolve_bind_address(bind_address).await?;

        let endpoint = Endpoint::server(server_config, addr).map_err(ListenerError::Bind)?;
        let local_addr = endpoint.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(address = %local_addr, "Listener bound");

        let (tx, established) = mpsc::channel(ESTABLISHED_BACKLOG);
        let acceptor = tokio::spawn(accept_loop(endpoint.clone(), tx));

        Ok(Self {
            endpoint,
            established,
            acceptor,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.endpoint.local_addr()
    }

    /// Stop accepting and close all connections.
    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"server shutdown");
    }
}

impl Drop for QuicListener {
    fn drop(&mut self) {
        self.acceptor.abort();
        self.close();
    }
}

impl SessionListener for QuicListener {
    type Session = Connection;

    async fn accept_session(&mut self) -> Result<Connection, TransportError> {
        self.established
            .recv()
            .await
            .ok_or_else(|| TransportError::Closed("endpoint closed".to_string()))
    }
}

/// Split `host:port`. The host may be empty, a name, an IPv4 address or a
/// bracketed IPv6 address; brackets are removed.
pub fn split_host_port(address: &str) -> Option<(&str, u16)> {
    let (host, port) = address.rsplit_once(':')?;
    let port = port.parse().ok()?;
    let host = match host.strip_prefix('[') {
        Some(inner) => inner.strip_suffix(']')?,
        None if host.contains(':') => return None,
        None => host,
    };
    Some((host, port))
}

/// Resolve a `host:port` bind address. An empty host (`:4433`) binds the
/// unspecified address; a name takes its first resolved address.
pub async fn resolve_bind_address(address: &str) -> Result<SocketAddr, ListenerError> {
    let (host, port) = split_host_port(address).ok_or_else(|| ListenerError::Address {
        address: address.to_string(),
    })?;

    if host.is_empty() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let resolve_error = |source| ListenerError::Resolve {
        address: address.to_string(),
        source,
    };
    tokio::net::lookup_host((host, port))
        .await
        .map_err(resolve_error)?
        .next()
        .ok_or_else(|| resolve_error(std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found")))
}

/// Accept incoming connections and finish each handshake on its own task.
async fn accept_loop(endpoint: Endpoint, established: mpsc::Sender<Connection>) {
    while let Some(incoming) = endpoint.accept().await {
        let established = established.clone();
        tokio::spawn(async move {
            let peer_addr = incoming.remote_address();
            match incoming.await {
                Ok(connection) => {
                    tracing::debug!(peer_addr = %peer_addr, "QUIC handshake complete");
                    let _ = established.send(connection).await;
                }
                Err(e) => {
                    tracing::warn!(peer_addr = %peer_addr, error = %e, "QUIC handshake failed");
                }
            }
        });
    }
    tracing::debug!("QUIC endpoint stopped accepting");
}
