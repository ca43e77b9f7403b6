//! Transport capability consumed by the session layer.
//!
//! # Responsibilities
//! - Describe what the dispatcher and relay need from a multiplexed transport
//! - Make every blocking accept/open observe a shared cancellation token
//!
//! # Implementations
//! - `quic.rs`: QUIC connections via `quinn`
//! - `memory.rs`: in-process sessions over `tokio::io::duplex` pipes
//!
//! # Design Decisions
//! - Streams are plain `AsyncRead` / `AsyncWrite`; `shutdown()` finishes a send stream
//! - Trait futures are `Send` so sessions can run on spawned tasks
//! - Cancellation wraps the transport future instead of being threaded into it

use std::future::Future;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

pub mod memory;
pub mod quic;

/// Failure reported by the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The session or endpoint is gone.
    #[error("closed: {0}")]
    Closed(String),
    /// The lifetime token was cancelled while waiting.
    #[error("operation cancelled")]
    Cancelled,
}

impl TransportError {
    /// True when the error is an orderly end rather than a fault.
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Closed(_) | TransportError::Cancelled)
    }
}

/// Receiving half of a stream.
pub trait RecvStream: AsyncRead + Unpin + Send + 'static {
    fn id(&self) -> u64;
}

/// Sending half of a stream.
pub trait SendStream: AsyncWrite + Unpin + Send + 'static {
    fn id(&self) -> u64;
}

/// One authenticated, multiplexed connection.
pub trait Session: Send + Sync + 'static {
    type SendStream: SendStream;
    type RecvStream: RecvStream;

    /// Wait for the peer to open a unidirectional stream.
    fn accept_uni(&self) -> impl Future<Output = Result<Self::RecvStream, TransportError>> + Send;

    /// Wait for the peer to open a bidirectional stream.
    fn accept_bi(
        &self,
    ) -> impl Future<Output = Result<(Self::SendStream, Self::RecvStream), TransportError>> + Send;

    /// Open a unidirectional stream towards the peer, waiting for stream credit.
    fn open_uni(&self) -> impl Future<Output = Result<Self::SendStream, TransportError>> + Send;

    /// Close the session with an application error code and reason.
    fn close(&self, code: u32, reason: &str);

    fn remote_address(&self) -> String;

    /// TLS server name the client asked for, when known.
    fn server_name(&self) -> Option<String>;
}

/// Source of new sessions.
pub trait SessionListener: Send {
    type Session: Session;

    fn accept_session(&mut self) -> impl Future<Output = Result<Self::Session, TransportError>> + Send;
}

/// Run `fut` until it completes or `cancel` fires.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        result = fut => result,
    }
}
