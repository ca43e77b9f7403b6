//! Stream relay loops run on an authorized session.
//!
//! # Data Flow
//! ```text
//! peer bidi stream ──recv──▶ copy ──send──▶ same bidi stream   (echo)
//! peer uni stream  ──recv──▶ copy ──send──▶ new server uni     (pipe)
//! ```
//!
//! # Design Decisions
//! - Streams are served in accept order, one copy at a time per loop
//! - A failed copy ends the loop; the dispatcher then closes the session
//! - Cancellation interrupts accepts and opens, never an in-flight copy

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::net::SessionId;
use crate::observability::metrics;
use crate::transport::{self, RecvStream, SendStream, Session, TransportError};

/// Relay loop failure.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to accept {kind} stream: {source}")]
    Accept {
        kind: &'static str,
        #[source]
        source: TransportError,
    },
    #[error("failed to open unidirectional stream: {0}")]
    Open(#[source] TransportError),
    #[error("failed to copy stream {stream_id}: {source}")]
    Copy {
        stream_id: u64,
        #[source]
        source: std::io::Error,
    },
}

impl RelayError {
    /// True when the loop ended because the session went away or was cancelled.
    pub fn is_session_end(&self) -> bool {
        match self {
            RelayError::Accept { source, .. } | RelayError::Open(source) => source.is_closed(),
            RelayError::Copy { .. } => false,
        }
    }
}

/// Echo every peer-opened bidirectional stream back to itself.
///
/// Returns only on failure: accept failure (including session close and
/// cancellation) or a copy failure on any stream.
pub async fn echo_bidirectional<S: Session>(
    session: &S,
    session_id: SessionId,
    cancel: &CancellationToken,
) -> Result<(), RelayError> {
    loop {
        let (mut send, mut recv) = transport::cancellable(cancel, session.accept_bi())
            .await
            .map_err(|source| RelayError::Accept { kind: "bidirectional", source })?;
        let stream_id = recv.id();
        tracing::info!(session_id = %session_id, stream_id, "Bidirectional stream accepted");

        let copied = tokio::io::copy(&mut recv, &mut send)
            .await
            .map_err(|source| RelayError::Copy { stream_id, source })?;
        send.shutdown()
            .await
            .map_err(|source| RelayError::Copy { stream_id, source })?;

        tracing::debug!(session_id = %session_id, stream_id, bytes = copied, "Bidirectional stream echoed");
        metrics::record_stream_relayed("bidi", copied);
    }
}

/// Pipe every peer-opened unidirectional stream onto a new server-opened one.
///
/// The outbound stream is finished whether the copy succeeds or fails.
pub async fn relay_unidirectional<S: Session>(
    session: &S,
    session_id: SessionId,
    cancel: &CancellationToken,
) -> Result<(), RelayError> {
    loop {
        let mut recv = transport::cancellable(cancel, session.accept_uni())
            .await
            .map_err(|source| RelayError::Accept { kind: "unidirectional", source })?;
        let stream_id = recv.id();
        tracing::info!(session_id = %session_id, stream_id, "Unidirectional stream accepted");

        let mut send = transport::cancellable(cancel, session.open_uni())
            .await
            .map_err(RelayError::Open)?;
        tracing::info!(session_id = %session_id, stream_id = send.id(), "Unidirectional stream opened");

        let copied = tokio::io::copy(&mut recv, &mut send).await;
        let finished = send.shutdown().await;
        let copied = copied.map_err(|source| RelayError::Copy { stream_id, source })?;
        finished.map_err(|source| RelayError::Copy { stream_id, source })?;

        tracing::debug!(session_id = %session_id, stream_id, bytes = copied, "Unidirectional stream relayed");
        metrics::record_stream_relayed("uni", copied);
    }
}
