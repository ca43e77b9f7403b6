//! Per-session handshake and relay driver.
//!
//! # State Transitions
//! ```text
//! Accepted → IndicationReceived: first uni stream decoded
//! IndicationReceived → Authorized: origin/path pass the allow-list
//! Authorized → Relaying: uni loop spawned, bidi loop running
//! any state → Closed: error or relay end; session closed with 0 "bye"
//! ```
//!
//! # Design Decisions
//! - A failed handshake is a silent drop: nothing is written back to the peer
//! - The uni loop runs on its own task whose handle is aborted at teardown
//! - Reading the client indication observes the session's cancellation token

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::net::{SessionId, SessionState};
use crate::observability::metrics;
use crate::protocol::indication::{self, DecodeError};
use crate::security::origin::{self, AllowedOrigins, AuthorizationError};
use crate::session::relay::{self, RelayError};
use crate::transport::{self, Session, TransportError};

/// Application error code used on every session close.
pub const CLOSE_CODE: u32 = 0;
/// Close reason used on every session close.
pub const CLOSE_REASON: &str = "bye";

/// Error that ended a session. Never escapes the session's task.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to accept client indication stream: {0}")]
    Accept(#[source] TransportError),
    #[error("session cancelled while reading client indication")]
    Cancelled,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl SessionError {
    /// Short label for the rejection metric.
    fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            SessionError::Accept(_) => Some("accept"),
            SessionError::Decode(_) => Some("decode"),
            SessionError::Authorization(e) => Some(e.as_str()),
            SessionError::Cancelled | SessionError::Relay(_) => None,
        }
    }
}

/// Drive one session from acceptance to close.
///
/// The session is always closed with [`CLOSE_CODE`] / [`CLOSE_REASON`] before
/// returning. Returns the error that ended it, if any.
pub async fn handle_session<S: Session>(
    session: Arc<S>,
    session_id: SessionId,
    allowed: Arc<AllowedOrigins>,
    cancel: CancellationToken,
) -> Result<(), SessionError> {
    let result = run(&session, session_id, &allowed, &cancel).await;

    match &result {
        Ok(()) => {}
        Err(e) => {
            if let Some(reason) = e.rejection_reason() {
                metrics::record_session_rejected(reason);
            }
            match e {
                SessionError::Relay(relay) if relay.is_session_end() => {
                    tracing::info!(session_id = %session_id, reason = %e, "Session ended")
                }
                SessionError::Cancelled => tracing::info!(session_id = %session_id, reason = %e, "Session ended"),
                _ => tracing::error!(session_id = %session_id, error = %e, "Session failed"),
            }
        }
    }

    session.close(CLOSE_CODE, CLOSE_REASON);
    tracing::debug!(session_id = %session_id, state = %SessionState::Closed, "Session state");
    tracing::info!(session_id = %session_id, "Close session");
    result
}

async fn run<S: Session>(
    session: &Arc<S>,
    session_id: SessionId,
    allowed: &AllowedOrigins,
    cancel: &CancellationToken,
) -> Result<(), SessionError> {
    tracing::debug!(session_id = %session_id, state = %SessionState::Accepted, "Session state");
    tracing::info!(
        session_id = %session_id,
        server_name = session.server_name().as_deref().unwrap_or(""),
        "TLS server name"
    );

    let mut stream = transport::cancellable(cancel, session.accept_uni())
        .await
        .map_err(SessionError::Accept)?;
    tracing::info!(
        session_id = %session_id,
        stream_id = transport::RecvStream::id(&stream),
        "Unidirectional stream accepted"
    );

    let indication = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(SessionError::Cancelled),
        decoded = indication::decode(&mut stream) => decoded?,
    };
    tracing::debug!(session_id = %session_id, state = %SessionState::IndicationReceived, "Session state");
    tracing::info!(
        session_id = %session_id,
        origin = %indication.origin,
        path = %indication.path,
        "Client indication"
    );

    origin::validate(&indication, allowed)?;
    drop(stream);
    tracing::debug!(session_id = %session_id, state = %SessionState::Authorized, "Session state");

    let uni = {
        let session = Arc::clone(session);
        let cancel = cancel.clone();
        tokio::spawn(async move { relay::relay_unidirectional(&*session, session_id, &cancel).await })
    };
    tracing::debug!(session_id = %session_id, state = %SessionState::Relaying, "Session state");

    let bidi = relay::echo_bidirectional(&**session, session_id, cancel).await;

    if uni.is_finished() {
        match uni.await {
            Ok(Err(e)) if !e.is_session_end() => {
                tracing::error!(session_id = %session_id, error = %e, "Unidirectional relay failed")
            }
            Ok(Err(e)) => tracing::info!(session_id = %session_id, reason = %e, "Unidirectional relay ended"),
            Ok(Ok(())) => {}
            Err(e) => tracing::error!(session_id = %session_id, error = %e, "Unidirectional relay task failed"),
        }
    } else {
        uni.abort();
        tracing::debug!(session_id = %session_id, "Unidirectional relay aborted at session close");
    }

    bidi.map_err(SessionError::from)
}
