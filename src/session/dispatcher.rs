//! Session dispatcher: the server's accept loop.
//!
//! # Responsibilities
//! - Accept sessions from a listener until cancelled or the listener fails
//! - Run every session on its own task, owned by a `JoinSet`
//! - Enforce the optional concurrent session limit
//! - Drain sessions on shutdown, abandoning stragglers after a deadline
//!
//! # Design Decisions
//! - Listener accept failure is fatal and propagates; session errors never do
//! - Cancellation is a clean shutdown: `serve` returns `Ok(())`
//! - `SessionListener::accept_session` must be cancel-safe; it is raced
//!   against cancellation and task reaping

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, ServerConfig};
use crate::error::ServerError;
use crate::net::{tls, QuicListener, SessionTracker};
use crate::observability::metrics;
use crate::security::origin::AllowedOrigins;
use crate::session::handler::handle_session;
use crate::transport::{Session, SessionListener, TransportError};

/// QuicTransport server: owns the allow-list and the per-session tasks.
pub struct Server {
    allowed: Arc<AllowedOrigins>,
    tracker: SessionTracker,
    session_limit: Option<Arc<Semaphore>>,
    shutdown_timeout: Duration,
}

impl Server {
    /// Create a server from configuration. The allow-list is built here, once.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            allowed: Arc::new(AllowedOrigins::new(&config.origins.allowed)),
            tracker: SessionTracker::new(),
            session_limit: config.listener.max_sessions.map(|n| Arc::new(Semaphore::new(n))),
            shutdown_timeout: Duration::from_secs(config.lifecycle.shutdown_timeout_secs),
        }
    }

    /// Validate `config`, load the TLS identity, bind the QUIC listener and serve.
    pub async fn run(config: ServerConfig, cancel: CancellationToken) -> Result<(), ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let server_config = tls::load_server_config(
            Path::new(&config.listener.tls.cert_path),
            Path::new(&config.listener.tls.key_path),
        )?;
        let listener = QuicListener::bind(&config.listener.bind_address, server_config).await?;

        let server = Server::new(&config);
        tracing::info!(
            allowed_origins = server.allowed.len(),
            max_sessions = ?config.listener.max_sessions,
            "QuicTransport server ready"
        );
        server.serve(listener, cancel).await
    }

    /// The allow-list shared by all sessions.
    pub fn allowed_origins(&self) -> &AllowedOrigins {
        &self.allowed
    }

    /// Number of sessions currently being handled.
    pub fn active_sessions(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Accept sessions from `listener` until `cancel` fires or accept fails.
    pub async fn serve<L: SessionListener>(&self, mut listener: L, cancel: CancellationToken) -> Result<(), ServerError> {
        let mut sessions = JoinSet::new();

        let result = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Shutdown requested, no longer accepting sessions");
                    break Ok(());
                }
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Session task panicked");
                        }
                    }
                }
                accepted = next_session(&mut listener, self.session_limit.as_ref()) => {
                    match accepted {
                        Ok((session, permit)) => self.spawn_session(&mut sessions, session, permit, &cancel),
                        Err(e) => {
                            tracing::error!(error = %e, "Listener failed");
                            break Err(ServerError::Accept(e));
                        }
                    }
                }
            }
        };

        self.drain(&mut sessions).await;
        result
    }

    fn spawn_session<S: Session>(
        &self,
        sessions: &mut JoinSet<()>,
        session: S,
        permit: Option<OwnedSemaphorePermit>,
        cancel: &CancellationToken,
    ) {
        let guard = self.tracker.track();
        let session_id = guard.id();
        tracing::info!(
            session_id = %session_id,
            remote_addr = %session.remote_address(),
            "Session accepted"
        );
        metrics::record_session_accepted();
        metrics::record_active_sessions(self.tracker.active_count());

        let allowed = Arc::clone(&self.allowed);
        let tracker = self.tracker.clone();
        let cancel = cancel.clone();
        sessions.spawn(async move {
            let _permit = permit;
            // Errors are logged by the handler and end only this session.
            let _ = handle_session(Arc::new(session), session_id, allowed, cancel).await;
            drop(guard);
            metrics::record_active_sessions(tracker.active_count());
        });
    }

    async fn drain(&self, sessions: &mut JoinSet<()>) {
        if sessions.is_empty() {
            return;
        }
        tracing::info!(active_sessions = sessions.len(), "Draining sessions");

        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                abandoned = sessions.len(),
                timeout_secs = self.shutdown_timeout.as_secs(),
                "Shutdown deadline reached, aborting remaining sessions"
            );
            sessions.abort_all();
            while sessions.join_next().await.is_some() {}
        }
    }
}

/// Wait for a session slot, then for the next session.
async fn next_session<L: SessionListener>(
    listener: &mut L,
    limit: Option<&Arc<Semaphore>>,
) -> Result<(L::Session, Option<OwnedSemaphorePermit>), TransportError> {
    let permit = match limit {
        Some(limit) => Some(
            Arc::clone(limit)
                .acquire_owned()
                .await
                .map_err(|_| TransportError::Closed("session limit closed".to_string()))?,
        ),
        None => None,
    };
    let session = listener.accept_session().await?;
    Ok((session, permit))
}
