//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming QUIC connection
//!     → tls.rs (certificate chain + key, ALPN wq-vvv-01)
//!     → listener.rs (UDP endpoint, handshake, accept queue)
//!     → connection.rs (session id, state, active count)
//!     → Hand off to the session dispatcher
//! ```

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{SessionId, SessionState, SessionTracker};
pub use listener::{ListenerError, QuicListener};
