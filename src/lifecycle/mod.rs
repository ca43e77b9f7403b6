//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse flags → Load config → Init logging/metrics → Server::run
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Cancel token → Stop accepting → Drain sessions → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown has timeout: sessions still open after the deadline are aborted

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
