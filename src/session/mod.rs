//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher.rs (accept loop, one task per session)
//!     → handler.rs (indication stream → decode → authorize)
//!     → relay.rs (bidi echo loop ∥ uni relay loop)
//!     → session closed with code 0, reason "bye"
//! ```

pub mod dispatcher;
pub mod handler;
pub mod relay;

pub use dispatcher::Server;
pub use handler::{handle_session, SessionError};
pub use relay::RelayError;
