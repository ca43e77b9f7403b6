//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Decoded client indication:
//!     → origin.rs (parse origin, resolve path, allow-list lookup)
//!     → Authorized: relay starts
//!     → Rejected: session closed, nothing sent to the peer
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any parse or lookup failure
//! - No trust in client input

pub mod origin;

pub use origin::{validate, AllowedOrigins, AuthorizationError};
