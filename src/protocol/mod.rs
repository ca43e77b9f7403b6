//! QuicTransport handshake protocol.
//!
//! # Data Flow
//! ```text
//! First peer-opened unidirectional stream
//!     → indication.rs (bounded KLV decode)
//!     → ClientIndication { origin, path }
//!     → security::origin (authorization)
//! ```
//!
//! # Design Decisions
//! - The indication stream is read through a 65535-byte limit; the peer
//!   cannot make the server buffer more than that
//! - Unknown keys are skipped, not rejected, so new keys stay compatible
//! - Emptiness of fields is an authorization concern, not a decode error

pub mod indication;

pub use indication::{ClientIndication, DecodeError, EncodeError, IndicationKey};

/// ALPN protocol identifier negotiated during the TLS handshake.
pub const ALPN_QUIC_TRANSPORT: &[u8] = b"wq-vvv-01";
