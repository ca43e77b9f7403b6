//! QuicTransport session bootstrap and stream relay library.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod security;
pub mod session;
pub mod transport;

pub use config::schema::ServerConfig;
pub use error::ServerError;
pub use lifecycle::Shutdown;
pub use session::Server;
