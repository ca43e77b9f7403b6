//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs overrides (flags win over file values)
//!     → validation.rs (semantic checks on the merged result)
//!     → ServerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the allow-list is built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, read_config, ConfigError};
pub use schema::{LifecycleConfig, ListenerConfig, ObservabilityConfig, OriginsConfig, ServerConfig, TlsConfig};
