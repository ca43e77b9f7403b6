//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate; with no subscriber installed every event is
//!   dropped, which is the no-op logger for embedders and tests
//! - `debug` switches the default filter from info to debug
//! - `RUST_LOG` overrides the default filter

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for the given verbosity.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "quic_transport_server=debug,info"
    } else {
        "quic_transport_server=info,warn"
    }
}

/// Install the global fmt subscriber.
///
/// Returns an error if a global subscriber is already set.
pub fn init(debug: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(debug).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_toggle_changes_filter() {
        assert!(default_directive(true).contains("=debug"));
        assert!(default_directive(false).contains("=info"));
        assert!(default_directive(true).parse::<EnvFilter>().is_ok());
        assert!(default_directive(false).parse::<EnvFilter>().is_ok());
    }
}
