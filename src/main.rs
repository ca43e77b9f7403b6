//! QuicTransport server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                 QUIC TRANSPORT SERVER                │
//!                       │                                                      │
//!   QUIC connection     │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!   ────────────────────┼─▶│   net   │───▶│  session   │───▶│   protocol   │   │
//!                       │  │listener │    │ dispatcher │    │  indication  │   │
//!                       │  └─────────┘    └─────┬──────┘    └──────┬───────┘   │
//!                       │                       │                  ▼           │
//!                       │                       │           ┌──────────────┐   │
//!                       │                       │           │   security   │   │
//!                       │                       │           │    origin    │   │
//!                       │                       ▼           └──────────────┘   │
//!   echoed / piped      │                ┌────────────┐                        │
//!   ◀───────────────────┼────────────────│   relay    │                        │
//!   streams             │                │ bidi ∥ uni │                        │
//!                       │                └────────────┘                        │
//!                       │  config · observability · lifecycle                  │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;
use quic_transport_server::config::Cli;
use quic_transport_server::lifecycle::{signals, Shutdown};
use quic_transport_server::observability::{logging, metrics};
use quic_transport_server::Server;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug;

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(debug);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.observability.debug);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        cert_path = %config.listener.tls.cert_path,
        allowed_origins = ?config.origins.allowed,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    match Server::run(config, shutdown.token()).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

/// Install the log subscriber, reporting failure on stderr since logging is unavailable.
fn init_logging(debug: bool) {
    if let Err(e) = logging::init(debug) {
        eprintln!("failed to initialize logging: {}", e);
    }
}
