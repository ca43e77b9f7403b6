//! Shared utilities for integration tests.

use std::sync::Arc;

use quic_transport_server::config::ServerConfig;
use quic_transport_server::protocol::{indication, ClientIndication};
use quic_transport_server::transport::memory::{self, MemoryClient, MemoryConnector};
use quic_transport_server::{Server, ServerError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// An in-memory server running on a background task.
pub struct MemoryServer {
    pub connector: MemoryConnector,
    pub server: Arc<Server>,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

/// Start a server over the in-memory transport with the given allow-list.
pub fn start_memory_server(allowed: &[&str]) -> MemoryServer {
    let mut config = ServerConfig::default();
    config.origins.allowed = allowed.iter().map(|s| s.to_string()).collect();
    config.lifecycle.shutdown_timeout_secs = 2;

    let (listener, connector) = memory::listener();
    let server = Arc::new(Server::new(&config));
    let cancel = CancellationToken::new();

    let handle = {
        let server = Arc::clone(&server);
        let cancel = cancel.clone();
        tokio::spawn(async move { server.serve(listener, cancel).await })
    };

    MemoryServer {
        connector,
        server,
        cancel,
        handle,
    }
}

/// Connect and send a client indication on the first unidirectional stream.
pub async fn connect_with_indication(connector: &MemoryConnector, origin: &str, path: &str) -> MemoryClient {
    let client = connector.connect("127.0.0.1:50000").await.unwrap();
    let bytes = indication::encode(&ClientIndication::new(origin, path)).unwrap();
    let mut stream = client.open_uni().await.unwrap();
    stream.write_all(&bytes).await.unwrap();
    stream.shutdown().await.unwrap();
    client
}

/// Write `payload` on a new bidirectional stream and read back the echo.
pub async fn echo_roundtrip(client: &MemoryClient, payload: &[u8]) -> Vec<u8> {
    let mut stream = client.open_bi().await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut echoed = Vec::new();
    stream.read_to_end(&mut echoed).await.unwrap();
    echoed
}
