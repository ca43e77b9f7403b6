//! End-to-end tests over real QUIC on loopback with a self-signed certificate.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quic_transport_server::config::ServerConfig;
use quic_transport_server::net::{tls, QuicListener};
use quic_transport_server::protocol::{indication, ClientIndication, ALPN_QUIC_TRANSPORT};
use quic_transport_server::{Server, ServerError};
use quinn::crypto::rustls::QuicClientConfig;
use rustls::pki_types::CertificateDer;
use tokio_util::sync::CancellationToken;

struct Identity {
    cert_der: CertificateDer<'static>,
    cert_file: tempfile::NamedTempFile,
    key_file: tempfile::NamedTempFile,
}

fn identity() -> Identity {
    let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let mut cert_file = tempfile::NamedTempFile::new().unwrap();
    cert_file.write_all(generated.cert.pem().as_bytes()).unwrap();
    let mut key_file = tempfile::NamedTempFile::new().unwrap();
    key_file.write_all(generated.key_pair.serialize_pem().as_bytes()).unwrap();

    Identity {
        cert_der: generated.cert.der().clone(),
        cert_file,
        key_file,
    }
}

fn client_endpoint(cert: CertificateDer<'static>) -> quinn::Endpoint {
    let mut roots = rustls::RootCertStore::empty();
    roots.add(cert).unwrap();

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut crypto = rustls::ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    crypto.alpn_protocols = vec![ALPN_QUIC_TRANSPORT.to_vec()];

    let mut endpoint = quinn::Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap();
    endpoint.set_default_client_config(quinn::ClientConfig::new(Arc::new(
        QuicClientConfig::try_from(crypto).unwrap(),
    )));
    endpoint
}

async fn start_server(
    identity: &Identity,
    allowed: impl FnOnce(SocketAddr) -> Vec<String>,
) -> (SocketAddr, CancellationToken, tokio::task::JoinHandle<Result<(), ServerError>>) {
    let server_config = tls::load_server_config(identity.cert_file.path(), identity.key_file.path()).unwrap();
    let listener = QuicListener::bind("127.0.0.1:0", server_config).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ServerConfig::default();
    config.origins.allowed = allowed(addr);
    config.lifecycle.shutdown_timeout_secs = 1;

    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { Server::new(&config).serve(listener, cancel).await })
    };
    (addr, cancel, handle)
}

async fn send_indication(connection: &quinn::Connection, origin: &str, path: &str) {
    let mut stream = connection.open_uni().await.unwrap();
    stream
        .write_all(&indication::encode(&ClientIndication::new(origin, path)).unwrap())
        .await
        .unwrap();
    stream.finish().unwrap();
}

#[tokio::test]
async fn authorized_client_gets_echo_and_pipe() {
    let identity = identity();
    let (addr, cancel, handle) = start_server(&identity, |addr| vec![format!("localhost:{}", addr.port())]).await;
    let client = client_endpoint(identity.cert_der.clone());

    let connection = client.connect(addr, "localhost").unwrap().await.unwrap();
    send_indication(&connection, &format!("https://localhost:{}", addr.port()), "/echo").await;

    let (mut send, mut recv) = connection.open_bi().await.unwrap();
    send.write_all(b"hello over quic").await.unwrap();
    send.finish().unwrap();
    let echoed = tokio::time::timeout(Duration::from_secs(5), recv.read_to_end(1024))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echoed, b"hello over quic");

    let mut uni = connection.open_uni().await.unwrap();
    uni.write_all(b"piped").await.unwrap();
    uni.finish().unwrap();
    let mut incoming = tokio::time::timeout(Duration::from_secs(5), connection.accept_uni())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(incoming.read_to_end(1024).await.unwrap(), b"piped");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn unauthorized_client_is_closed_with_bye() {
    let identity = identity();
    let (addr, cancel, handle) = start_server(&identity, |_| vec!["localhost".to_string()]).await;
    let client = client_endpoint(identity.cert_der.clone());

    let connection = client.connect(addr, "localhost").unwrap().await.unwrap();
    // Only the bare host is listed, so an origin naming the port is refused.
    send_indication(&connection, &format!("https://localhost:{}", addr.port()), "/app").await;

    let reason = tokio::time::timeout(Duration::from_secs(5), connection.closed())
        .await
        .unwrap();
    match reason {
        quinn::ConnectionError::ApplicationClosed(close) => {
            assert_eq!(close.error_code, quinn::VarInt::from_u32(0));
            assert_eq!(&close.reason[..], b"bye");
        }
        other => panic!("expected application close, got {:?}", other),
    }

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
