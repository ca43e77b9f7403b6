//! In-process transport built from `tokio::io::duplex` pipes.
//!
//! A [`MemoryListener`] hands out server-side [`MemorySession`]s; the matching
//! [`MemoryClient`] drives the peer side. Useful for embedding the relay
//! without a network and for exercising the session layer in tests.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{RecvStream, SendStream, Session, SessionListener, TransportError};

/// Capacity of each in-memory pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Streams queued per direction before an opener waits.
const STREAM_BACKLOG: usize = 32;

/// Server side of an in-memory stream.
pub struct MemoryRecvStream {
    id: u64,
    inner: ReadHalf<DuplexStream>,
}

impl AsyncRead for MemoryRecvStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl RecvStream for MemoryRecvStream {
    fn id(&self) -> u64 {
        self.id
    }
}

/// Server side of an in-memory stream.
pub struct MemorySendStream {
    id: u64,
    inner: WriteHalf<DuplexStream>,
}

impl AsyncWrite for MemorySendStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl SendStream for MemorySendStream {
    fn id(&self) -> u64 {
        self.id
    }
}

/// State shared by both ends of one session.
struct Shared {
    closed: CancellationToken,
    close_reason: StdMutex<Option<(u32, String)>>,
}

impl Shared {
    fn close(&self, code: u32, reason: &str) {
        let mut slot = self.close_reason.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some((code, reason.to_string()));
        }
        self.closed.cancel();
    }
}

/// Server side of an in-memory session.
pub struct MemorySession {
    remote_address: String,
    server_name: Option<String>,
    shared: Arc<Shared>,
    next_stream_id: AtomicU64,
    incoming_uni: Mutex<mpsc::Receiver<DuplexStream>>,
    incoming_bi: Mutex<mpsc::Receiver<DuplexStream>>,
    outgoing_uni: mpsc::Sender<DuplexStream>,
}

impl MemorySession {
    fn stream_id(&self) -> u64 {
        self.next_stream_id.fetch_add(1, Ordering::Relaxed)
    }

    fn closed_error(&self) -> TransportError {
        match self.shared.close_reason.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some((code, reason)) => TransportError::Closed(format!("closed by application ({}): {}", code, reason)),
            None => TransportError::Closed("session closed".to_string()),
        }
    }

    async fn next_incoming(&self, queue: &Mutex<mpsc::Receiver<DuplexStream>>) -> Result<DuplexStream, TransportError> {
        let mut queue = queue.lock().await;
        tokio::select! {
            _ = self.shared.closed.cancelled() => Err(self.closed_error()),
            stream = queue.recv() => stream.ok_or_else(|| TransportError::Closed("peer went away".to_string())),
        }
    }
}

impl Session for MemorySession {
    type SendStream = MemorySendStream;
    type RecvStream = MemoryRecvStream;

    async fn accept_uni(&self) -> Result<MemoryRecvStream, TransportError> {
        let stream = self.next_incoming(&self.incoming_uni).await?;
        let (inner, _) = tokio::io::split(stream);
        Ok(MemoryRecvStream {
            id: self.stream_id(),
            inner,
        })
    }

    async fn accept_bi(&self) -> Result<(MemorySendStream, MemoryRecvStream), TransportError> {
        let stream = self.next_incoming(&self.incoming_bi).await?;
        let (read, write) = tokio::io::split(stream);
        let id = self.stream_id();
        Ok((MemorySendStream { id, inner: write }, MemoryRecvStream { id, inner: read }))
    }

    async fn open_uni(&self) -> Result<MemorySendStream, TransportError> {
        if self.shared.closed.is_cancelled() {
            return Err(self.closed_error());
        }
        let (local, remote) = tokio::io::duplex(PIPE_CAPACITY);
        self.outgoing_uni
            .send(remote)
            .await
            .map_err(|_| TransportError::Closed("peer went away".to_string()))?;
        let (_, inner) = tokio::io::split(local);
        Ok(MemorySendStream {
            id: self.stream_id(),
            inner,
        })
    }

    fn close(&self, code: u32, reason: &str) {
        self.shared.close(code, reason);
    }

    fn remote_address(&self) -> String {
        self.remote_address.clone()
    }

    fn server_name(&self) -> Option<String> {
        self.server_name.clone()
    }
}

/// Peer side of an in-memory session.
pub struct MemoryClient {
    shared: Arc<Shared>,
    uni: mpsc::Sender<DuplexStream>,
    bi: mpsc::Sender<DuplexStream>,
    incoming_uni: mpsc::Receiver<DuplexStream>,
}

impl MemoryClient {
    /// Open a unidirectional stream; write to it and `shutdown()` to finish.
    pub async fn open_uni(&self) -> Result<DuplexStream, TransportError> {
        let (local, remote) = tokio::io::duplex(PIPE_CAPACITY);
        self.uni
            .send(remote)
            .await
            .map_err(|_| TransportError::Closed("server went away".to_string()))?;
        Ok(local)
    }

    /// Open a bidirectional stream.
    pub async fn open_bi(&self) -> Result<DuplexStream, TransportError> {
        let (local, remote) = tokio::io::duplex(PIPE_CAPACITY);
        self.bi
            .send(remote)
            .await
            .map_err(|_| TransportError::Closed("server went away".to_string()))?;
        Ok(local)
    }

    /// Wait for a unidirectional stream opened by the server.
    pub async fn accept_uni(&mut self) -> Result<DuplexStream, TransportError> {
        tokio::select! {
            stream = self.incoming_uni.recv() => stream.ok_or_else(|| TransportError::Closed("server went away".to_string())),
            _ = self.shared.closed.cancelled() => Err(TransportError::Closed("session closed".to_string())),
        }
    }

    /// Wait until the server closes the session; returns the code and reason.
    pub async fn closed(&self) -> (u32, String) {
        self.shared.closed.cancelled().await;
        self.close_reason().unwrap_or_default()
    }

    pub fn close_reason(&self) -> Option<(u32, String)> {
        self.shared.close_reason.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }
}

/// Accepts sessions created through a [`MemoryConnector`].
pub struct MemoryListener {
    sessions: mpsc::Receiver<MemorySession>,
}

impl SessionListener for MemoryListener {
    type Session = MemorySession;

    async fn accept_session(&mut self) -> Result<MemorySession, TransportError> {
        self.sessions
            .recv()
            .await
            .ok_or_else(|| TransportError::Closed("all connectors dropped".to_string()))
    }
}

/// Creates sessions on a [`MemoryListener`].
#[derive(Clone)]
pub struct MemoryConnector {
    sessions: mpsc::Sender<MemorySession>,
}

impl MemoryConnector {
    /// Connect a new session presenting `remote_address` to the server.
    pub async fn connect(&self, remote_address: impl Into<String>) -> Result<MemoryClient, TransportError> {
        let shared = Arc::new(Shared {
            closed: CancellationToken::new(),
            close_reason: StdMutex::new(None),
        });
        let (uni_tx, uni_rx) = mpsc::channel(STREAM_BACKLOG);
        let (bi_tx, bi_rx) = mpsc::channel(STREAM_BACKLOG);
        let (out_tx, out_rx) = mpsc::channel(STREAM_BACKLOG);

        let session = MemorySession {
            remote_address: remote_address.into(),
            server_name: Some("localhost".to_string()),
            shared: Arc::clone(&shared),
            next_stream_id: AtomicU64::new(0),
            incoming_uni: Mutex::new(uni_rx),
            incoming_bi: Mutex::new(bi_rx),
            outgoing_uni: out_tx,
        };
        self.sessions
            .send(session)
            .await
            .map_err(|_| TransportError::Closed("listener dropped".to_string()))?;

        Ok(MemoryClient {
            shared,
            uni: uni_tx,
            bi: bi_tx,
            incoming_uni: out_rx,
        })
    }
}

/// Create a connected listener/connector pair.
pub fn listener() -> (MemoryListener, MemoryConnector) {
    let (tx, rx) = mpsc::channel(STREAM_BACKLOG);
    (MemoryListener { sessions: rx }, MemoryConnector { sessions: tx })
}
