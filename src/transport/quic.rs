//! QUIC implementation of the transport capability on top of `quinn`.

use quinn::{Connection, ConnectionError, VarInt};

use super::{RecvStream, SendStream, Session, TransportError};

impl From<ConnectionError> for TransportError {
    fn from(e: ConnectionError) -> Self {
        TransportError::Closed(e.to_string())
    }
}

impl RecvStream for quinn::RecvStream {
    fn id(&self) -> u64 {
        VarInt::from(quinn::RecvStream::id(self)).into_inner()
    }
}

impl SendStream for quinn::SendStream {
    fn id(&self) -> u64 {
        VarInt::from(quinn::SendStream::id(self)).into_inner()
    }
}

impl Session for Connection {
    type SendStream = quinn::SendStream;
    type RecvStream = quinn::RecvStream;

    async fn accept_uni(&self) -> Result<quinn::RecvStream, TransportError> {
        Ok(Connection::accept_uni(self).await?)
    }

    async fn accept_bi(&self) -> Result<(quinn::SendStream, quinn::RecvStream), TransportError> {
        Ok(Connection::accept_bi(self).await?)
    }

    async fn open_uni(&self) -> Result<quinn::SendStream, TransportError> {
        Ok(Connection::open_uni(self).await?)
    }

    fn close(&self, code: u32, reason: &str) {
        Connection::close(self, VarInt::from_u32(code), reason.as_bytes());
    }

    fn remote_address(&self) -> String {
        Connection::remote_address(self).to_string()
    }

    fn server_name(&self) -> Option<String> {
        self.handshake_data()?
            .downcast::<quinn::crypto::rustls::HandshakeData>()
            .ok()?
            .server_name
    }
}
