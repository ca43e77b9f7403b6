//! Client indication codec.
//!
//! # Wire Format
//! ```text
//! +-----------+--------------+-----------------+
//! | key (u16) | length (u16) | value (length)  |  repeated, big-endian,
//! +-----------+--------------+-----------------+  no padding, no terminator
//! ```
//!
//! The message ends when the stream ends on a record boundary. The whole
//! message is capped at [`MAX_CLIENT_INDICATION_LENGTH`] bytes; anything past
//! the cap is never read and decoding behaves as if the stream had ended.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on the encoded size of a client indication.
pub const MAX_CLIENT_INDICATION_LENGTH: usize = u16::MAX as usize;

/// Size of the key and length fields preceding every value.
const RECORD_HEADER_LEN: usize = 4;

/// Record key of a client indication field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicationKey {
    Origin,
    Path,
    /// Reserved for extensions; skipped by the decoder.
    Unknown(u16),
}

impl From<u16> for IndicationKey {
    fn from(raw: u16) -> Self {
        match raw {
            0x0000 => IndicationKey::Origin,
            0x0001 => IndicationKey::Path,
            other => IndicationKey::Unknown(other),
        }
    }
}

impl From<IndicationKey> for u16 {
    fn from(key: IndicationKey) -> Self {
        match key {
            IndicationKey::Origin => 0x0000,
            IndicationKey::Path => 0x0001,
            IndicationKey::Unknown(raw) => raw,
        }
    }
}

/// Decoded handshake payload sent by the client on its first unidirectional stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIndication {
    /// Scheme, host and optional port the client is connecting on behalf of.
    pub origin: String,
    /// Resource path, resolved relative to `origin`.
    pub path: String,
}

impl ClientIndication {
    pub fn new(origin: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            path: path.into(),
        }
    }
}

/// Error decoding a client indication.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input ended inside a record.
    #[error("client indication truncated while reading record {0}")]
    Truncated(&'static str),
    /// The underlying stream failed.
    #[error("failed to read client indication: {0}")]
    Io(#[source] std::io::Error),
}

/// Error encoding a client indication.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("client indication is {len} bytes, limit is {limit}")]
    TooLong { len: usize, limit: usize },
}

/// Decode a client indication from `reader`.
///
/// At most [`MAX_CLIENT_INDICATION_LENGTH`] bytes are consumed. A clean end of
/// input right before a key is the normal end of the message; an end of input
/// anywhere else is [`DecodeError::Truncated`].
pub async fn decode<R>(reader: R) -> Result<ClientIndication, DecodeError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = reader.take(MAX_CLIENT_INDICATION_LENGTH as u64);
    let mut indication = ClientIndication::default();

    loop {
        let mut key = [0u8; 2];
        if !read_record_start(&mut reader, &mut key).await? {
            break;
        }
        let key = IndicationKey::from(u16::from_be_bytes(key));

        let mut length = [0u8; 2];
        read_field(&mut reader, &mut length, "length").await?;
        let length = u16::from_be_bytes(length) as usize;

        let mut value = vec![0u8; length];
        read_field(&mut reader, &mut value, "value").await?;
        let value = String::from_utf8_lossy(&value).into_owned();

        match key {
            IndicationKey::Origin => indication.origin = value,
            IndicationKey::Path => indication.path = value,
            IndicationKey::Unknown(raw) => {
                tracing::warn!(key = raw, value = %value, "Skipping unknown client indication key");
            }
        }
    }

    Ok(indication)
}

/// Read the key of the next record.
///
/// Returns `Ok(false)` when the input is exhausted before the first byte.
async fn read_record_start<R>(reader: &mut R, buf: &mut [u8]) -> Result<bool, DecodeError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await.map_err(DecodeError::Io)?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(DecodeError::Truncated("key"));
        }
        filled += n;
    }
    Ok(true)
}

async fn read_field<R>(reader: &mut R, buf: &mut [u8], field: &'static str) -> Result<(), DecodeError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(DecodeError::Truncated(field)),
        Err(e) => Err(DecodeError::Io(e)),
    }
}

/// Append one key-length-value record to `out`.
pub fn encode_record(key: IndicationKey, value: &[u8], out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if value.len() > u16::MAX as usize {
        return Err(EncodeError::TooLong {
            len: value.len(),
            limit: u16::MAX as usize,
        });
    }
    out.extend_from_slice(&u16::from(key).to_be_bytes());
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    Ok(())
}

/// Encode an indication as an origin record followed by a path record.
pub fn encode(indication: &ClientIndication) -> Result<Vec<u8>, EncodeError> {
    let len = 2 * RECORD_HEADER_LEN + indication.origin.len() + indication.path.len();
    if len > MAX_CLIENT_INDICATION_LENGTH {
        return Err(EncodeError::TooLong {
            len,
            limit: MAX_CLIENT_INDICATION_LENGTH,
        });
    }

    let mut out = Vec::with_capacity(len);
    encode_record(IndicationKey::Origin, indication.origin.as_bytes(), &mut out)?;
    encode_record(IndicationKey::Path, indication.path.as_bytes(), &mut out)?;
    Ok(out)
}
