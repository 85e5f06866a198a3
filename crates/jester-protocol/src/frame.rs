//! Wire framing.
//!
//! Requests travel as compact JSON terminated by a single `\n`. Responses
//! arrive as a four-byte little-endian length followed by exactly that many
//! UTF-8 bytes, which hold either JSON or plain text.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::error::{FramingError, ProtocolError};

/// Size of the response length prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Largest single read issued while collecting a payload.
pub const READ_CHUNK_LEN: usize = 4096;

/// Default limit on a response payload.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// A decoded response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    /// The payload parsed as JSON.
    Json(Value),
    /// The payload was not JSON; holds the text with trailing whitespace
    /// removed.
    Text(String),
}

impl ResponseValue {
    /// Classifies a decoded payload: JSON when it parses, text otherwise.
    #[must_use]
    pub fn from_payload(payload: &str) -> Self {
        let trimmed = payload.trim_end();
        match serde_json::from_str(trimmed) {
            Ok(value) => Self::Json(value),
            Err(error) => {
                trace!(%error, "response payload is not JSON; keeping it as text");
                Self::Text(trimmed.to_owned())
            }
        }
    }

    /// Parsed JSON, when the payload was JSON.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Raw text, when the payload was not JSON.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Converts into a JSON value; text becomes a JSON string.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// Serialises `payload` as compact JSON followed by a newline.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialization`] when the payload cannot be
/// represented as JSON.
pub fn encode<T>(payload: &T) -> Result<Vec<u8>, ProtocolError>
where
    T: Serialize + ?Sized,
{
    let mut bytes = serde_json::to_vec(payload).map_err(ProtocolError::Serialization)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes `payload` as a response frame.
///
/// # Errors
///
/// Fails with [`io::ErrorKind::InvalidInput`] when the payload does not fit
/// a 32-bit length, or with the writer's own error.
#[expect(
    clippy::little_endian_bytes,
    reason = "the game server frames responses with a little-endian prefix"
)]
pub fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: Write + ?Sized,
{
    let length = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "payload exceeds the 32-bit frame length",
        )
    })?;
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Reads one response frame with the default size limit.
///
/// # Errors
///
/// See [`FrameDecoder::decode`].
pub fn decode<R>(source: &mut R) -> Result<ResponseValue, ProtocolError>
where
    R: Read,
{
    FrameDecoder::default().decode(source)
}

/// Response frame reader with a configurable size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecoder {
    max_frame_len: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl FrameDecoder {
    /// Builds a decoder rejecting payloads longer than `max_frame_len`.
    #[must_use]
    pub const fn new(max_frame_len: u32) -> Self {
        Self { max_frame_len }
    }

    /// Payload size limit.
    #[must_use]
    pub const fn max_frame_len(&self) -> u32 {
        self.max_frame_len
    }

    /// Reads exactly one frame from `source`, issuing as many reads as the
    /// transport needs, and classifies the payload.
    ///
    /// # Errors
    ///
    /// - [`FramingError::MissingLengthPrefix`] when fewer than four bytes
    ///   arrive before end-of-stream.
    /// - [`FramingError::FrameTooLarge`] when the prefix exceeds the limit.
    /// - [`ProtocolError::ConnectionClosed`] when the stream ends, or the
    ///   peer resets it, before the whole payload arrives.
    /// - [`FramingError::InvalidUtf8`] when the payload is not UTF-8.
    /// - [`ProtocolError::Receive`] for any other read failure.
    pub fn decode<R>(&self, source: &mut R) -> Result<ResponseValue, ProtocolError>
    where
        R: Read,
    {
        let declared = read_length_prefix(source)?;
        if declared > self.max_frame_len {
            return Err(FramingError::FrameTooLarge {
                declared,
                limit: self.max_frame_len,
            }
            .into());
        }
        let expected = usize::try_from(declared).map_err(|_| FramingError::FrameTooLarge {
            declared,
            limit: self.max_frame_len,
        })?;
        let payload = read_payload(source, expected)?;
        let text = String::from_utf8(payload)
            .map_err(|error| FramingError::InvalidUtf8(error.utf8_error()))?;
        Ok(ResponseValue::from_payload(&text))
    }
}

#[expect(
    clippy::little_endian_bytes,
    reason = "the game server frames responses with a little-endian prefix"
)]
fn read_length_prefix<R>(source: &mut R) -> Result<u32, ProtocolError>
where
    R: Read,
{
    let mut prefix = [0_u8; LENGTH_PREFIX_LEN];
    let mut received = 0;
    while let Some(window) = prefix.get_mut(received..).filter(|rest| !rest.is_empty()) {
        match source.read(window) {
            Ok(0) => return Err(FramingError::MissingLengthPrefix { received }.into()),
            Ok(count) => received += count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(ProtocolError::Receive(error)),
        }
    }
    Ok(u32::from_le_bytes(prefix))
}

fn read_payload<R>(source: &mut R, expected: usize) -> Result<Vec<u8>, ProtocolError>
where
    R: Read,
{
    let mut payload = Vec::with_capacity(expected.min(READ_CHUNK_LEN * 16));
    let mut chunk = [0_u8; READ_CHUNK_LEN];
    while payload.len() < expected {
        let received = payload.len();
        let remaining = u64::try_from(expected - received).unwrap_or(u64::MAX);
        match Read::take(&mut *source, remaining).read(&mut chunk) {
            Ok(0) => return Err(ProtocolError::ConnectionClosed { expected, received }),
            Ok(count) => payload.extend_from_slice(chunk.get(..count).unwrap_or_default()),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) if is_peer_disconnect(error.kind()) => {
                return Err(ProtocolError::ConnectionClosed { expected, received });
            }
            Err(error) => return Err(ProtocolError::Receive(error)),
        }
    }
    Ok(payload)
}

const fn is_peer_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}
