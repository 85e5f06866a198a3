//! Failure taxonomy for a single request/response exchange.

use std::io;

use thiserror::Error;

/// Errors raised while building a command request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// The command name was empty or only whitespace.
    #[error("the command name must not be empty")]
    EmptyCommand,
}

/// Structural violations of the response framing contract.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The stream ended before the four-byte length prefix was complete.
    #[error("missing length prefix (received {received} of 4 bytes)")]
    MissingLengthPrefix {
        /// Prefix bytes read before end-of-stream.
        received: usize,
    },
    /// The length prefix exceeds the configured frame limit.
    #[error("declared frame length {declared} exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Length announced by the prefix.
        declared: u32,
        /// Configured maximum.
        limit: u32,
    },
    /// The payload bytes are not UTF-8.
    #[error("frame payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),
}

/// Errors surfaced by the protocol client.
///
/// Every variant is recoverable from the caller's point of view: the
/// connection that produced it has already been closed.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request could not be built.
    #[error("invalid command request: {0}")]
    InvalidRequest(#[from] RequestError),
    /// The request payload could not be encoded as JSON. Nothing was sent.
    #[error("failed to serialise command request: {0}")]
    Serialization(#[source] serde_json::Error),
    /// The endpoint host did not resolve to an address.
    #[error("failed to resolve game address {endpoint}: {source}")]
    Resolve {
        /// Endpoint as configured.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// Nothing is listening at the endpoint.
    #[error("connection refused by {endpoint}; is the game running?")]
    ConnectionRefused {
        /// Endpoint as configured.
        endpoint: String,
        /// Socket failure.
        #[source]
        source: io::Error,
    },
    /// Connecting failed for a reason other than refusal (for example a
    /// timeout or an unreachable network).
    #[error("failed to connect to game at {endpoint}: {source}")]
    Connect {
        /// Endpoint as configured.
        endpoint: String,
        /// Socket failure.
        #[source]
        source: io::Error,
    },
    /// Writing the request failed.
    #[error("failed to send request to game: {0}")]
    Send(#[source] io::Error),
    /// Reading the response failed, including read timeouts.
    #[error("failed to read response from game: {0}")]
    Receive(#[source] io::Error),
    /// The peer closed the stream before the announced payload arrived.
    #[error("connection closed after {received} of {expected} payload bytes")]
    ConnectionClosed {
        /// Payload length announced by the prefix.
        expected: usize,
        /// Payload bytes read before the stream ended.
        received: usize,
    },
    /// The response violated the framing contract.
    #[error("malformed response frame: {0}")]
    Framing(#[from] FramingError),
}

impl ProtocolError {
    /// Whether the error means no game is listening at the endpoint.
    #[must_use]
    pub const fn is_connection_refused(&self) -> bool {
        matches!(self, Self::ConnectionRefused { .. })
    }
}
