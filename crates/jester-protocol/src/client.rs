//! Synchronous protocol client.
//!
//! Each request opens a fresh TCP connection, writes the newline-terminated
//! JSON payload, blocks until one response frame has been read and closes
//! the connection again, whatever the outcome. There is no retry: callers
//! decide whether a refused connection is worth another attempt.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use jester_config::{Config, GameEndpoint};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::ProtocolError;
use crate::frame::{DEFAULT_MAX_FRAME_LEN, FrameDecoder, ResponseValue, encode};
use crate::request::CommandRequest;

/// Anything able to run a command request against the game.
///
/// [`ProtocolClient`] is the production implementation; tests substitute
/// scripted fakes.
pub trait RemoteCall {
    /// Sends `request` and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolError`] that ended the exchange.
    fn execute(&self, request: &CommandRequest) -> Result<ResponseValue, ProtocolError>;
}

/// Connection parameters for [`ProtocolClient`].
///
/// Every timeout defaults to `None`, meaning the call blocks until the OS or
/// the game ends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    endpoint: GameEndpoint,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    max_frame_len: u32,
}

impl ClientSettings {
    /// Settings for `endpoint` with no timeouts and the default frame limit.
    #[must_use]
    pub const fn new(endpoint: GameEndpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Derives settings from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.game_endpoint().clone())
            .with_connect_timeout(config.connect_timeout())
            .with_read_timeout(config.read_timeout())
            .with_max_frame_len(config.max_frame_bytes)
    }

    /// Bounds connection establishment. Zero means no bound.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout.filter(|timeout| !timeout.is_zero());
        self
    }

    /// Bounds each read of the response. Zero means no bound.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout.filter(|timeout| !timeout.is_zero());
        self
    }

    /// Bounds each write of the request. Zero means no bound.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout.filter(|timeout| !timeout.is_zero());
        self
    }

    /// Sets the largest response payload accepted.
    #[must_use]
    pub const fn with_max_frame_len(mut self, max_frame_len: u32) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Target endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &GameEndpoint {
        &self.endpoint
    }

    /// Connect timeout, if any.
    #[must_use]
    pub const fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Read timeout, if any.
    #[must_use]
    pub const fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Write timeout, if any.
    #[must_use]
    pub const fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout
    }

    /// Response payload limit.
    #[must_use]
    pub const fn max_frame_len(&self) -> u32 {
        self.max_frame_len
    }
}

/// Client for the game's scripting server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolClient {
    settings: ClientSettings,
}

impl ProtocolClient {
    /// Builds a client from explicit settings.
    #[must_use]
    pub const fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    /// Builds a client from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(ClientSettings::from_config(config))
    }

    /// Connection parameters.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Sends `command` with positional `args`.
    ///
    /// # Errors
    ///
    /// See [`ProtocolClient::call_with`].
    pub fn call<I, V>(&self, command: &str, args: I) -> Result<ResponseValue, ProtocolError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let request = CommandRequest::new(command)?.with_args(args);
        self.execute(&request)
    }

    /// Sends `command` with positional `args`, an optional path expression
    /// and extra named fields.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidRequest`] for a blank command and
    /// otherwise whatever [`RemoteCall::execute`] reports.
    pub fn call_with(
        &self,
        command: &str,
        args: Vec<Value>,
        path: Option<&str>,
        fields: Map<String, Value>,
    ) -> Result<ResponseValue, ProtocolError> {
        let mut request = CommandRequest::new(command)?.with_args(args);
        if let Some(expression) = path {
            request = request.with_path(expression);
        }
        self.execute(&request.with_fields(fields))
    }

    fn connect(&self) -> Result<TcpStream, ProtocolError> {
        let endpoint = &self.settings.endpoint;
        let address =
            resolve_address(endpoint).map_err(|source| ProtocolError::Resolve {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let stream = match self.settings.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&address, timeout),
            None => TcpStream::connect(address),
        }
        .map_err(|source| connect_error(endpoint, source))?;

        stream
            .set_read_timeout(self.settings.read_timeout)
            .and_then(|()| stream.set_write_timeout(self.settings.write_timeout))
            .and_then(|()| stream.set_nodelay(true))
            .map_err(|source| ProtocolError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(stream)
    }

    fn exchange(&self, stream: &mut TcpStream, frame: &[u8]) -> Result<ResponseValue, ProtocolError> {
        stream.write_all(frame).map_err(ProtocolError::Send)?;
        stream.flush().map_err(ProtocolError::Send)?;
        FrameDecoder::new(self.settings.max_frame_len).decode(stream)
    }
}

impl RemoteCall for ProtocolClient {
    fn execute(&self, request: &CommandRequest) -> Result<ResponseValue, ProtocolError> {
        let frame = encode(request)?;
        debug!(
            command = request.command(),
            payload = %String::from_utf8_lossy(frame.trim_ascii_end()),
            "sending request"
        );

        let mut stream = self.connect()?;
        let response = self.exchange(&mut stream, &frame);
        // The connection never outlives a single exchange.
        drop(stream);

        if let Ok(value) = &response {
            info!(
                command = request.command(),
                request_bytes = frame.len(),
                json = value.as_json().is_some(),
                "received response"
            );
        }
        response
    }
}

fn resolve_address(endpoint: &GameEndpoint) -> io::Result<SocketAddr> {
    (endpoint.host(), endpoint.port())
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

fn connect_error(endpoint: &GameEndpoint, source: io::Error) -> ProtocolError {
    let endpoint = endpoint.to_string();
    if source.kind() == io::ErrorKind::ConnectionRefused {
        ProtocolError::ConnectionRefused { endpoint, source }
    } else {
        ProtocolError::Connect { endpoint, source }
    }
}
