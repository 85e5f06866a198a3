use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const TCP_SCHEME: &str = "tcp";

/// TCP address of the game's embedded scripting server.
///
/// Accepts either `tcp://host:port` or a bare `host:port` when parsed from
/// text, and always renders in the URL form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameEndpoint {
    host: String,
    port: u16,
}

impl GameEndpoint {
    /// Builds an endpoint from its host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for GameEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{TCP_SCHEME}://{}:{}", self.host, self.port)
    }
}

impl FromStr for GameEndpoint {
    type Err = GameEndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.contains("://") {
            return parse_url(trimmed);
        }
        parse_host_port(trimmed)
    }
}

impl TryFrom<String> for GameEndpoint {
    type Error = GameEndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GameEndpoint> for String {
    fn from(endpoint: GameEndpoint) -> Self {
        endpoint.to_string()
    }
}

fn parse_url(input: &str) -> Result<GameEndpoint, GameEndpointParseError> {
    let url = Url::parse(input)?;
    if url.scheme() != TCP_SCHEME {
        return Err(GameEndpointParseError::UnsupportedScheme(
            url.scheme().to_owned(),
        ));
    }
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| GameEndpointParseError::MissingHost(input.to_owned()))?;
    let port = url
        .port()
        .ok_or_else(|| GameEndpointParseError::MissingPort(input.to_owned()))?;
    Ok(GameEndpoint::new(host.trim_matches(['[', ']']), port))
}

fn parse_host_port(input: &str) -> Result<GameEndpoint, GameEndpointParseError> {
    let (host, port) = input
        .rsplit_once(':')
        .ok_or_else(|| GameEndpointParseError::MissingPort(input.to_owned()))?;
    let host = host.trim_matches(['[', ']']);
    if host.is_empty() {
        return Err(GameEndpointParseError::MissingHost(input.to_owned()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| GameEndpointParseError::InvalidPort(input.to_owned()))?;
    Ok(GameEndpoint::new(host, port))
}

/// Errors encountered while parsing a [`GameEndpoint`] from text.
#[derive(Debug, Error)]
pub enum GameEndpointParseError {
    /// Scheme was not `tcp`.
    #[error("unsupported endpoint scheme '{0}'; only tcp is supported")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// Port was not a number between 0 and 65535.
    #[error("invalid port in '{0}'")]
    InvalidPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
