//! Client side of the game's length-prefixed JSON command protocol.
//!
//! Requests are JSON objects terminated by a newline; responses are framed
//! with a four-byte little-endian length and carry either JSON or plain
//! text. [`ProtocolClient`] performs exactly one exchange per connection.
//!
//! ```rust,no_run
//! use jester_config::GameEndpoint;
//! use jester_protocol::{ClientSettings, CommandRequest, ProtocolClient, RemoteCall};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ProtocolClient::new(ClientSettings::new(GameEndpoint::new("127.0.0.1", 12345)));
//! let request = CommandRequest::new("get_game_state")?.with_path("GAME.hands[1]");
//! let response = client.execute(&request)?;
//! println!("{:?}", response.as_json());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod frame;
pub mod path;
mod request;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use client::{ClientSettings, ProtocolClient, RemoteCall};
pub use error::{FramingError, ProtocolError, RequestError};
pub use frame::{FrameDecoder, ResponseValue, decode, encode, write_frame};
pub use path::{PathExpression, PathKey, parse as parse_path};
pub use request::{CommandRequest, GENERIC_CALL};
