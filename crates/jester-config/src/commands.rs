use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the client treats command names missing from its dispatch table.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UnknownCommandPolicy {
    /// Report the name as unknown and keep the session running.
    #[default]
    Reject,
    /// Send the name to the game as a remote command with the remaining
    /// tokens as its arguments.
    Forward,
}
