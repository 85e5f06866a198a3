use camino::Utf8PathBuf;

use crate::commands::UnknownCommandPolicy;
use crate::endpoint::GameEndpoint;
use crate::logging::LogFormat;

/// Host the game's scripting server listens on.
pub const DEFAULT_GAME_HOST: &str = "127.0.0.1";

/// Port the game's scripting server listens on.
pub const DEFAULT_GAME_PORT: u16 = 12345;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Upper bound on a single response frame. Larger length prefixes are
/// rejected before any payload is buffered.
pub const DEFAULT_MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Executable used to start the game.
pub const DEFAULT_GAME_EXECUTABLE: &str = "love";

/// Directory the game is started from.
pub const DEFAULT_GAME_DIR: &str = "game/game_files";

/// Time given to a freshly launched game before the first prompt.
pub const DEFAULT_LAUNCH_GRACE_MS: u64 = 3_000;

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Endpoint of the game's scripting server.
pub fn default_game_endpoint() -> GameEndpoint {
    GameEndpoint::new(DEFAULT_GAME_HOST, DEFAULT_GAME_PORT)
}

/// Frame size limit applied to responses.
pub fn default_max_frame_bytes() -> u32 {
    DEFAULT_MAX_FRAME_BYTES
}

/// Executable used to launch the game.
pub fn default_game_executable() -> String {
    DEFAULT_GAME_EXECUTABLE.to_owned()
}

/// Working directory for the launched game.
pub fn default_game_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_GAME_DIR)
}

/// Grace period after launching the game.
pub fn default_launch_grace_ms() -> u64 {
    DEFAULT_LAUNCH_GRACE_MS
}

/// Treatment of command names absent from the dispatch table.
pub fn default_unknown_commands() -> UnknownCommandPolicy {
    UnknownCommandPolicy::Reject
}
