//! Error types for mnome

use thiserror::Error;

/// Result type alias for mnome operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mnome
#[derive(Debug, Error)]
pub enum Error {
    /// No command is registered under this name
    #[error("\"{0}\" is not a valid command")]
    UnknownCommand(String),

    /// The arguments did not match the command's parameter schema
    #[error("error during parameter parsing (usage: {usage})")]
    Parse { command: String, usage: String },

    /// A command handler failed
    #[error("Could not get that, please try again: {source}")]
    Command {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    /// Beat rate outside the accepted range
    #[error("invalid beat rate {0} bpm (expected 1..={max})", max = crate::player::MAX_BPM)]
    InvalidBpm(u32),

    /// Accent pattern text could not be parsed
    #[error("invalid accent pattern {0:?}: use '*' for accented and '+' for normal beats")]
    InvalidPattern(String),

    /// A parsed value did not have the shape its typed adapter expected
    #[error("argument mismatch: expected {expected}, found {found}")]
    ArgumentMismatch { expected: String, found: String },

    /// Worker thread could not be spawned
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// Worker thread panicked
    #[error("worker thread '{0}' panicked")]
    WorkerPanicked(String),

    /// `wait_for_stop` was called from inside the worker it would join
    #[error("worker '{0}' cannot wait for itself to stop")]
    JoinFromWorker(String),

    /// Audio sink error
    #[error("audio sink error: {0}")]
    Sink(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
