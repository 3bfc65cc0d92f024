//! Error types for the blockstage runtime
//!
//! Recoverable store errors leave the stage untouched; callers that treat
//! them as no-ops may simply drop the `Err`. Contract violations between the
//! cursor and the executor are panics, not errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::actor::ActorId;

/// Recoverable errors raised by store operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageError {
    /// No actor with this id is on the stage
    #[error("actor {0} not found")]
    ActorNotFound(ActorId),

    /// An actor with this id is already on the stage
    #[error("actor {0} already exists")]
    DuplicateActor(ActorId),

    /// Command index outside the actor's program
    #[error("command index {index} out of range for actor {actor} (program length {len})")]
    CommandIndexOutOfRange {
        /// Actor whose program was addressed
        actor: ActorId,
        /// Requested index
        index: usize,
        /// Program length at the time of the call
        len: usize,
    },

    /// A repeat body contained another repeat
    #[error("repeat blocks may not contain other repeat blocks")]
    NestedRepeat,

    /// Patch named a field the target command does not have
    #[error("patch does not apply to a {kind} command: {detail}")]
    InvalidPatch {
        /// Kind of the command being patched
        kind: &'static str,
        /// Offending field(s)
        detail: String,
    },
}

/// Convenience result alias for store operations
pub type StageResult<T> = std::result::Result<T, StageError>;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Config file is not valid JSON for `StageConfig`
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config values are inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Convenience result alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
