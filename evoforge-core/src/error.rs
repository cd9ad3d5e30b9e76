//! Error types for evoforge-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the evoforge-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A persisted document has an unsupported shape
    #[error("document schema error: {0}")]
    Schema(String),

    /// A session or pattern document could not be written
    #[error("failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Attempt sequence numbers must strictly increase within a session
    #[error("sequence {given} does not follow last sequence {last}")]
    SequenceNotIncreasing { last: u32, given: u32 },

    /// Quality scores must be finite numbers
    #[error("quality score {0} is not a finite number")]
    InvalidScore(f64),

    /// Operation needs at least one attempt in the session
    #[error("session has no attempts")]
    EmptySession,
}

/// Result type alias for evoforge-core
pub type Result<T> = std::result::Result<T, Error>;
