//! Error types.
//!
//! Two classes: [`DuplexError`] is fatal and ends the process, [`CandidateError`]
//! is scoped to one input file and only abandons that file.

use std::io;
use std::path::PathBuf;

use crate::tools::ToolError;

/// Errors that leave the system without a trustworthy base state.
#[derive(Debug, thiserror::Error)]
pub enum DuplexError {
    #[error("state file {} is unreadable: {source}", .path.display())]
    StateUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state file {} is corrupt: {source}", .path.display())]
    StateCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to save state to {}: {source}", .path.display())]
    StateSave {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("watched directory {} is inaccessible: {source}", .path.display())]
    WatchDirInaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to watch {}: {reason}", .path.display())]
    Watcher { path: PathBuf, reason: String },

    #[error("live delivery is not available in this build")]
    LiveUnavailable,
}

pub type Result<T> = std::result::Result<T, DuplexError>;

/// Errors that abandon a single candidate. The loop continues with the next one.
#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    #[error("{} vanished before it could be accepted", .0.display())]
    Vanished(PathBuf),

    #[error("{} is not a regular file", .0.display())]
    NotAFile(PathBuf),

    #[error("{} still empty after {attempts} attempts", .path.display())]
    NotReady { path: PathBuf, attempts: u32 },

    #[error("recognition failed for {} ({language}): {source}", .path.display())]
    RecognitionFailed {
        path: PathBuf,
        language: String,
        #[source]
        source: ToolError,
    },

    #[error("too many output directories for timestamp {label}")]
    TooManyCollisions { label: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CandidateError {
    /// Maps an I/O error on `path`, turning `NotFound` into [`CandidateError::Vanished`].
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::Vanished(path)
        } else {
            Self::Io { path, source }
        }
    }

    pub fn error_code(&self) -> &str {
        match self {
            Self::Vanished(_) => "vanished",
            Self::NotAFile(_) => "not_a_file",
            Self::NotReady { .. } => "not_ready",
            Self::RecognitionFailed { .. } => "recognition_failed",
            Self::TooManyCollisions { .. } => "too_many_collisions",
            Self::Io { .. } => "io",
        }
    }
}
