//! Error kinds raised by the engine.
//!
//! None of them is fatal: load and command errors are scoped to one track,
//! engine errors to one call.

use thiserror::Error;

use super::transport::TransportState;

/// A track's stream could not be opened.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {uri}: {source}")]
    Unreachable {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {uri}: {reason}")]
    Malformed { uri: String, reason: String },

    #[error("unsupported location {0}")]
    Unsupported(String),

    #[error("loader for {0} exited without a result")]
    Abandoned(String),
}

/// A single handle refused a transport or volume command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{op} rejected: {reason}")]
    Rejected { op: &'static str, reason: String },

    #[error("handle already released")]
    Released,

    #[error("{op} worker panicked")]
    Panicked { op: &'static str },
}

#[derive(Debug, Error)]
#[error("track {index} ({name}): {error}")]
pub struct LoadFailure {
    pub index: usize,
    pub name: String,
    #[source]
    pub error: LoadError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("track {index} ({name}): {error}")]
pub struct CommandFailure {
    pub index: usize,
    pub name: String,
    #[source]
    pub error: CommandError,
}

/// Errors returned by `Transport` operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot {op} while {state}")]
    InvalidTransition {
        op: &'static str,
        state: TransportState,
    },

    #[error("a song is still loading")]
    Busy,

    #[error("no track at index {0}")]
    TrackIndex(usize),

    #[error("volume must be a finite number, got {0}")]
    InvalidVolume(f32),

    #[error("no track of \"{title}\" could be loaded")]
    NothingLoaded {
        title: String,
        failures: Vec<LoadFailure>,
    },

    #[error("no loaded track of \"{0}\" reports a duration")]
    UnknownDuration(String),
}
