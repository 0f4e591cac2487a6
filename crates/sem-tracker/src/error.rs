//! Error types for semaphore tracking.

use std::io;

use thiserror::Error;

/// Result type for tracker operations.
pub type TrackResult<T> = Result<T, TrackError>;

#[derive(Error, Debug)]
pub enum TrackError {
    /// A channel line did not split into `COMMAND:NAME`.
    #[error("malformed event line `{0}`")]
    MalformedLine(String),

    /// The command token was neither `REGISTER` nor `UNREGISTER`.
    #[error("unrecognized command `{0}`")]
    UnknownCommand(String),

    /// An unregister arrived for a name the registry does not hold.
    #[error("unregister for untracked resource `{0}`")]
    UntrackedName(String),

    /// The name cannot be carried on the line protocol.
    #[error("invalid resource name `{0}`")]
    InvalidName(String),

    /// `register`/`unregister` called before `ensure_running`.
    #[error("tracker is not running")]
    NotRunning,

    /// The tracker was shut down; construct a new instance to resume.
    #[error("tracker has terminated")]
    Terminated,

    /// The pipe accepted only part of an event line.
    #[error("short write to event channel ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
