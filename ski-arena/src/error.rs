//! Crate-wide error taxonomy.
//!
//! A plain enum with a hand-rolled `Display`, no context-tracing machinery:
//! every error already names exactly which subsystem raised it via its
//! variant.

use core::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Arena growth would exceed the configured maximum capacity.
    ArenaExhausted,
    /// A worker or remote arena attach observed an incompatible header.
    InvalidHeader,
    /// `hostSubmit` found the submission ring full.
    SubmitFull,
    /// `hostSubmit` was called against a ring with no connected workers.
    SubmitNotConnected,
    /// A request suspended more than `max_resubmits_per_work_unit` times.
    ResubmissionLimitExceeded,
    /// A worker thread trapped; the evaluator may now be dead (see
    /// [`Error::is_fatal`]).
    WorkerCrashed(String),
    /// The host was told to shut down, or the evaluator died after a fatal
    /// worker trap; no further requests are accepted.
    Aborted,
    /// An IO ring primitive overflowed or was used after the evaluator died.
    IoError(String),
}

impl Error {
    /// Whether this error leaves the whole evaluator dead: an OOM-class
    /// worker trap or a bad header poisons every node id already handed out.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::WorkerCrashed(_) | Error::InvalidHeader)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ArenaExhausted => write!(f, "arena exhausted: growth would exceed max capacity"),
            Error::InvalidHeader => write!(f, "invalid arena header: incompatible layout"),
            Error::SubmitFull => write!(f, "submission ring full"),
            Error::SubmitNotConnected => write!(f, "submission ring has no connected workers"),
            Error::ResubmissionLimitExceeded => write!(f, "resubmission limit exceeded"),
            Error::WorkerCrashed(msg) => write!(f, "worker crashed: {msg}"),
            Error::Aborted => write!(f, "evaluator aborted"),
            Error::IoError(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
