//! Error types for pollchain-core.
//!
//! The five rejection variants render exactly their contract message, so a
//! presentation layer can relay `err.to_string()` and external observers can
//! match on it.

use thiserror::Error;

pub const POLL_DOES_NOT_EXIST: &str = "Poll does not exist";
pub const NO_OPTIONS: &str = "Must have at least one option";
pub const TOO_MANY_OPTIONS: &str = "Too many options";
pub const TEXT_TOO_LONG: &str = "Text too long";
pub const POLL_NOT_ACTIVE: &str = "Poll is not active";
pub const ALREADY_VOTED: &str = "Already voted";
pub const CHOOSE_EXACTLY_ONE: &str = "Must choose exactly one option";
pub const CHOOSE_AT_LEAST_ONE: &str = "Must choose at least one option";
pub const DUPLICATE_OPTIONS: &str = "Duplicate options";
pub const INVALID_OPTION: &str = "Invalid option";
pub const ONLY_CREATOR_TOGGLE: &str = "Only creator can toggle status";
pub const ONLY_CREATOR_DELETE: &str = "Only creator can delete";

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: empty options, wrong vote shape, bad option index.
    #[error("{0}")]
    InvalidArgument(&'static str),

    /// The poll id was never assigned or has been deleted.
    #[error("{0}")]
    NotFound(&'static str),

    /// The poll's active flag forbids the operation.
    #[error("{0}")]
    InvalidState(&'static str),

    /// The voter already voted in this poll.
    #[error("{0}")]
    AlreadyDone(&'static str),

    /// Caller is not the poll's creator.
    #[error("{0}")]
    PermissionDenied(&'static str),

    /// A stored record, snapshot or command could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Configuration could not be parsed or written.
    #[error("config error: {0}")]
    Config(String),

    /// A reopened store was written with another schema version.
    #[error("schema mismatch: store has version {found}, expected {expected}")]
    Schema { found: u32, expected: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Stable error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    InvalidState,
    AlreadyDone,
    PermissionDenied,
    Codec,
    Config,
    Schema,
    Io,
}

impl Error {
    /// The stable code for this error, for callers that match on codes
    /// rather than messages.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::AlreadyDone(_) => ErrorKind::AlreadyDone,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::Codec(_) => ErrorKind::Codec,
            Error::Config(_) => ErrorKind::Config,
            Error::Schema { .. } => ErrorKind::Schema,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Codec(e.to_string())
    }
}

impl From<ciborium::de::Error<std::io::Error>> for Error {
    fn from(e: ciborium::de::Error<std::io::Error>) -> Self {
        Error::Codec(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
