use derive_more::Display;
use rowbatch_config::ConfigError;
use rowbatch_core::error::{
    ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError, UpdateError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_concurrency_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::ConcurrencyConflict)
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match err.update_error() {
            Some(UpdateError::ConcurrencyConflict { .. }) => ErrorKind::ConcurrencyConflict,
            Some(UpdateError::ProtocolViolation { .. }) => ErrorKind::ProtocolViolation,
            Some(UpdateError::StoreFailure { .. }) => ErrorKind::StoreFailure,
            Some(UpdateError::Cancelled) => ErrorKind::Cancelled,
            None => match err.class {
                ErrorClass::Conflict => ErrorKind::ConcurrencyConflict,
                ErrorClass::Unsupported if err.origin == CoreErrorOrigin::Config => {
                    ErrorKind::Invalid
                }
                ErrorClass::Unsupported => ErrorKind::Unsupported,
                ErrorClass::Cancelled => ErrorKind::Cancelled,
                ErrorClass::InvariantViolation | ErrorClass::Internal => ErrorKind::Internal,
            },
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Invalid, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// A row expected to change was missing or already modified.
    ConcurrencyConflict,

    /// The store's result stream disagrees with the generated statements.
    ProtocolViolation,

    /// The store rejected the batch; see the message for the probable command.
    StoreFailure,

    Cancelled,

    /// A command or column combination the pipeline cannot express.
    Unsupported,

    /// Configuration was rejected.
    Invalid,

    /// The caller cannot remediate this.
    Internal,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Command,
    Batch,
    Generator,
    Connection,
    Store,
    Reader,
    Config,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Command => Self::Command,
            CoreErrorOrigin::Batch => Self::Batch,
            CoreErrorOrigin::Generator => Self::Generator,
            CoreErrorOrigin::Connection => Self::Connection,
            CoreErrorOrigin::Store => Self::Store,
            CoreErrorOrigin::Reader => Self::Reader,
            CoreErrorOrigin::Config => Self::Config,
        }
    }
}

///
/// TESTS
///
