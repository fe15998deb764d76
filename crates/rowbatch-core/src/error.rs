use crate::modification::EntryRef;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; the facade crate maps it into its public error.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a command-origin unsupported error.
    pub(crate) fn command_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Command, message)
    }

    /// Construct a batch-origin invariant violation.
    pub(crate) fn batch_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Batch, message)
    }

    /// Construct a batch-origin unsupported error.
    pub(crate) fn batch_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Batch, message)
    }

    /// Construct a generator-origin unsupported error.
    pub fn generator_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Generator, message)
    }

    /// Construct a connection-origin internal error.
    pub fn connection_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Connection, message)
    }

    /// Construct a store-origin internal error.
    pub fn store_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Store, message)
    }

    /// Construct a reader-origin internal error.
    pub fn reader_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Reader, message)
    }

    /// A command's target row was missing or already modified.
    pub(crate) fn concurrency_conflict(command: CommandRef, expected: u64, actual: u64) -> Self {
        let err = UpdateError::ConcurrencyConflict {
            command,
            expected,
            actual,
        };

        Self {
            class: ErrorClass::Conflict,
            origin: ErrorOrigin::Reader,
            message: err.to_string(),
            detail: Some(ErrorDetail::Update(err)),
        }
    }

    /// The result stream shape disagrees with the generated statement text.
    pub(crate) fn protocol_violation(command_index: usize, message: impl Into<String>) -> Self {
        let err = UpdateError::ProtocolViolation {
            command_index,
            message: message.into(),
        };

        Self {
            class: ErrorClass::InvariantViolation,
            origin: ErrorOrigin::Reader,
            message: err.to_string(),
            detail: Some(ErrorDetail::Update(err)),
        }
    }

    /// Wrap an unclassified failure raised while a batch was executing.
    ///
    /// `command` is a best-effort guess at the statement that failed: a
    /// multi-statement round trip does not say which statement raised the
    /// error, so this names the command whose results were being read.
    pub(crate) fn store_failure(command: Option<CommandRef>, source: Self) -> Self {
        let message = match &command {
            Some(command) => format!(
                "store update failed (probable cause: {command}): {}",
                source.message
            ),
            None => format!("store update failed: {}", source.message),
        };

        Self {
            class: ErrorClass::Internal,
            origin: ErrorOrigin::Store,
            message,
            detail: Some(ErrorDetail::Update(UpdateError::StoreFailure {
                command,
                source: Box::new(source),
            })),
        }
    }

    /// The caller cancelled the operation.
    pub(crate) fn cancelled(origin: ErrorOrigin) -> Self {
        Self {
            class: ErrorClass::Cancelled,
            origin,
            message: UpdateError::Cancelled.to_string(),
            detail: Some(ErrorDetail::Update(UpdateError::Cancelled)),
        }
    }

    /// Return the update-pipeline detail, if this error carries one.
    #[must_use]
    pub const fn update_error(&self) -> Option<&UpdateError> {
        match &self.detail {
            Some(ErrorDetail::Update(err)) => Some(err),
            None => None,
        }
    }

    /// True when the error was already classified by the update pipeline.
    #[must_use]
    pub const fn is_update_error(&self) -> bool {
        self.update_error().is_some()
    }

    #[must_use]
    pub const fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self.update_error(),
            Some(UpdateError::ConcurrencyConflict { .. })
        )
    }

    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self.update_error(),
            Some(UpdateError::ProtocolViolation { .. })
        )
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.class, ErrorClass::Cancelled)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Update(UpdateError),
}

///
/// UpdateError
///
/// Failure taxonomy of batch execution. A full batch is not an error and
/// never appears here.
///

#[derive(Debug, ThisError)]
pub enum UpdateError {
    #[error(
        "concurrency conflict on {command}: expected {expected} affected row(s), store reported {actual}"
    )]
    ConcurrencyConflict {
        command: CommandRef,
        expected: u64,
        actual: u64,
    },

    #[error("result protocol violation at command {command_index}: {message}")]
    ProtocolViolation {
        command_index: usize,
        message: String,
    },

    #[error("store failure")]
    StoreFailure {
        command: Option<CommandRef>,
        #[source]
        source: Box<InternalError>,
    },

    #[error("operation cancelled")]
    Cancelled,
}

///
/// CommandRef
///
/// Identifies one command of a batch in error reports.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandRef {
    pub index: usize,
    pub table: String,
    pub entry: EntryRef,
}

impl fmt::Display for CommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command {} (table '{}', entry {})",
            self.index, self.table, self.entry
        )
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Conflict,
    InvariantViolation,
    Internal,
    Unsupported,
    Cancelled,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Conflict => "conflict",
            Self::InvariantViolation => "invariant_violation",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Command,
    Batch,
    Generator,
    Connection,
    Store,
    Reader,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Command => "command",
            Self::Batch => "batch",
            Self::Generator => "generator",
            Self::Connection => "connection",
            Self::Store => "store",
            Self::Reader => "reader",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

impl From<rowbatch_config::ConfigError> for InternalError {
    fn from(err: rowbatch_config::ConfigError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Config, err.to_string())
    }
}
