//! Store-facing seams: value encoding, commands, connections and readers.
//!
//! Connections and readers are implemented by store drivers. This module
//! only fixes the scoping rules: a connection opened for a command is
//! closed on every exit path, cancellation included.

mod command;
mod connection;
mod mapping;
mod reader;

use crate::error::{ErrorOrigin, InternalError};
use std::future::Future;
use tokio_util::sync::CancellationToken;

// re-exports
pub use command::{
    AsyncRelationalDataReader, RelationalCommand, RelationalCommandBuilder, RelationalDataReader,
    RelationalParameter, StoreCommand,
};
pub use connection::{
    AsyncConnection, Connection, ConnectionGuard, ConnectionSettings, StoreConnection,
    TransactionId,
};
pub use mapping::{DbType, ParameterDirection, StoreParameter, TypeMapping};
pub use reader::{AsyncDataReader, BufferedReader, DataReader};

/// Await `fut` unless `cancel` fires first.
///
/// Cancellation is checked before polling, so an already-cancelled token
/// never starts the operation.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    origin: ErrorOrigin,
    fut: impl Future<Output = Result<T, InternalError>>,
) -> Result<T, InternalError> {
    if cancel.is_cancelled() {
        return Err(InternalError::cancelled(origin));
    }

    cancel
        .run_until_cancelled(fut)
        .await
        .unwrap_or_else(|| Err(InternalError::cancelled(origin)))
}
