use crate::{
    error::InternalError,
    storage::{AsyncDataReader, DataReader, StoreCommand},
    value::Value,
};
use async_trait::async_trait;
use rowbatch_config::BatchConfig;
use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

///
/// TransactionId
///
/// Opaque handle of the ambient store transaction a command enlists in.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TransactionId(pub u64);

///
/// ConnectionSettings
///
/// Per-connection state copied onto every store command.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConnectionSettings {
    pub transaction: Option<TransactionId>,
    pub command_timeout: Option<Duration>,
}

impl ConnectionSettings {
    #[must_use]
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            transaction: None,
            command_timeout: config.command_timeout(),
        }
    }
}

///
/// StoreConnection
///
/// Lifecycle shared by the blocking and async connection seams.
///

pub trait StoreConnection {
    fn settings(&self) -> ConnectionSettings;

    /// Release the connection. Must tolerate a connection that never
    /// finished opening, and must not fail.
    fn close(&mut self);
}

///
/// Connection
///
/// Blocking store connection.
///

pub trait Connection: StoreConnection {
    type Reader: DataReader;

    fn open(&mut self) -> Result<(), InternalError>;

    fn execute_reader(&mut self, command: &StoreCommand) -> Result<Self::Reader, InternalError>;

    fn execute_non_query(&mut self, command: &StoreCommand) -> Result<u64, InternalError>;

    fn execute_scalar(&mut self, command: &StoreCommand) -> Result<Value, InternalError>;
}

///
/// AsyncConnection
///
/// Suspension-capable store connection. `close` stays synchronous so a
/// guard can release the connection from `Drop`.
///

#[async_trait]
pub trait AsyncConnection: StoreConnection + Send {
    type Reader: AsyncDataReader + Send;

    async fn open_async(&mut self) -> Result<(), InternalError>;

    async fn execute_reader_async(
        &mut self,
        command: &StoreCommand,
    ) -> Result<Self::Reader, InternalError>;

    async fn execute_non_query_async(&mut self, command: &StoreCommand)
    -> Result<u64, InternalError>;

    async fn execute_scalar_async(&mut self, command: &StoreCommand)
    -> Result<Value, InternalError>;
}

///
/// ConnectionGuard
///
/// Scoped connection use: closes the connection on every exit path,
/// including early returns, cancellation and unwinding.
///

pub struct ConnectionGuard<'c, C: StoreConnection + ?Sized> {
    connection: &'c mut C,
}

impl<'c, C: StoreConnection + ?Sized> ConnectionGuard<'c, C> {
    /// Take the connection into scope without opening it.
    pub(crate) const fn acquire(connection: &'c mut C) -> Self {
        Self { connection }
    }
}

impl<'c, C: Connection + ?Sized> ConnectionGuard<'c, C> {
    /// Open the connection and scope it to the guard.
    pub fn open(connection: &'c mut C) -> Result<Self, InternalError> {
        let guard = Self::acquire(connection);
        guard.connection.open()?;

        Ok(guard)
    }
}

impl<C: StoreConnection + ?Sized> Deref for ConnectionGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.connection
    }
}

impl<C: StoreConnection + ?Sized> DerefMut for ConnectionGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
    }
}

impl<C: StoreConnection + ?Sized> Drop for ConnectionGuard<'_, C> {
    fn drop(&mut self) {
        self.connection.close();
    }
}
