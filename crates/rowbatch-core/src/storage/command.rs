use crate::{
    error::{ErrorOrigin, InternalError},
    storage::{
        AsyncConnection, AsyncDataReader, Connection, ConnectionGuard, ConnectionSettings,
        DataReader, StoreParameter, TransactionId, TypeMapping, cancellable,
    },
    value::Value,
};
use async_trait::async_trait;
use std::{fmt::Write as _, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::Level;

///
/// RelationalParameter
///
/// A named value plus the mapping that encodes it for the store.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RelationalParameter {
    pub name: String,
    pub value: Value,
    pub type_mapping: TypeMapping,
    pub nullable: bool,
}

///
/// StoreCommand
///
/// Driver-ready command: text, bound parameters, and the connection's
/// ambient transaction and timeout.
///

#[derive(Clone, Debug, PartialEq)]
pub struct StoreCommand {
    pub text: String,
    pub parameters: Vec<StoreParameter>,
    pub transaction: Option<TransactionId>,
    pub timeout: Option<Duration>,
}

///
/// RelationalCommandBuilder
///

#[derive(Debug, Default)]
pub struct RelationalCommandBuilder {
    text: String,
    parameters: Vec<RelationalParameter>,
    sensitive_data_logging: bool,
    command_timeout: Option<Duration>,
}

impl RelationalCommandBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Include parameter values in command logs.
    #[must_use]
    pub const fn sensitive_data_logging(mut self, enabled: bool) -> Self {
        self.sensitive_data_logging = enabled;
        self
    }

    /// Timeout used when the connection does not set its own.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    #[must_use]
    pub fn append(mut self, text: &str) -> Self {
        self.text.push_str(text);
        self
    }

    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        value: Value,
        type_mapping: TypeMapping,
        nullable: bool,
    ) {
        self.parameters.push(RelationalParameter {
            name: name.into(),
            value,
            type_mapping,
            nullable,
        });
    }

    #[must_use]
    pub fn build(self) -> RelationalCommand {
        RelationalCommand {
            text: self.text,
            parameters: self.parameters,
            sensitive_data_logging: self.sensitive_data_logging,
            command_timeout: self.command_timeout,
        }
    }
}

///
/// RelationalCommand
///
/// One statement text with its parameters. Every execute method opens the
/// connection first and closes it on all exit paths.
///

#[derive(Clone, Debug)]
pub struct RelationalCommand {
    text: String,
    parameters: Vec<RelationalParameter>,
    sensitive_data_logging: bool,
    command_timeout: Option<Duration>,
}

impl RelationalCommand {
    pub fn new(text: impl Into<String>, parameters: Vec<RelationalParameter>) -> Self {
        Self {
            text: text.into(),
            parameters,
            sensitive_data_logging: false,
            command_timeout: None,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn parameters(&self) -> &[RelationalParameter] {
        &self.parameters
    }

    /// Bind the command to a connection's settings. A connection timeout
    /// wins over the command's own.
    #[must_use]
    pub fn create_command(&self, settings: ConnectionSettings) -> StoreCommand {
        let parameters = self
            .parameters
            .iter()
            .map(|p| {
                p.type_mapping
                    .create_parameter(&p.name, p.value.clone(), p.nullable)
            })
            .collect();

        let command = StoreCommand {
            text: self.text.clone(),
            parameters,
            transaction: settings.transaction,
            timeout: settings.command_timeout.or(self.command_timeout),
        };
        self.log_command(&command);

        command
    }

    fn log_command(&self, command: &StoreCommand) {
        if !tracing::enabled!(target: "rowbatch::command", Level::DEBUG) {
            return;
        }

        let mut parameters = String::new();
        for (i, p) in command.parameters.iter().enumerate() {
            if i > 0 {
                parameters.push_str(", ");
            }
            if self.sensitive_data_logging {
                let _ = write!(parameters, "{}={}", p.name, p.value);
            } else {
                parameters.push_str(&p.name);
            }
        }

        tracing::debug!(
            target: "rowbatch::command",
            parameters = %parameters,
            timeout = ?command.timeout,
            "executing command:\n{}",
            command.text
        );
    }

    pub fn execute_non_query<C: Connection + ?Sized>(
        &self,
        connection: &mut C,
    ) -> Result<u64, InternalError> {
        let mut connection = ConnectionGuard::open(connection)?;
        let command = self.create_command(connection.settings());

        connection.execute_non_query(&command)
    }

    pub fn execute_scalar<C: Connection + ?Sized>(
        &self,
        connection: &mut C,
    ) -> Result<Value, InternalError> {
        let mut connection = ConnectionGuard::open(connection)?;
        let command = self.create_command(connection.settings());

        connection.execute_scalar(&command)
    }

    /// Execute and hand back a reader that owns the open connection; the
    /// connection closes when the reader is dropped.
    pub fn execute_reader<'c, C: Connection + ?Sized>(
        &self,
        connection: &'c mut C,
    ) -> Result<RelationalDataReader<'c, C>, InternalError> {
        let mut connection = ConnectionGuard::open(connection)?;
        let command = self.create_command(connection.settings());
        let reader = connection.execute_reader(&command)?;

        Ok(RelationalDataReader { reader, connection })
    }

    pub async fn execute_non_query_async<C: AsyncConnection + ?Sized>(
        &self,
        connection: &mut C,
        cancel: &CancellationToken,
    ) -> Result<u64, InternalError> {
        let mut connection = ConnectionGuard::acquire(connection);
        cancellable(cancel, ErrorOrigin::Connection, connection.open_async()).await?;
        let command = self.create_command(connection.settings());

        cancellable(
            cancel,
            ErrorOrigin::Store,
            connection.execute_non_query_async(&command),
        )
        .await
    }

    pub async fn execute_scalar_async<C: AsyncConnection + ?Sized>(
        &self,
        connection: &mut C,
        cancel: &CancellationToken,
    ) -> Result<Value, InternalError> {
        let mut connection = ConnectionGuard::acquire(connection);
        cancellable(cancel, ErrorOrigin::Connection, connection.open_async()).await?;
        let command = self.create_command(connection.settings());

        cancellable(
            cancel,
            ErrorOrigin::Store,
            connection.execute_scalar_async(&command),
        )
        .await
    }

    /// Async counterpart of [`Self::execute_reader`].
    pub async fn execute_reader_async<'c, C: AsyncConnection + ?Sized>(
        &self,
        connection: &'c mut C,
        cancel: &CancellationToken,
    ) -> Result<AsyncRelationalDataReader<'c, C>, InternalError> {
        let mut connection = ConnectionGuard::acquire(connection);
        cancellable(cancel, ErrorOrigin::Connection, connection.open_async()).await?;
        let command = self.create_command(connection.settings());
        let reader = cancellable(
            cancel,
            ErrorOrigin::Store,
            connection.execute_reader_async(&command),
        )
        .await?;

        Ok(AsyncRelationalDataReader { reader, connection })
    }
}

///
/// RelationalDataReader
///
/// A reader bundled with the connection it reads from.
///

pub struct RelationalDataReader<'c, C: Connection + ?Sized> {
    // field order is drop order: reader before connection
    reader: C::Reader,
    connection: ConnectionGuard<'c, C>,
}

impl<C: Connection + ?Sized> RelationalDataReader<'_, C> {
    #[must_use]
    pub fn connection_settings(&self) -> ConnectionSettings {
        self.connection.settings()
    }
}

impl<C: Connection + ?Sized> DataReader for RelationalDataReader<'_, C> {
    fn next_result(&mut self) -> Result<bool, InternalError> {
        self.reader.next_result()
    }

    fn read(&mut self) -> Result<bool, InternalError> {
        self.reader.read()
    }

    fn field_count(&self) -> usize {
        self.reader.field_count()
    }

    fn get_value(&mut self, ordinal: usize) -> Result<Value, InternalError> {
        self.reader.get_value(ordinal)
    }
}

///
/// AsyncRelationalDataReader
///

pub struct AsyncRelationalDataReader<'c, C: AsyncConnection + ?Sized> {
    // field order is drop order: reader before connection
    reader: C::Reader,
    connection: ConnectionGuard<'c, C>,
}

impl<C: AsyncConnection + ?Sized> AsyncRelationalDataReader<'_, C> {
    #[must_use]
    pub fn connection_settings(&self) -> ConnectionSettings {
        self.connection.settings()
    }
}

#[async_trait]
impl<'c, C: AsyncConnection + ?Sized> AsyncDataReader for AsyncRelationalDataReader<'c, C> {
    async fn next_result_async(&mut self) -> Result<bool, InternalError> {
        self.reader.next_result_async().await
    }

    async fn read_async(&mut self) -> Result<bool, InternalError> {
        self.reader.read_async().await
    }

    fn field_count(&self) -> usize {
        self.reader.field_count()
    }

    async fn get_value_async(&mut self, ordinal: usize) -> Result<Value, InternalError> {
        self.reader.get_value_async(ordinal).await
    }
}
