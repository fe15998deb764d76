use crate::{
    error::{ErrorOrigin, InternalError, UpdateError},
    modification::{EntryWriteBack, ModificationCommand},
    obs::sink::{MetricsEvent, Span, record},
    sql::UpdateSqlGenerator,
    storage::{AsyncConnection, Connection, ConnectionGuard, cancellable},
    update::{BatchLimits, ReaderBatch, ResultConsumer},
};
use tokio_util::sync::CancellationToken;

///
/// ExecutedBatch
///
/// Commands handed back after a successful round trip, with generated
/// values applied, plus the affected-row count of each command.
///

#[derive(Debug, Default)]
pub struct ExecutedBatch {
    pub commands: Vec<ModificationCommand>,
    pub rows_affected: Vec<u64>,
}

impl ExecutedBatch {
    #[must_use]
    pub fn total_rows_affected(&self) -> u64 {
        self.rows_affected.iter().sum()
    }
}

impl<G, L> ReaderBatch<'_, G, L>
where
    G: UpdateSqlGenerator + ?Sized,
    L: BatchLimits + ?Sized,
{
    /// Execute the batch in one round trip and reconcile its result rows.
    ///
    /// The connection is opened for the call and closed before this
    /// returns, whether it succeeds or fails.
    pub fn execute<C: Connection + ?Sized>(
        mut self,
        connection: &mut C,
        write_back: &mut dyn EntryWriteBack,
    ) -> Result<ExecutedBatch, InternalError> {
        if self.commands.is_empty() {
            return Ok(ExecutedBatch::default());
        }

        let command = self.create_relational_command()?;
        let mut span = Span::new(self.commands.len(), self.parameter_count);
        let mut consumer = ResultConsumer::new(&mut self.commands);

        let outcome = command
            .execute_reader(connection)
            .and_then(|mut reader| consumer.consume(&mut reader, write_back));

        let position = consumer.position();
        let rows_affected = consumer.into_rows_affected();

        match outcome {
            Ok(()) => {
                span.set_rows(rows_affected.iter().sum());
                Ok(ExecutedBatch {
                    commands: self.commands,
                    rows_affected,
                })
            }
            Err(err) => Err(self.classify_failure(err, position)),
        }
    }

    /// Async counterpart of [`Self::execute`].
    ///
    /// Cancellation is observed at open, execute and every result read;
    /// the connection is still closed before the cancellation error
    /// reaches the caller.
    pub async fn execute_async<C: AsyncConnection + ?Sized>(
        mut self,
        connection: &mut C,
        write_back: &mut (dyn EntryWriteBack + Send),
        cancel: &CancellationToken,
    ) -> Result<ExecutedBatch, InternalError> {
        if self.commands.is_empty() {
            return Ok(ExecutedBatch::default());
        }

        let command = self.create_relational_command()?;
        let mut span = Span::new(self.commands.len(), self.parameter_count);
        let mut consumer = ResultConsumer::new(&mut self.commands);

        let outcome = {
            let mut connection = ConnectionGuard::acquire(connection);
            let opened =
                cancellable(cancel, ErrorOrigin::Connection, connection.open_async()).await;

            match opened {
                Ok(()) => {
                    let store_command = command.create_command(connection.settings());
                    match cancellable(
                        cancel,
                        ErrorOrigin::Store,
                        connection.execute_reader_async(&store_command),
                    )
                    .await
                    {
                        Ok(mut reader) => {
                            consumer
                                .consume_async(&mut reader, &mut *write_back, cancel)
                                .await
                        }
                        Err(err) => Err(err),
                    }
                }
                Err(err) => Err(err),
            }
            // reader, then connection guard, drop here
        };

        let position = consumer.position();
        let rows_affected = consumer.into_rows_affected();

        match outcome {
            Ok(()) => {
                span.set_rows(rows_affected.iter().sum());
                Ok(ExecutedBatch {
                    commands: self.commands,
                    rows_affected,
                })
            }
            Err(err) => Err(self.classify_failure(err, position)),
        }
    }

    /// Pass classified failures through; wrap anything else as a store
    /// failure attributed to the command whose results were being read.
    fn classify_failure(&self, err: InternalError, position: usize) -> InternalError {
        match err.update_error() {
            Some(UpdateError::ConcurrencyConflict { command, .. }) => {
                tracing::warn!(error = %err, "concurrency conflict");
                record(MetricsEvent::ConcurrencyConflict {
                    table: &command.table,
                });
                err
            }
            Some(UpdateError::ProtocolViolation { .. }) => {
                tracing::warn!(error = %err, "result protocol violation");
                record(MetricsEvent::ProtocolViolation);
                err
            }
            Some(UpdateError::Cancelled) => {
                tracing::debug!(commands = self.commands.len(), "batch execution cancelled");
                record(MetricsEvent::Cancelled);
                err
            }
            Some(UpdateError::StoreFailure { .. }) => {
                record(MetricsEvent::StoreFailure);
                err
            }
            None => {
                let command = self
                    .commands
                    .get(position)
                    .map(|command| command.command_ref(position))
                    .or_else(|| self.commands.first().map(|command| command.command_ref(0)));

                tracing::error!(
                    error = %err,
                    probable_command = ?command,
                    "store update failed"
                );
                record(MetricsEvent::StoreFailure);

                InternalError::store_failure(command, err)
            }
        }
    }
}
