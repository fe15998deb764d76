use crate::{
    error::InternalError,
    modification::{EntryWriteBack, ModificationCommand},
    sql::UpdateSqlGenerator,
    storage::{AsyncConnection, Connection},
    update::{AddCommand, BatchLimits, BatchOptions, ExecutedBatch, ReaderBatch, SingularLimits},
};
use rowbatch_config::BatchConfig;
use tokio_util::sync::CancellationToken;

///
/// SaveOutcome
///
/// Result of one save operation across all of its batches.
///

#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub commands: Vec<ModificationCommand>,
    pub rows_affected: u64,
    pub batches: usize,
}

impl SaveOutcome {
    fn absorb(&mut self, executed: ExecutedBatch) {
        self.rows_affected += executed.total_rows_affected();
        self.batches += 1;
        self.commands.extend(executed.commands);
    }
}

///
/// BatchPipeline
///
/// Splits an ordered command stream into batches and runs them one after
/// another on the same connection. The first failing batch stops the save;
/// commands of earlier batches stay applied.
///

pub struct BatchPipeline<'g, G: ?Sized, L: ?Sized> {
    generator: &'g G,
    limits: &'g L,
    options: BatchOptions,
    min_batch_size: usize,
}

impl<'g, G, L> BatchPipeline<'g, G, L>
where
    G: UpdateSqlGenerator + ?Sized,
    L: BatchLimits + ?Sized,
{
    #[must_use]
    pub const fn new(generator: &'g G, limits: &'g L, options: BatchOptions) -> Self {
        Self {
            generator,
            limits,
            options,
            min_batch_size: 1,
        }
    }

    #[must_use]
    pub fn from_config(generator: &'g G, limits: &'g L, config: &BatchConfig) -> Self {
        Self::new(generator, limits, BatchOptions::from_config(config))
            .min_batch_size(config.batch.min_batch_size)
    }

    /// Closed batches with fewer commands run one command per round trip.
    #[must_use]
    pub const fn min_batch_size(mut self, min_batch_size: usize) -> Self {
        self.min_batch_size = min_batch_size;
        self
    }

    fn new_batch(&self) -> ReaderBatch<'g, G, L> {
        ReaderBatch::new(self.generator, self.limits, self.options)
    }

    /// Batch and execute `commands` in order.
    pub fn execute<C: Connection + ?Sized>(
        &self,
        commands: impl IntoIterator<Item = ModificationCommand>,
        connection: &mut C,
        write_back: &mut dyn EntryWriteBack,
    ) -> Result<SaveOutcome, InternalError> {
        let mut outcome = SaveOutcome::default();
        let mut batch = self.new_batch();

        for command in commands {
            if let AddCommand::Full(command) = batch.try_add(command)? {
                if batch.is_empty() {
                    return Err(oversized(&command));
                }
                let closed = std::mem::replace(&mut batch, self.new_batch());
                self.run(closed, connection, write_back, &mut outcome)?;
                self.start_batch(&mut batch, command)?;
            }
        }

        if !batch.is_empty() {
            self.run(batch, connection, write_back, &mut outcome)?;
        }

        Ok(outcome)
    }

    /// Async counterpart of [`Self::execute`]. Cancellation stops the save
    /// at the next suspension point; batches already executed stay applied.
    pub async fn execute_async<C: AsyncConnection + ?Sized>(
        &self,
        commands: impl IntoIterator<Item = ModificationCommand>,
        connection: &mut C,
        write_back: &mut (dyn EntryWriteBack + Send),
        cancel: &CancellationToken,
    ) -> Result<SaveOutcome, InternalError> {
        let mut outcome = SaveOutcome::default();
        let mut batch = self.new_batch();

        for command in commands {
            if let AddCommand::Full(command) = batch.try_add(command)? {
                if batch.is_empty() {
                    return Err(oversized(&command));
                }
                let closed = std::mem::replace(&mut batch, self.new_batch());
                self.run_async(closed, connection, &mut *write_back, cancel, &mut outcome)
                    .await?;
                self.start_batch(&mut batch, command)?;
            }
        }

        if !batch.is_empty() {
            self.run_async(batch, connection, write_back, cancel, &mut outcome)
                .await?;
        }

        Ok(outcome)
    }

    fn start_batch(
        &self,
        batch: &mut ReaderBatch<'g, G, L>,
        command: ModificationCommand,
    ) -> Result<(), InternalError> {
        match batch.try_add(command)? {
            AddCommand::Added => Ok(()),
            AddCommand::Full(command) => Err(oversized(&command)),
        }
    }

    fn splits(&self, batch: &ReaderBatch<'g, G, L>) -> bool {
        batch.len() > 1 && batch.len() < self.min_batch_size
    }

    fn run<C: Connection + ?Sized>(
        &self,
        batch: ReaderBatch<'g, G, L>,
        connection: &mut C,
        write_back: &mut dyn EntryWriteBack,
        outcome: &mut SaveOutcome,
    ) -> Result<(), InternalError> {
        tracing::debug!(
            commands = batch.len(),
            parameters = batch.parameter_count(),
            "executing batch"
        );

        if !self.splits(&batch) {
            outcome.absorb(batch.execute(connection, write_back)?);
            return Ok(());
        }

        let singular = SingularLimits;
        for command in batch.into_commands() {
            let mut single = ReaderBatch::new(self.generator, &singular, self.options);
            self.start_singular(&mut single, command)?;
            outcome.absorb(single.execute(connection, &mut *write_back)?);
        }

        Ok(())
    }

    async fn run_async<C: AsyncConnection + ?Sized>(
        &self,
        batch: ReaderBatch<'g, G, L>,
        connection: &mut C,
        write_back: &mut (dyn EntryWriteBack + Send),
        cancel: &CancellationToken,
        outcome: &mut SaveOutcome,
    ) -> Result<(), InternalError> {
        tracing::debug!(
            commands = batch.len(),
            parameters = batch.parameter_count(),
            "executing batch"
        );

        if !self.splits(&batch) {
            outcome.absorb(batch.execute_async(connection, write_back, cancel).await?);
            return Ok(());
        }

        let singular = SingularLimits;
        for command in batch.into_commands() {
            let mut single = ReaderBatch::new(self.generator, &singular, self.options);
            self.start_singular(&mut single, command)?;
            outcome.absorb(
                single
                    .execute_async(connection, &mut *write_back, cancel)
                    .await?,
            );
        }

        Ok(())
    }

    fn start_singular(
        &self,
        single: &mut ReaderBatch<'_, G, SingularLimits>,
        command: ModificationCommand,
    ) -> Result<(), InternalError> {
        match single.try_add(command)? {
            AddCommand::Added => Ok(()),
            AddCommand::Full(_) => Err(InternalError::batch_invariant(
                "singular batch rejected its only command",
            )),
        }
    }
}

// A command that does not fit an empty batch never will.
fn oversized(command: &ModificationCommand) -> InternalError {
    InternalError::batch_unsupported(format!(
        "command for table '{}' exceeds the batch limits on its own",
        command.table()
    ))
}
