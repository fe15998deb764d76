use crate::Error;
use rowbatch_config::BatchConfig;
use rowbatch_core::{
    modification::{EntryWriteBack, ModificationCommand},
    sql::UpdateSqlGenerator,
    storage::{AsyncConnection, Connection},
    update::{BatchPipeline, CommandLimits, SaveOutcome},
};
use std::path::Path;
use tokio_util::sync::CancellationToken;

///
/// Saver
///
/// One dialect plus one batching configuration. Each `save` call is an
/// independent save operation over the given connection.
///

pub struct Saver<'g, G: ?Sized> {
    generator: &'g G,
    limits: CommandLimits,
    config: BatchConfig,
}

impl<'g, G: UpdateSqlGenerator + ?Sized> Saver<'g, G> {
    #[must_use]
    pub const fn new(generator: &'g G, config: BatchConfig) -> Self {
        Self {
            generator,
            limits: CommandLimits::from_config(&config),
            config,
        }
    }

    /// Load and validate a TOML configuration file.
    pub fn from_path(generator: &'g G, path: impl AsRef<Path>) -> Result<Self, Error> {
        let config = BatchConfig::from_path(path)?;

        Ok(Self::new(generator, config))
    }

    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    #[must_use]
    pub const fn limits(&self) -> CommandLimits {
        self.limits
    }

    fn pipeline(&self) -> BatchPipeline<'_, G, CommandLimits> {
        BatchPipeline::from_config(self.generator, &self.limits, &self.config)
    }

    pub fn save<C: Connection + ?Sized>(
        &self,
        commands: impl IntoIterator<Item = ModificationCommand>,
        connection: &mut C,
        write_back: &mut dyn EntryWriteBack,
    ) -> Result<SaveOutcome, Error> {
        self.pipeline()
            .execute(commands, connection, write_back)
            .map_err(Error::from)
    }

    pub async fn save_async<C: AsyncConnection + ?Sized>(
        &self,
        commands: impl IntoIterator<Item = ModificationCommand>,
        connection: &mut C,
        write_back: &mut (dyn EntryWriteBack + Send),
        cancel: &CancellationToken,
    ) -> Result<SaveOutcome, Error> {
        self.pipeline()
            .execute_async(commands, connection, write_back, cancel)
            .await
            .map_err(Error::from)
    }
}

///
/// TESTS
///
