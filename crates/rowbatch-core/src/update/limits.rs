use crate::{error::InternalError, modification::ModificationCommand};
use rowbatch_config::BatchConfig;

///
/// BatchView
///
/// Read-only view of a batch's accepted commands, handed to limit checks.
///

#[derive(Clone, Copy, Debug)]
pub struct BatchView<'a> {
    pub commands: &'a [ModificationCommand],
    pub parameter_count: usize,
}

impl BatchView<'_> {
    #[must_use]
    pub const fn command_count(&self) -> usize {
        self.commands.len()
    }
}

///
/// BatchLimits
///
/// Provider-specific structural limits of one round trip. Checked after
/// every add, since limits may depend on cumulative parameter counts.
///

pub trait BatchLimits {
    /// Cheap pre-check before a command is tentatively appended.
    fn can_add_command(&self, _batch: BatchView<'_>, _command: &ModificationCommand) -> bool {
        true
    }

    /// Whether the batch, including the newest command, is still valid.
    fn is_batch_valid(&self, batch: BatchView<'_>) -> Result<bool, InternalError>;
}

///
/// CommandLimits
///
/// Caps on statements and bound parameters per round trip.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CommandLimits {
    pub max_commands: usize,
    pub max_parameters: usize,
}

impl CommandLimits {
    #[must_use]
    pub const fn new(max_commands: usize, max_parameters: usize) -> Self {
        Self {
            max_commands,
            max_parameters,
        }
    }

    #[must_use]
    pub const fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.batch.max_batch_size, config.batch.max_parameters)
    }
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}

impl BatchLimits for CommandLimits {
    fn can_add_command(&self, batch: BatchView<'_>, _command: &ModificationCommand) -> bool {
        batch.command_count() < self.max_commands
    }

    fn is_batch_valid(&self, batch: BatchView<'_>) -> Result<bool, InternalError> {
        Ok(batch.command_count() <= self.max_commands
            && batch.parameter_count <= self.max_parameters)
    }
}

///
/// SingularLimits
///
/// One command per round trip.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct SingularLimits;

impl BatchLimits for SingularLimits {
    fn can_add_command(&self, batch: BatchView<'_>, _command: &ModificationCommand) -> bool {
        batch.command_count() == 0
    }

    fn is_batch_valid(&self, batch: BatchView<'_>) -> Result<bool, InternalError> {
        Ok(batch.command_count() == 1)
    }
}
