use crate::{
    error::InternalError,
    modification::{ChangeKind, ColumnModification, ModificationCommand},
    obs::sink::{MetricsEvent, record},
    sql::UpdateSqlGenerator,
    storage::{RelationalCommand, RelationalCommandBuilder},
    update::{BatchLimits, BatchView},
};
use rowbatch_config::BatchConfig;
use std::time::Duration;

///
/// BatchOptions
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchOptions {
    pub sensitive_data_logging: bool,
    pub command_timeout: Option<Duration>,
}

impl BatchOptions {
    #[must_use]
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            sensitive_data_logging: config.logging.sensitive_data_logging,
            command_timeout: config.command_timeout(),
        }
    }
}

///
/// AddCommand
///
/// Outcome of [`ReaderBatch::try_add`]. A full batch hands the command
/// back so the caller can start the next batch with it.
///

#[derive(Debug)]
pub enum AddCommand {
    Added,
    Full(ModificationCommand),
}

impl AddCommand {
    #[must_use]
    pub const fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }
}

///
/// CommandTextCache
///
/// Rendered statement text for a prefix of the accepted commands.
/// `rendered` only moves forward while a batch is being filled. Once
/// rendered, the text always ends in exactly one footer. The footer is
/// generated once per batch and re-attached after each later render.
///

#[derive(Debug, Default)]
struct CommandTextCache {
    sql: String,
    rendered: usize,
    footer_at: Option<usize>,
    footer: Option<String>,
}

impl CommandTextCache {
    fn reset<G: UpdateSqlGenerator + ?Sized>(&mut self, generator: &G) {
        self.sql.clear();
        generator.append_batch_header(&mut self.sql);
        self.rendered = 0;
        self.footer_at = None;
        self.footer = None;
    }

    fn render<G: UpdateSqlGenerator + ?Sized>(
        &mut self,
        generator: &G,
        commands: &[ModificationCommand],
    ) -> Result<&str, InternalError> {
        if self.rendered == commands.len() && self.footer_at.is_some() {
            return Ok(&self.sql);
        }

        // staged: a generator failure leaves the cached text untouched
        let mut fragments = String::new();
        for command in &commands[self.rendered..] {
            match command.kind() {
                ChangeKind::Insert => generator.append_insert_operation(&mut fragments, command),
                ChangeKind::Update => generator.append_update_operation(&mut fragments, command),
                ChangeKind::Delete => generator.append_delete_operation(&mut fragments, command),
            }?;
        }

        if let Some(at) = self.footer_at.take() {
            self.sql.truncate(at);
        }
        self.sql.push_str(&fragments);
        self.rendered = commands.len();

        self.footer_at = Some(self.sql.len());
        let footer = self.footer.get_or_insert_with(|| {
            let mut footer = String::new();
            generator.append_batch_footer(&mut footer);
            footer
        });
        self.sql.push_str(footer);

        Ok(&self.sql)
    }
}

///
/// ReaderBatch
///
/// Accumulates row commands for one round trip. Text for accepted commands
/// is rendered lazily, in order, when the final text is requested.
/// Owned by one save operation; never shared across threads.
///

pub struct ReaderBatch<'g, G: ?Sized, L: ?Sized> {
    pub(super) generator: &'g G,
    limits: &'g L,
    pub(super) options: BatchOptions,
    pub(super) commands: Vec<ModificationCommand>,
    pub(super) parameter_count: usize,
    text: CommandTextCache,
}

impl<'g, G, L> ReaderBatch<'g, G, L>
where
    G: UpdateSqlGenerator + ?Sized,
    L: BatchLimits + ?Sized,
{
    #[must_use]
    pub fn new(generator: &'g G, limits: &'g L, options: BatchOptions) -> Self {
        Self {
            generator,
            limits,
            options,
            commands: Vec::new(),
            parameter_count: 0,
            text: CommandTextCache::default(),
        }
    }

    /// Tentatively add a command, keeping it only if the batch stays valid.
    ///
    /// A full batch is reported as [`AddCommand::Full`], never as an error.
    /// Errors are fatal: the command's column set is unsupported or the
    /// limit check itself failed.
    pub fn try_add(&mut self, command: ModificationCommand) -> Result<AddCommand, InternalError> {
        command.validate()?;

        if self.commands.is_empty() {
            self.text.reset(self.generator);
        }

        if !self.limits.can_add_command(self.view(), &command) {
            return Ok(self.full(command));
        }

        let parameters = command.parameter_count();
        self.commands.push(command);
        self.parameter_count += parameters;

        match self.limits.is_batch_valid(self.view()) {
            Ok(true) => Ok(AddCommand::Added),
            Ok(false) => {
                let command = self.pop_last(parameters)?;
                Ok(self.full(command))
            }
            Err(err) => {
                self.pop_last(parameters)?;
                Err(err)
            }
        }
    }

    fn pop_last(&mut self, parameters: usize) -> Result<ModificationCommand, InternalError> {
        let command = self.commands.pop().ok_or_else(|| {
            InternalError::batch_invariant("rollback found no tentatively added command")
        })?;
        self.parameter_count -= parameters;

        Ok(command)
    }

    fn full(&self, command: ModificationCommand) -> AddCommand {
        tracing::trace!(
            commands = self.commands.len(),
            parameters = self.parameter_count,
            "batch full"
        );
        record(MetricsEvent::BatchFull {
            commands: self.commands.len() as u64,
        });

        AddCommand::Full(command)
    }

    #[must_use]
    pub fn view(&self) -> BatchView<'_> {
        BatchView {
            commands: &self.commands,
            parameter_count: self.parameter_count,
        }
    }

    #[must_use]
    pub fn commands(&self) -> &[ModificationCommand] {
        &self.commands
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[must_use]
    pub const fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Text rendered so far, without rendering pending commands.
    #[must_use]
    pub fn cached_text(&self) -> &str {
        &self.text.sql
    }

    /// Render every pending command and return the complete batch text.
    pub fn finalize_text(&mut self) -> Result<&str, InternalError> {
        if self.commands.is_empty() {
            return Ok("");
        }

        self.text.render(self.generator, &self.commands)
    }

    /// Build the single store command for the whole batch: the final text
    /// plus every column's parameters, in command then column order.
    pub fn create_relational_command(&mut self) -> Result<RelationalCommand, InternalError> {
        let text = self.finalize_text()?.to_string();

        let mut builder = RelationalCommandBuilder::new()
            .sensitive_data_logging(self.options.sensitive_data_logging)
            .command_timeout(self.options.command_timeout)
            .append(&text);

        for column in self
            .commands
            .iter()
            .flat_map(ModificationCommand::column_modifications)
        {
            self.populate_parameters(&mut builder, column);
        }

        Ok(builder.build())
    }

    fn populate_parameters(
        &self,
        builder: &mut RelationalCommandBuilder,
        column: &ColumnModification,
    ) {
        if let Some(name) = column.parameter_name() {
            builder.add_parameter(
                self.generator.generate_parameter_name(name),
                column.value().clone(),
                column.type_mapping().clone(),
                column.is_nullable(),
            );
        }

        if let Some(name) = column.original_parameter_name() {
            builder.add_parameter(
                self.generator.generate_parameter_name(name),
                column.original_value().clone(),
                column.type_mapping().clone(),
                column.is_nullable(),
            );
        }
    }

    /// Hand the accepted commands back without executing them.
    #[must_use]
    pub fn into_commands(self) -> Vec<ModificationCommand> {
        self.commands
    }
}
