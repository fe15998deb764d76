use crate::{
    error::InternalError,
    modification::{EntryWriteBack, ModificationCommand},
    obs::sink::{MetricsEvent, record},
    storage::DataReader,
    value::Value,
};

///
/// ResultShape
///
/// What one command's result set must look like.
///
/// Generated     : at most one row holding one value per read column
/// AffectedCount : exactly one row holding the affected-row count
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum ResultShape {
    Generated { columns: usize },
    AffectedCount,
}

impl ResultShape {
    pub(super) fn of(command: &ModificationCommand) -> Self {
        match command.read_column_count() {
            0 => Self::AffectedCount,
            columns => Self::Generated { columns },
        }
    }

    pub(super) const fn field_count(self) -> usize {
        match self {
            Self::Generated { columns } => columns,
            Self::AffectedCount => 1,
        }
    }
}

///
/// RowOutcome
///
/// Fully read result of one command, not yet applied.
///

#[derive(Debug)]
pub(super) enum RowOutcome {
    Generated(Vec<Value>),
    Affected(u64),
    Missing,
}

///
/// ResultConsumer
///
/// Walks the result sets of an executed batch in lock-step with its
/// commands. Each command's result is read completely before any of it is
/// applied, so a command is either fully applied or untouched.
///

pub struct ResultConsumer<'b> {
    pub(super) commands: &'b mut [ModificationCommand],
    pub(super) position: usize,
    pub(super) rows_affected: Vec<u64>,
}

impl<'b> ResultConsumer<'b> {
    pub fn new(commands: &'b mut [ModificationCommand]) -> Self {
        let capacity = commands.len();

        Self {
            commands,
            position: 0,
            rows_affected: Vec::with_capacity(capacity),
        }
    }

    /// Index of the command whose result is being read.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Affected-row counts of the commands consumed so far.
    #[must_use]
    pub fn rows_affected(&self) -> &[u64] {
        &self.rows_affected
    }

    #[must_use]
    pub fn into_rows_affected(self) -> Vec<u64> {
        self.rows_affected
    }

    /// Consume every command's result set from a blocking reader.
    pub fn consume<R: DataReader + ?Sized>(
        &mut self,
        reader: &mut R,
        write_back: &mut dyn EntryWriteBack,
    ) -> Result<(), InternalError> {
        while self.position < self.commands.len() {
            let index = self.position;
            if index > 0 && !reader.next_result()? {
                return Err(missing_result_set(index));
            }

            let shape = ResultShape::of(&self.commands[index]);
            let outcome = if reader.read()? {
                check_field_count(index, shape, reader.field_count())?;

                let mut values = Vec::with_capacity(shape.field_count());
                for ordinal in 0..shape.field_count() {
                    values.push(reader.get_value(ordinal)?);
                }

                if reader.read()? {
                    return Err(extra_row(index));
                }

                row_outcome(index, shape, values)?
            } else {
                RowOutcome::Missing
            };

            self.complete(index, shape, outcome, write_back)?;
        }

        if reader.next_result()? {
            return Err(unconsumed_result_set(self.commands.len()));
        }

        Ok(())
    }

    /// Apply one command's fully read result and advance.
    pub(super) fn complete(
        &mut self,
        index: usize,
        shape: ResultShape,
        outcome: RowOutcome,
        write_back: &mut dyn EntryWriteBack,
    ) -> Result<(), InternalError> {
        let command = &mut self.commands[index];

        let (affected, generated) = match (shape, outcome) {
            (ResultShape::Generated { .. }, RowOutcome::Generated(values)) => {
                let generated = values.len() as u64;
                command.apply_generated_values(index, values, write_back)?;
                (1, generated)
            }
            (ResultShape::AffectedCount, RowOutcome::Affected(affected)) if affected > 0 => {
                (affected, 0)
            }
            (ResultShape::AffectedCount, RowOutcome::Affected(affected)) => {
                return Err(InternalError::concurrency_conflict(
                    command.command_ref(index),
                    1,
                    affected,
                ));
            }
            (ResultShape::Generated { .. }, RowOutcome::Missing) => {
                return Err(InternalError::concurrency_conflict(
                    command.command_ref(index),
                    1,
                    0,
                ));
            }
            (ResultShape::AffectedCount, RowOutcome::Missing) => {
                return Err(InternalError::protocol_violation(
                    index,
                    "missing affected-row count",
                ));
            }
            (shape, outcome) => {
                return Err(InternalError::protocol_violation(
                    index,
                    format!("result {outcome:?} does not match expected shape {shape:?}"),
                ));
            }
        };

        record(MetricsEvent::CommandApplied {
            table: command.table(),
            kind: command.kind(),
            generated_values: generated,
        });
        self.rows_affected.push(affected);
        self.position += 1;

        Ok(())
    }
}

/// Interpret one fully read row according to the expected shape.
pub(super) fn row_outcome(
    index: usize,
    shape: ResultShape,
    mut values: Vec<Value>,
) -> Result<RowOutcome, InternalError> {
    match shape {
        ResultShape::Generated { .. } => Ok(RowOutcome::Generated(values)),
        ResultShape::AffectedCount => {
            let value = values.pop().unwrap_or_default();
            value.as_row_count().map(RowOutcome::Affected).ok_or_else(|| {
                InternalError::protocol_violation(
                    index,
                    format!(
                        "affected-row count must be a non-negative int, got {}",
                        value.kind_label()
                    ),
                )
            })
        }
    }
}

pub(super) fn check_field_count(
    index: usize,
    shape: ResultShape,
    actual: usize,
) -> Result<(), InternalError> {
    let expected = shape.field_count();
    if actual != expected {
        return Err(InternalError::protocol_violation(
            index,
            format!("expected {expected} value(s) in result row, found {actual}"),
        ));
    }

    Ok(())
}

pub(super) fn missing_result_set(index: usize) -> InternalError {
    InternalError::protocol_violation(index, "result stream ended before this command's result set")
}

pub(super) fn extra_row(index: usize) -> InternalError {
    InternalError::protocol_violation(index, "result set holds more than one row")
}

pub(super) fn unconsumed_result_set(index: usize) -> InternalError {
    InternalError::protocol_violation(index, "unconsumed result set after the last command")
}
