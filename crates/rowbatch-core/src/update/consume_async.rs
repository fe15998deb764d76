use crate::{
    error::{ErrorOrigin, InternalError},
    modification::EntryWriteBack,
    storage::{AsyncDataReader, cancellable},
    update::consume::{
        ResultConsumer, ResultShape, RowOutcome, check_field_count, extra_row,
        missing_result_set, row_outcome, unconsumed_result_set,
    },
    value::Value,
};
use tokio_util::sync::CancellationToken;

///
/// ConsumeStep
///
/// States of the async walk. Only `NextResult`, `EnterRow`, `ReadValue`,
/// `LeaveRow` and `Finish` suspend; `Complete` is synchronous, so a
/// command's staged values are applied in one step or dropped.
///

#[derive(Debug)]
enum ConsumeStep {
    NextResult,
    EnterRow,
    ReadValue { ordinal: usize },
    LeaveRow,
    Complete(RowOutcome),
    Finish,
}

impl ResultConsumer<'_> {
    /// Consume every command's result set from a suspension-capable reader.
    ///
    /// Same semantics as [`ResultConsumer::consume`]. On cancellation the
    /// values staged for the command in flight are discarded.
    pub async fn consume_async<R: AsyncDataReader + ?Sized>(
        &mut self,
        reader: &mut R,
        write_back: &mut (dyn EntryWriteBack + Send),
        cancel: &CancellationToken,
    ) -> Result<(), InternalError> {
        let mut staged: Vec<Value> = Vec::new();
        let mut step = if self.commands.is_empty() {
            ConsumeStep::Finish
        } else {
            ConsumeStep::EnterRow
        };

        loop {
            let index = self.position;

            step = match step {
                ConsumeStep::NextResult => {
                    if !suspend(cancel, reader.next_result_async()).await? {
                        return Err(missing_result_set(index));
                    }
                    ConsumeStep::EnterRow
                }

                ConsumeStep::EnterRow => {
                    staged.clear();
                    if suspend(cancel, reader.read_async()).await? {
                        let shape = ResultShape::of(&self.commands[index]);
                        check_field_count(index, shape, reader.field_count())?;
                        ConsumeStep::ReadValue { ordinal: 0 }
                    } else {
                        ConsumeStep::Complete(RowOutcome::Missing)
                    }
                }

                ConsumeStep::ReadValue { ordinal } => {
                    let shape = ResultShape::of(&self.commands[index]);
                    if ordinal < shape.field_count() {
                        staged.push(suspend(cancel, reader.get_value_async(ordinal)).await?);
                        ConsumeStep::ReadValue {
                            ordinal: ordinal + 1,
                        }
                    } else {
                        ConsumeStep::LeaveRow
                    }
                }

                ConsumeStep::LeaveRow => {
                    if suspend(cancel, reader.read_async()).await? {
                        return Err(extra_row(index));
                    }
                    let shape = ResultShape::of(&self.commands[index]);
                    ConsumeStep::Complete(row_outcome(index, shape, std::mem::take(&mut staged))?)
                }

                ConsumeStep::Complete(outcome) => {
                    let shape = ResultShape::of(&self.commands[index]);
                    self.complete(index, shape, outcome, &mut *write_back)?;

                    if self.position < self.commands.len() {
                        ConsumeStep::NextResult
                    } else {
                        ConsumeStep::Finish
                    }
                }

                ConsumeStep::Finish => {
                    if suspend(cancel, reader.next_result_async()).await? {
                        return Err(unconsumed_result_set(self.commands.len()));
                    }
                    return Ok(());
                }
            };
        }
    }
}

async fn suspend<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, InternalError>>,
) -> Result<T, InternalError> {
    cancellable(cancel, ErrorOrigin::Reader, fut).await
}
