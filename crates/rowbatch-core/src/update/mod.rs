//! Batched execution of row modifications.
//!
//! A [`ReaderBatch`] accepts commands until its [`BatchLimits`] say no,
//! renders them into one multi-statement text, executes it in a single
//! round trip and hands the result stream to a [`ResultConsumer`], which
//! reconciles it command by command. [`BatchPipeline`] drives a whole
//! save: it closes full batches and executes them in order.

mod batch;
mod consume;
mod consume_async;
mod execute;
mod limits;
mod pipeline;

// re-exports
pub use batch::{AddCommand, BatchOptions, ReaderBatch};
pub use consume::ResultConsumer;
pub use execute::ExecutedBatch;
pub use limits::{BatchLimits, BatchView, CommandLimits, SingularLimits};
pub use pipeline::{BatchPipeline, SaveOutcome};
