//! Core runtime for rowbatch: row modification commands, batch building,
//! statement text caching, batch execution and result reconciliation.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod error;
pub mod modification;
pub mod obs;
pub mod sql;
pub mod storage;
pub mod update;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, connections, readers or metrics are re-exported here.
///

pub mod prelude {
    pub use crate::{
        modification::{
            ChangeKind, ColumnFlags, ColumnSpec, EntryRef, EntryWriteBack, ModificationCommand,
            ParameterNameGenerator,
        },
        sql::UpdateSqlGenerator,
        storage::{DbType, TypeMapping},
        update::{AddCommand, BatchPipeline, CommandLimits, ReaderBatch},
        value::Value,
    };
}
