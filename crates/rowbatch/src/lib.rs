//! ## Crate layout
//! - `core`: modification commands, batch building, statement text caching,
//!   batch execution, result reconciliation and observability.
//! - `config`: TOML batching configuration.
//! - `error`: the public error type with a stable kind + origin taxonomy.
//!
//! [`Saver`] wires one statement generator and one configuration into the
//! batch pipeline. The `prelude` module carries the vocabulary needed to
//! build commands and run a save.

pub use rowbatch_config as config;
pub use rowbatch_core as core;

pub mod error;
mod save;

/// re-exports
///
/// lets dialect and driver crates name these without adding them to their
/// own Cargo.toml
pub mod __reexports {
    pub use derive_more;
    pub use tokio_util;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Error, ErrorKind, ErrorOrigin};
pub use save::Saver;

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::{
        Error, ErrorKind, Saver,
        config::BatchConfig,
        core::{
            modification::{
                ChangeKind, ColumnFlags, ColumnSpec, EntryRef, EntryWriteBack,
                ModificationCommand, NoWriteBack, ParameterNameGenerator,
            },
            sql::UpdateSqlGenerator,
            storage::{
                AsyncConnection, AsyncDataReader as _, Connection, DataReader as _, DbType,
                StoreConnection as _, TypeMapping,
            },
            update::{BatchPipeline, CommandLimits, SaveOutcome},
            value::Value,
        },
    };
    pub use tokio_util::sync::CancellationToken;
}
