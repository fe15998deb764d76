//! Row and column change records handed over by the change tracker.
//!
//! A [`ModificationCommand`] is consumed by exactly one batch. It never owns
//! the tracked entity: [`EntryRef`] is an opaque handle into the tracker's
//! own table, and generated values travel back through [`EntryWriteBack`].

mod column;
mod command;

use crate::value::Value;
use derive_more::Display;
use serde::{Deserialize, Serialize};

// re-exports
pub use column::{ColumnFlags, ColumnModification, ColumnSpec};
pub use command::ModificationCommand;

///
/// ChangeKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

///
/// EntryRef
///
/// Non-owning handle to the change tracker's record for one row.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct EntryRef(pub usize);

///
/// ParameterNameGenerator
///
/// Hands out `p0`, `p1`, ... for one save operation.
///

#[derive(Clone, Debug, Default)]
pub struct ParameterNameGenerator {
    next: usize,
}

impl ParameterNameGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    pub fn generate(&mut self) -> String {
        let name = format!("p{}", self.next);
        self.next += 1;

        name
    }

    pub const fn reset(&mut self) {
        self.next = 0;
    }
}

///
/// EntryWriteBack
///
/// Receives store-generated values for the tracked entry a command came from.
///

pub trait EntryWriteBack {
    fn write_back(&mut self, entry: EntryRef, column: &str, value: &Value);
}

///
/// NoWriteBack
///
/// Write-back target for callers that read generated values off the
/// returned commands instead.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoWriteBack;

impl EntryWriteBack for NoWriteBack {
    fn write_back(&mut self, _: EntryRef, _: &str, _: &Value) {}
}
