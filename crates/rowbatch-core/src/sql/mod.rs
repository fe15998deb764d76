//! Statement-text generation seam.
//!
//! Dialects implement [`UpdateSqlGenerator`]. The batch builder calls
//! `append_batch_header` and `append_batch_footer` exactly once per batch,
//! and one `append_*_operation` per accepted command in order. Operations
//! append to a fresh buffer, so they must not inspect earlier text.
//!
//! Every operation must emit exactly one result set for its command:
//! - commands with read columns: at most one row holding the generated
//!   values, in declared column order (no row means the row was not
//!   affected);
//! - all other commands: one row holding the affected-row count.
//!
//! Placeholders are embedded per column in declared order, current-value
//! parameter before original-value parameter, using
//! [`UpdateSqlGenerator::generate_parameter_name`].

use crate::{error::InternalError, modification::ModificationCommand};

///
/// UpdateSqlGenerator
///

pub trait UpdateSqlGenerator {
    fn append_batch_header(&self, sql: &mut String);

    /// Closing text for a batch. Called once; the builder keeps it at the
    /// end of the text as more commands are rendered.
    fn append_batch_footer(&self, _sql: &mut String) {}

    fn append_insert_operation(
        &self,
        sql: &mut String,
        command: &ModificationCommand,
    ) -> Result<(), InternalError>;

    fn append_update_operation(
        &self,
        sql: &mut String,
        command: &ModificationCommand,
    ) -> Result<(), InternalError>;

    fn append_delete_operation(
        &self,
        sql: &mut String,
        command: &ModificationCommand,
    ) -> Result<(), InternalError>;

    /// Turn a logical parameter name (`p0`) into the dialect placeholder.
    fn generate_parameter_name(&self, name: &str) -> String {
        format!("@{name}")
    }
}
