use crate::{
    error::{CommandRef, InternalError},
    modification::{
        ChangeKind, ColumnModification, ColumnSpec, EntryRef, EntryWriteBack,
        ParameterNameGenerator,
    },
    value::Value,
};

///
/// ModificationCommand
///
/// One row's insert, update or delete. Column order is significant: it is
/// the order placeholders appear in the statement text and the order
/// generated values come back in the result row.
///

#[derive(Clone, Debug)]
pub struct ModificationCommand {
    table: String,
    schema: Option<String>,
    kind: ChangeKind,
    entry: EntryRef,
    columns: Vec<ColumnModification>,
}

impl ModificationCommand {
    pub fn new(
        table: impl Into<String>,
        schema: Option<String>,
        kind: ChangeKind,
        entry: EntryRef,
    ) -> Self {
        Self {
            table: table.into(),
            schema,
            kind,
            entry,
            columns: Vec::new(),
        }
    }

    /// Append one column, assigning its parameter names.
    pub fn add_column(
        &mut self,
        spec: ColumnSpec,
        names: &mut ParameterNameGenerator,
    ) -> Result<(), InternalError> {
        if self.columns.iter().any(|column| column.name() == spec.name) {
            return Err(InternalError::command_unsupported(format!(
                "column '{}' appears twice in command for table '{}'",
                spec.name, self.table
            )));
        }

        let column = ColumnModification::new(spec, names)?;
        self.columns.push(column);

        Ok(())
    }

    /// Consuming variant of [`Self::add_column`] for building commands inline.
    pub fn with_column(
        mut self,
        spec: ColumnSpec,
        names: &mut ParameterNameGenerator,
    ) -> Result<Self, InternalError> {
        self.add_column(spec, names)?;

        Ok(self)
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[must_use]
    pub const fn entry(&self) -> EntryRef {
        self.entry
    }

    #[must_use]
    pub fn column_modifications(&self) -> &[ColumnModification] {
        &self.columns
    }

    /// Columns whose values the store generates, in declared order.
    pub fn read_columns(&self) -> impl Iterator<Item = &ColumnModification> {
        self.columns.iter().filter(|column| column.is_read())
    }

    #[must_use]
    pub fn read_column_count(&self) -> usize {
        self.read_columns().count()
    }

    /// True when the store returns a row of generated values for this command.
    #[must_use]
    pub fn requires_result_propagation(&self) -> bool {
        self.columns.iter().any(ColumnModification::is_read)
    }

    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.columns
            .iter()
            .map(ColumnModification::parameter_count)
            .sum()
    }

    pub(crate) fn command_ref(&self, index: usize) -> CommandRef {
        CommandRef {
            index,
            table: self.table.clone(),
            entry: self.entry,
        }
    }

    /// Check that the column set can be rendered for this change kind.
    pub fn validate(&self) -> Result<(), InternalError> {
        let has = |pred: fn(&ColumnModification) -> bool| self.columns.iter().any(pred);

        match self.kind {
            ChangeKind::Insert => {
                if has(ColumnModification::is_condition) {
                    return Err(self.unsupported("insert commands cannot carry conditions"));
                }
                if self.columns.is_empty() {
                    return Err(self.unsupported("insert commands need at least one column"));
                }
            }
            ChangeKind::Update => {
                if !has(ColumnModification::is_condition) {
                    return Err(self.unsupported("update commands need a key or condition"));
                }
                if !has(ColumnModification::is_write) {
                    return Err(self.unsupported("update commands need a written column"));
                }
            }
            ChangeKind::Delete => {
                if !has(ColumnModification::is_condition) {
                    return Err(self.unsupported("delete commands need a key or condition"));
                }
                if has(ColumnModification::is_write) || has(ColumnModification::is_read) {
                    return Err(self.unsupported("delete commands cannot write or read columns"));
                }
            }
        }

        Ok(())
    }

    fn unsupported(&self, message: &str) -> InternalError {
        InternalError::command_unsupported(format!("{message} (table '{}')", self.table))
    }

    /// Assign one result row of generated values onto the read columns.
    ///
    /// All-or-nothing: the value count is checked before any column changes.
    pub(crate) fn apply_generated_values(
        &mut self,
        index: usize,
        values: Vec<Value>,
        write_back: &mut dyn EntryWriteBack,
    ) -> Result<(), InternalError> {
        let expected = self.read_column_count();
        if values.len() != expected {
            return Err(InternalError::protocol_violation(
                index,
                format!(
                    "expected {expected} generated value(s), received {}",
                    values.len()
                ),
            ));
        }

        let entry = self.entry;
        let read_columns = self.columns.iter_mut().filter(|column| column.is_read());
        for (column, value) in read_columns.zip(values) {
            write_back.write_back(entry, column.name(), &value);
            column.set_value(value);
        }

        Ok(())
    }
}
