use crate::{
    error::InternalError,
    modification::ParameterNameGenerator,
    storage::TypeMapping,
    value::Value,
};

///
/// ColumnFlags
///
/// key       : part of the row's primary key
/// condition : used in the WHERE clause
/// read      : store-generated, read back after execution
/// write     : value sent to the store
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[expect(clippy::struct_excessive_bools)]
pub struct ColumnFlags {
    pub key: bool,
    pub condition: bool,
    pub read: bool,
    pub write: bool,
}

impl ColumnFlags {
    /// Plain written column.
    pub const WRITE: Self = Self {
        key: false,
        condition: false,
        read: false,
        write: true,
    };

    /// Store-generated column, read back after the statement runs.
    pub const READ: Self = Self {
        key: false,
        condition: false,
        read: true,
        write: false,
    };

    /// Key column identifying the row in a WHERE clause.
    pub const KEY: Self = Self {
        key: true,
        condition: true,
        read: false,
        write: false,
    };

    /// Client-assigned key written on insert.
    pub const KEY_WRITE: Self = Self {
        key: true,
        condition: false,
        read: false,
        write: true,
    };

    /// Store-generated key (identity), read back on insert.
    pub const KEY_READ: Self = Self {
        key: true,
        condition: false,
        read: true,
        write: false,
    };

    /// Optimistic-concurrency token compared against its original value.
    pub const CONCURRENCY: Self = Self {
        key: false,
        condition: true,
        read: false,
        write: false,
    };

    #[must_use]
    pub const fn with_write(mut self) -> Self {
        self.write = true;
        self
    }

    #[must_use]
    pub const fn with_read(mut self) -> Self {
        self.read = true;
        self
    }
}

///
/// ColumnSpec
///
/// Input for one column of a row change, as produced by the change tracker.
///

#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub name: String,
    pub type_mapping: TypeMapping,
    pub flags: ColumnFlags,
    pub original_value: Value,
    pub value: Value,
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, type_mapping: TypeMapping, flags: ColumnFlags) -> Self {
        Self {
            name: name.into(),
            type_mapping,
            flags,
            original_value: Value::Null,
            value: Value::Null,
            nullable: true,
        }
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn original_value(mut self, value: impl Into<Value>) -> Self {
        self.original_value = value.into();
        self
    }

    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

///
/// ColumnModification
///
/// One column's change within a row command. Parameter names are assigned
/// at construction and are stable for the life of the command.
///

#[derive(Clone, Debug)]
pub struct ColumnModification {
    name: String,
    type_mapping: TypeMapping,
    flags: ColumnFlags,
    original_value: Value,
    value: Value,
    nullable: bool,
    parameter_name: Option<String>,
    original_parameter_name: Option<String>,
}

impl ColumnModification {
    /// Validate a column spec and assign its parameter names.
    pub fn new(
        spec: ColumnSpec,
        names: &mut ParameterNameGenerator,
    ) -> Result<Self, InternalError> {
        let ColumnSpec {
            name,
            type_mapping,
            flags,
            original_value,
            value,
            nullable,
        } = spec;

        if !flags.read && !flags.write && !flags.condition {
            return Err(InternalError::command_unsupported(format!(
                "column '{name}' is neither read, written, nor used as a condition"
            )));
        }

        // The WHERE value of a key condition is the current value, which a
        // read column does not know until the statement has run.
        if flags.read && flags.key && flags.condition {
            return Err(InternalError::command_unsupported(format!(
                "column '{name}' is store-generated and cannot be a key condition"
            )));
        }

        let parameter_name =
            (flags.write || (flags.key && flags.condition)).then(|| names.generate());
        let original_parameter_name = (flags.condition && !flags.key).then(|| names.generate());

        Ok(Self {
            name,
            type_mapping,
            flags,
            original_value,
            value,
            nullable,
            parameter_name,
            original_parameter_name,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn type_mapping(&self) -> &TypeMapping {
        &self.type_mapping
    }

    #[must_use]
    pub const fn flags(&self) -> ColumnFlags {
        self.flags
    }

    #[must_use]
    pub const fn is_key(&self) -> bool {
        self.flags.key
    }

    #[must_use]
    pub const fn is_condition(&self) -> bool {
        self.flags.condition
    }

    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.flags.read
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        self.flags.write
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub const fn original_value(&self) -> &Value {
        &self.original_value
    }

    /// Logical name of the current-value parameter.
    #[must_use]
    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter_name.as_deref()
    }

    /// Logical name of the original-value parameter (concurrency WHERE).
    #[must_use]
    pub fn original_parameter_name(&self) -> Option<&str> {
        self.original_parameter_name.as_deref()
    }

    /// Number of parameters this column binds.
    #[must_use]
    pub const fn parameter_count(&self) -> usize {
        self.parameter_name.is_some() as usize + self.original_parameter_name.is_some() as usize
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}
