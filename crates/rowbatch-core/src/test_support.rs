//! Test doubles shared by the in-crate test modules.

use crate::{
    error::InternalError,
    modification::{
        ChangeKind, ColumnFlags, ColumnModification, ColumnSpec, EntryRef, EntryWriteBack,
        ModificationCommand, ParameterNameGenerator,
    },
    sql::UpdateSqlGenerator,
    storage::{
        AsyncConnection, AsyncDataReader, BufferedReader, Connection, ConnectionSettings,
        DataReader, DbType, StoreCommand, StoreConnection, TypeMapping,
    },
    value::Value,
};
use async_trait::async_trait;
use std::{cell::Cell, collections::VecDeque, fmt::Write as _};
use tokio_util::sync::CancellationToken;

pub(crate) type ResultSets = Vec<Vec<Vec<Value>>>;

///
/// TestSqlGenerator
///
/// Deterministic dialect: one DML statement per command followed by the
/// result-set statement its shape requires.
///

#[derive(Debug, Default)]
pub(crate) struct TestSqlGenerator {
    pub(crate) footer: Option<&'static str>,
    pub(crate) fail_on_table: Option<&'static str>,
    pub(crate) footer_calls: Cell<usize>,
}

impl TestSqlGenerator {
    pub(crate) const fn with_footer(footer: &'static str) -> Self {
        Self {
            footer: Some(footer),
            fail_on_table: None,
            footer_calls: Cell::new(0),
        }
    }

    pub(crate) const fn failing_on(table: &'static str) -> Self {
        Self {
            footer: None,
            fail_on_table: Some(table),
            footer_calls: Cell::new(0),
        }
    }

    fn check(&self, command: &ModificationCommand) -> Result<(), InternalError> {
        match self.fail_on_table {
            Some(table) if table == command.table() => Err(InternalError::generator_unsupported(
                format!("cannot render table '{table}'"),
            )),
            _ => Ok(()),
        }
    }

    fn placeholder(&self, column: &ColumnModification) -> String {
        column
            .parameter_name()
            .map(|name| self.generate_parameter_name(name))
            .unwrap_or_default()
    }

    fn where_clause(&self, sql: &mut String, command: &ModificationCommand) {
        let conditions: Vec<String> = command
            .column_modifications()
            .iter()
            .filter(|column| column.is_condition())
            .map(|column| {
                let name = column
                    .original_parameter_name()
                    .or_else(|| column.parameter_name())
                    .map(|name| self.generate_parameter_name(name))
                    .unwrap_or_default();
                format!("{} = {name}", column.name())
            })
            .collect();

        let _ = write!(sql, " WHERE {}", conditions.join(" AND "));
    }

    fn result_statement(sql: &mut String, command: &ModificationCommand) {
        let reads: Vec<&str> = command.read_columns().map(ColumnModification::name).collect();

        if reads.is_empty() {
            sql.push_str("SELECT changes();\n");
        } else {
            let _ = writeln!(
                sql,
                "SELECT {} FROM {} WHERE changes() = 1;",
                reads.join(", "),
                command.table()
            );
        }
    }
}

impl UpdateSqlGenerator for TestSqlGenerator {
    fn append_batch_header(&self, sql: &mut String) {
        sql.push_str("-- batch\n");
    }

    fn append_batch_footer(&self, sql: &mut String) {
        self.footer_calls.set(self.footer_calls.get() + 1);
        if let Some(footer) = self.footer {
            sql.push_str(footer);
        }
    }

    fn append_insert_operation(
        &self,
        sql: &mut String,
        command: &ModificationCommand,
    ) -> Result<(), InternalError> {
        self.check(command)?;

        let writes: Vec<&ColumnModification> = command
            .column_modifications()
            .iter()
            .filter(|column| column.is_write())
            .collect();
        let names: Vec<&str> = writes.iter().map(|column| column.name()).collect();
        let values: Vec<String> = writes.iter().map(|column| self.placeholder(column)).collect();

        let _ = writeln!(
            sql,
            "INSERT INTO {} ({}) VALUES ({});",
            command.table(),
            names.join(", "),
            values.join(", ")
        );
        Self::result_statement(sql, command);

        Ok(())
    }

    fn append_update_operation(
        &self,
        sql: &mut String,
        command: &ModificationCommand,
    ) -> Result<(), InternalError> {
        self.check(command)?;

        let sets: Vec<String> = command
            .column_modifications()
            .iter()
            .filter(|column| column.is_write())
            .map(|column| format!("{} = {}", column.name(), self.placeholder(column)))
            .collect();

        let _ = write!(sql, "UPDATE {} SET {}", command.table(), sets.join(", "));
        self.where_clause(sql, command);
        sql.push_str(";\n");
        Self::result_statement(sql, command);

        Ok(())
    }

    fn append_delete_operation(
        &self,
        sql: &mut String,
        command: &ModificationCommand,
    ) -> Result<(), InternalError> {
        self.check(command)?;

        let _ = write!(sql, "DELETE FROM {}", command.table());
        self.where_clause(sql, command);
        sql.push_str(";\n");
        Self::result_statement(sql, command);

        Ok(())
    }
}

///
/// FakeConnection
///
/// Scripted connection. Each execute pops the next scripted response and
/// records the command it was given.
///

#[derive(Debug, Default)]
pub(crate) struct FakeConnection {
    pub(crate) settings: ConnectionSettings,
    pub(crate) responses: VecDeque<ResultSets>,
    pub(crate) fail_open: bool,
    pub(crate) fail_execute: Option<&'static str>,
    pub(crate) opens: usize,
    pub(crate) closes: usize,
    pub(crate) is_open: bool,
    pub(crate) executed: Vec<StoreCommand>,

    /// Async readers cancel this token, then stall, once they have served
    /// this many `read_async` calls.
    pub(crate) cancel_after_reads: Option<(usize, CancellationToken)>,
}

impl FakeConnection {
    pub(crate) fn scripted(responses: Vec<ResultSets>) -> Self {
        Self {
            responses: responses.into(),
            ..Self::default()
        }
    }

    pub(crate) fn failing(message: &'static str) -> Self {
        Self {
            fail_execute: Some(message),
            ..Self::default()
        }
    }

    fn do_open(&mut self) -> Result<(), InternalError> {
        self.opens += 1;
        if self.fail_open {
            return Err(InternalError::connection_internal("connection refused"));
        }
        self.is_open = true;

        Ok(())
    }

    fn do_execute(&mut self, command: &StoreCommand) -> Result<ResultSets, InternalError> {
        assert!(self.is_open, "command executed on a closed connection");
        self.executed.push(command.clone());

        if let Some(message) = self.fail_execute {
            return Err(InternalError::store_internal(message));
        }

        Ok(self.responses.pop_front().unwrap_or_default())
    }
}

impl StoreConnection for FakeConnection {
    fn settings(&self) -> ConnectionSettings {
        self.settings
    }

    fn close(&mut self) {
        self.closes += 1;
        self.is_open = false;
    }
}

impl Connection for FakeConnection {
    type Reader = BufferedReader;

    fn open(&mut self) -> Result<(), InternalError> {
        self.do_open()
    }

    fn execute_reader(&mut self, command: &StoreCommand) -> Result<Self::Reader, InternalError> {
        self.do_execute(command).map(BufferedReader::new)
    }

    fn execute_non_query(&mut self, command: &StoreCommand) -> Result<u64, InternalError> {
        let mut reader = BufferedReader::new(self.do_execute(command)?);
        first_value(&mut reader).map(|value| value.as_row_count().unwrap_or(0))
    }

    fn execute_scalar(&mut self, command: &StoreCommand) -> Result<Value, InternalError> {
        let mut reader = BufferedReader::new(self.do_execute(command)?);
        first_value(&mut reader)
    }
}

fn first_value(reader: &mut BufferedReader) -> Result<Value, InternalError> {
    if reader.read()? {
        reader.get_value(0)
    } else {
        Ok(Value::Null)
    }
}

#[async_trait]
impl AsyncConnection for FakeConnection {
    type Reader = FakeAsyncReader;

    async fn open_async(&mut self) -> Result<(), InternalError> {
        self.do_open()
    }

    async fn execute_reader_async(
        &mut self,
        command: &StoreCommand,
    ) -> Result<Self::Reader, InternalError> {
        let sets = self.do_execute(command)?;

        Ok(FakeAsyncReader {
            inner: BufferedReader::new(sets),
            reads: 0,
            cancel_after_reads: self.cancel_after_reads.clone(),
        })
    }

    async fn execute_non_query_async(
        &mut self,
        command: &StoreCommand,
    ) -> Result<u64, InternalError> {
        Connection::execute_non_query(self, command)
    }

    async fn execute_scalar_async(
        &mut self,
        command: &StoreCommand,
    ) -> Result<Value, InternalError> {
        Connection::execute_scalar(self, command)
    }
}

///
/// FakeAsyncReader
///

pub(crate) struct FakeAsyncReader {
    inner: BufferedReader,
    reads: usize,
    cancel_after_reads: Option<(usize, CancellationToken)>,
}

#[async_trait]
impl AsyncDataReader for FakeAsyncReader {
    async fn next_result_async(&mut self) -> Result<bool, InternalError> {
        self.inner.next_result_async().await
    }

    async fn read_async(&mut self) -> Result<bool, InternalError> {
        if let Some((after, token)) = &self.cancel_after_reads
            && self.reads == *after
        {
            token.cancel();
            std::future::pending::<()>().await;
        }
        self.reads += 1;

        self.inner.read_async().await
    }

    fn field_count(&self) -> usize {
        AsyncDataReader::field_count(&self.inner)
    }

    async fn get_value_async(&mut self, ordinal: usize) -> Result<Value, InternalError> {
        self.inner.get_value_async(ordinal).await
    }
}

///
/// RecordingWriteBack
///

#[derive(Debug, Default)]
pub(crate) struct RecordingWriteBack {
    pub(crate) writes: Vec<(EntryRef, String, Value)>,
}

impl EntryWriteBack for RecordingWriteBack {
    fn write_back(&mut self, entry: EntryRef, column: &str, value: &Value) {
        self.writes.push((entry, column.to_string(), value.clone()));
    }
}

///
/// Command builders
///

pub(crate) fn int_mapping() -> TypeMapping {
    TypeMapping::new("INTEGER", DbType::Int64)
}

pub(crate) fn text_mapping() -> TypeMapping {
    TypeMapping::new("TEXT", DbType::String)
}

/// Insert with a store-generated identity key read back afterwards.
pub(crate) fn insert_identity(
    table: &str,
    entry: usize,
    name: &str,
    names: &mut ParameterNameGenerator,
) -> ModificationCommand {
    ModificationCommand::new(table, None, ChangeKind::Insert, EntryRef(entry))
        .with_column(ColumnSpec::new("id", int_mapping(), ColumnFlags::KEY_READ), names)
        .and_then(|command| {
            command.with_column(
                ColumnSpec::new("name", text_mapping(), ColumnFlags::WRITE).value(name),
                names,
            )
        })
        .expect("identity insert is valid")
}

/// Insert with a client-assigned key; reports an affected count.
pub(crate) fn insert_keyed(
    table: &str,
    entry: usize,
    id: i64,
    names: &mut ParameterNameGenerator,
) -> ModificationCommand {
    ModificationCommand::new(table, None, ChangeKind::Insert, EntryRef(entry))
        .with_column(
            ColumnSpec::new("id", int_mapping(), ColumnFlags::KEY_WRITE).value(id),
            names,
        )
        .expect("keyed insert is valid")
}

/// Update guarded by a concurrency token.
pub(crate) fn update_versioned(
    table: &str,
    entry: usize,
    id: i64,
    version: i64,
    names: &mut ParameterNameGenerator,
) -> ModificationCommand {
    ModificationCommand::new(table, None, ChangeKind::Update, EntryRef(entry))
        .with_column(
            ColumnSpec::new("id", int_mapping(), ColumnFlags::KEY).value(id),
            names,
        )
        .and_then(|command| {
            command.with_column(
                ColumnSpec::new("name", text_mapping(), ColumnFlags::WRITE).value("renamed"),
                names,
            )
        })
        .and_then(|command| {
            command.with_column(
                ColumnSpec::new("version", int_mapping(), ColumnFlags::CONCURRENCY)
                    .original_value(version),
                names,
            )
        })
        .expect("versioned update is valid")
}

pub(crate) fn delete_keyed(
    table: &str,
    entry: usize,
    id: i64,
    names: &mut ParameterNameGenerator,
) -> ModificationCommand {
    ModificationCommand::new(table, None, ChangeKind::Delete, EntryRef(entry))
        .with_column(
            ColumnSpec::new("id", int_mapping(), ColumnFlags::KEY).value(id),
            names,
        )
        .expect("keyed delete is valid")
}

/// A single affected-count result set.
pub(crate) fn affected(count: i64) -> Vec<Vec<Value>> {
    vec![vec![Value::Int(count)]]
}

/// A single generated-values result set with one row.
pub(crate) fn generated(values: Vec<Value>) -> Vec<Vec<Value>> {
    vec![values]
}
