use crate::{error::InternalError, value::Value};
use async_trait::async_trait;
use std::collections::VecDeque;

///
/// DataReader
///
/// Forward-only cursor over the result sets of one executed command.
/// A fresh reader is positioned on the first result set, before its first
/// row.
///

pub trait DataReader {
    /// Advance to the next result set. Returns false when none remain.
    fn next_result(&mut self) -> Result<bool, InternalError>;

    /// Advance to the next row of the current result set.
    fn read(&mut self) -> Result<bool, InternalError>;

    /// Number of values in the current row.
    fn field_count(&self) -> usize;

    fn get_value(&mut self, ordinal: usize) -> Result<Value, InternalError>;
}

///
/// AsyncDataReader
///
/// Suspension-capable counterpart of [`DataReader`] with the same
/// positioning rules.
///

#[async_trait]
pub trait AsyncDataReader: Send {
    async fn next_result_async(&mut self) -> Result<bool, InternalError>;

    async fn read_async(&mut self) -> Result<bool, InternalError>;

    fn field_count(&self) -> usize;

    async fn get_value_async(&mut self, ordinal: usize) -> Result<Value, InternalError>;
}

///
/// BufferedReader
///
/// Fully materialized result sets, for drivers that buffer a whole
/// response before handing it over.
///

#[derive(Clone, Debug, Default)]
pub struct BufferedReader {
    current: VecDeque<Vec<Value>>,
    remaining: VecDeque<VecDeque<Vec<Value>>>,
    row: Option<Vec<Value>>,
}

impl BufferedReader {
    #[must_use]
    pub fn new(result_sets: Vec<Vec<Vec<Value>>>) -> Self {
        let mut remaining: VecDeque<VecDeque<Vec<Value>>> =
            result_sets.into_iter().map(VecDeque::from).collect();
        let current = remaining.pop_front().unwrap_or_default();

        Self {
            current,
            remaining,
            row: None,
        }
    }

    fn advance_result(&mut self) -> bool {
        self.row = None;
        match self.remaining.pop_front() {
            Some(next) => {
                self.current = next;
                true
            }
            None => {
                self.current.clear();
                false
            }
        }
    }

    fn advance_row(&mut self) -> bool {
        self.row = self.current.pop_front();
        self.row.is_some()
    }

    fn value_at(&self, ordinal: usize) -> Result<Value, InternalError> {
        let row = self
            .row
            .as_ref()
            .ok_or_else(|| InternalError::reader_internal("no current row"))?;

        row.get(ordinal).cloned().ok_or_else(|| {
            InternalError::reader_internal(format!(
                "ordinal {ordinal} out of range for row of {} value(s)",
                row.len()
            ))
        })
    }
}

impl DataReader for BufferedReader {
    fn next_result(&mut self) -> Result<bool, InternalError> {
        Ok(self.advance_result())
    }

    fn read(&mut self) -> Result<bool, InternalError> {
        Ok(self.advance_row())
    }

    fn field_count(&self) -> usize {
        self.row.as_ref().map_or(0, Vec::len)
    }

    fn get_value(&mut self, ordinal: usize) -> Result<Value, InternalError> {
        self.value_at(ordinal)
    }
}

#[async_trait]
impl AsyncDataReader for BufferedReader {
    async fn next_result_async(&mut self) -> Result<bool, InternalError> {
        Ok(self.advance_result())
    }

    async fn read_async(&mut self) -> Result<bool, InternalError> {
        Ok(self.advance_row())
    }

    fn field_count(&self) -> usize {
        self.row.as_ref().map_or(0, Vec::len)
    }

    async fn get_value_async(&mut self, ordinal: usize) -> Result<Value, InternalError> {
        self.value_at(ordinal)
    }
}
