use crate::error::DstError;
use crate::table::Table;
use crate::table::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmendError {
    #[error("Column '{0}' is locked and cannot be edited")]
    LockedColumnError(String),

    #[error("Column '{0}' does not exist")]
    UnknownColumnError(String),

    #[error("Row {row} does not exist, the table has {rows} rows")]
    RowOutOfRangeError { row: usize, rows: usize },
}

/// Split of a table's columns into editable and locked ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnPartition {
    /// Allow-listed columns present in the table, in allow-list order
    editable: Vec<String>,
    /// Every other column, in table order
    locked: Vec<String>,
    /// The allow-list the partition was built from
    expected: Vec<String>,
}

impl ColumnPartition {
    pub fn new<S: AsRef<str>>(table: &Table, allow_list: &[S]) -> ColumnPartition {
        let editable: Vec<String> = allow_list
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| table.column_index(name).is_some())
            .map(str::to_owned)
            .collect();
        let locked = table
            .column_names()
            .filter(|name| !editable.iter().any(|editable| editable == *name))
            .map(str::to_owned)
            .collect();
        ColumnPartition {
            editable,
            locked,
            expected: allow_list.iter().map(|name| name.as_ref().to_owned()).collect(),
        }
    }

    pub fn editable(&self) -> &[String] {
        &self.editable
    }

    pub fn locked(&self) -> &[String] {
        &self.locked
    }

    pub fn is_editable(&self, column: &str) -> bool {
        self.editable.iter().any(|name| name == column)
    }

    /// Warning shown when the table has none of the allow-listed columns.
    pub fn missing_columns_warning(&self) -> Option<String> {
        if !self.editable.is_empty() {
            return None;
        }
        Some(format!(
            "None of the expected editable columns were found in the DST file. Expected one of: {}",
            self.expected.join(", ")
        ))
    }
}

/// A working copy of the decoded table that only accepts edits to allow-listed columns.
#[derive(Clone, Debug)]
pub struct Amendment {
    table: Table,
    partition: ColumnPartition,
    edits: usize,
}

impl Amendment {
    pub fn new<S: AsRef<str>>(original: &Table, allow_list: &[S]) -> Amendment {
        let partition = ColumnPartition::new(original, allow_list);
        if let Some(message) = partition.missing_columns_warning() {
            warn!(columns = original.column_count(), "{}", message);
        }
        Amendment {
            table: original.clone(),
            partition,
            edits: 0,
        }
    }

    pub fn partition(&self) -> &ColumnPartition {
        &self.partition
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Number of cells changed so far.
    pub fn edit_count(&self) -> usize {
        self.edits
    }

    /// Applies one typed value to a cell.
    ///
    /// Returns `Ok(true)` if the cell changed. Input equal to the cell's
    /// displayed text leaves the cell untouched, so resubmitting the grid
    /// does not rewrite values.
    pub fn edit(&mut self, row: usize, column: &str, input: &str) -> Result<bool, DstError> {
        let col = self.table
            .column_index(column)
            .ok_or_else(|| AmendError::UnknownColumnError(column.to_owned()))?;
        if !self.partition.is_editable(column) {
            warn!(column, row, "edit to locked column rejected");
            Err(AmendError::LockedColumnError(column.to_owned()))?
        }
        let current = self.table
            .cell(row, col)
            .ok_or(AmendError::RowOutOfRangeError { row, rows: self.table.row_count() })?;

        if same_text(input, &current.to_string()) {
            return Ok(false);
        }
        let value = Value::from_input(input, current);
        if &value == current {
            return Ok(false);
        }
        self.table.set(row, col, value)?;
        self.edits += 1;
        Ok(true)
    }

    /// Copy of the table with all edits applied.
    pub fn snapshot(&self) -> Table {
        self.table.clone()
    }
}

/// Compares displayed text, ignoring surrounding whitespace and CRLF versus LF.
fn same_text(input: &str, displayed: &str) -> bool {
    input.replace("\r\n", "\n").trim() == displayed.replace("\r\n", "\n").trim()
}
