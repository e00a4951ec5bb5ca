//! # Table Model
//!
//! An ordered set of uniquely named columns of equal length. Tables are built
//! once by the decoder and copied before any edit is applied.
mod value;

pub use value::Value;
pub use value::DATE_FORMAT;
pub use value::DATE_TIME_FORMAT;
pub use value::TIME_FORMAT;

use std::collections::HashSet;
use thiserror::Error;

/// Errors raised when building or updating a table.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Duplicate column name '{0}'")]
    DuplicateColumnError(String),

    #[error("Column '{name}' has {actual} values, expected {expected}")]
    ColumnLengthError {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cell ({row}, {col}) is outside the table")]
    CellOutOfRangeError { row: usize, col: usize },
}

/// A named column of values.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Column {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// A decoded worksheet: columns in sheet order, rows below the header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table, rejecting duplicate names and ragged columns.
    pub fn new(columns: Vec<Column>) -> Result<Table, TableError> {
        let rows = columns.first().map(|column| column.values.len()).unwrap_or(0);
        let mut names = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumnError(column.name.to_owned()));
            }
            if column.values.len() != rows {
                return Err(TableError::ColumnLengthError {
                    name: column.name.to_owned(),
                    expected: rows,
                    actual: column.values.len(),
                });
            }
        }
        Ok(Table { columns, rows })
    }

    /// Builds a table from a header and row-major values. Short rows are
    /// padded with empty cells.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Table, TableError> {
        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            let mut row = row.into_iter();
            for column in columns.iter_mut() {
                column.values.push(row.next().unwrap_or_default());
            }
        }
        Table::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Value> {
        self.columns.get(col).and_then(|column| column.values.get(row))
    }

    /// Iterates the values of one row in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = &Value> {
        self.columns.iter().filter_map(move |column| column.values.get(row))
    }

    /// Replaces a single cell.
    pub(crate) fn set(&mut self, row: usize, col: usize, value: Value) -> Result<(), TableError> {
        let cell = self.columns
            .get_mut(col)
            .and_then(|column| column.values.get_mut(row))
            .ok_or(TableError::CellOutOfRangeError { row, col })?;
        *cell = value;
        Ok(())
    }

    /// Returns a copy holding at most the first `limit` rows.
    pub fn head(&self, limit: usize) -> Table {
        let rows = self.rows.min(limit);
        let columns = self.columns
            .iter()
            .map(|column| Column::new(column.name.to_owned(), column.values[..rows].to_vec()))
            .collect();
        Table { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["NAME".to_owned(), "PIC".to_owned()],
            vec![
                vec!["Alice".into(), "Bob".into()],
                vec!["Carol".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let table = sample();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.cell(1, 1), Some(&Value::Empty));
        assert_eq!(table.row(0).cloned().collect::<Vec<_>>(), vec![Value::from("Alice"), Value::from("Bob")]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = Table::new(vec![Column::new("A", vec![]), Column::new("A", vec![])]);
        assert!(matches!(result, Err(TableError::DuplicateColumnError(name)) if name == "A"));
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let result = Table::new(vec![Column::new("A", vec![Value::Empty]), Column::new("B", vec![])]);
        assert!(matches!(result, Err(TableError::ColumnLengthError { expected: 1, actual: 0, .. })));
    }

    #[test]
    fn set_and_lookup() {
        let mut table = sample();
        table.set(1, 1, "Dave".into()).unwrap();
        assert_eq!(table.column("PIC").unwrap().values()[1], Value::from("Dave"));
        assert_eq!(table.column_index("PIC"), Some(1));
        assert!(table.set(5, 0, Value::Empty).is_err());
    }

    #[test]
    fn head_truncates_rows() {
        let table = sample();
        assert_eq!(table.head(1).row_count(), 1);
        assert_eq!(table.head(10), table);
    }
}
