use crate::error::DstError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Table;
use crate::table::Value;
use std::collections::HashMap;
use std::collections::HashSet;

/// Upper bound on header plus data cells of a decoded table
pub(crate) const MAX_TABLE_CELLS: usize = 2_000_000;

/// Cells collected from one worksheet, with the bounds of the populated area.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells in document order
    pub(crate) cells: Vec<Cell>,
    /// Populated area (0-based, inclusive)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(super) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell to the sheet, widening the populated area.
    pub(super) fn push(&mut self, cell: Cell) {
        self.row_lower_bound = Some(self.row_lower_bound.map_or(cell.row, |row| row.min(cell.row)));
        self.row_upper_bound = Some(self.row_upper_bound.map_or(cell.row, |row| row.max(cell.row)));
        self.col_upper_bound = Some(self.col_upper_bound.map_or(cell.col, |col| col.max(cell.col)));
        self.cells.push(cell);
    }

    /// Builds a table from the collected cells.
    ///
    /// The first populated row is the header. Columns start at `A` and run to
    /// the widest populated column; data rows run to the last populated row.
    pub(super) fn into_table(self, shared_strings: &[String]) -> Result<Table, DstError> {
        let (header_row, last_row, last_col) = match (self.row_lower_bound, self.row_upper_bound, self.col_upper_bound) {
            (Some(header_row), Some(last_row), Some(last_col)) => (header_row, last_row, last_col),
            _ => return Ok(Table::default()),
        };
        let width = last_col + 1;
        let cells = width.saturating_mul(last_row - header_row + 1);
        if cells > MAX_TABLE_CELLS {
            Err(SpreadsheetError::TableTooLargeError(self.file_name.to_owned(), cells, MAX_TABLE_CELLS))?
        }
        let mut header = vec![Value::Empty; width];
        let mut rows = vec![vec![Value::Empty; width]; last_row - header_row];
        for cell in &self.cells {
            let value = cell.to_value(shared_strings).map_err(|message| {
                SpreadsheetError::CellValueError(
                    self.file_name.to_owned(),
                    self.name.to_owned(),
                    cell.reference(),
                    message,
                )
            })?;
            if cell.row == header_row {
                header[cell.col] = value;
            } else {
                rows[cell.row - header_row - 1][cell.col] = value;
            }
        }
        Ok(Table::from_rows(header_names(header), rows)?)
    }
}

/// Turns header cells into unique column names.
///
/// Blank headers become `Unnamed: {index}`; repeated names get `.1`, `.2`, ...
fn header_names(header: Vec<Value>) -> Vec<String> {
    let mut seen = HashSet::<String>::with_capacity(header.len());
    let mut counters = HashMap::<String, usize>::new();
    let mut names = Vec::with_capacity(header.len());
    for (index, value) in header.into_iter().enumerate() {
        let base = match value {
            Value::Empty => format!("Unnamed: {}", index),
            value => value.to_string(),
        };
        let mut name = base.to_owned();
        while seen.contains(&name) {
            let counter = counters.entry(base.to_owned()).or_insert(0);
            *counter += 1;
            name = format!("{}.{}", base, counter);
        }
        seen.insert(name.to_owned());
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("", "");

        assert!(sheet.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert_eq!(sheet.row_upper_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
        assert_eq!(sheet.into_table(&[]).unwrap(), Table::default());
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("", "");
        push(&mut sheet, 1, 1, "NAME");
        push(&mut sheet, 1, 3, "PIC");
        push(&mut sheet, 3, 1, "Alice");
        push(&mut sheet, 4, 3, "Bob");

        assert_eq!(sheet.row_lower_bound, Some(1));
        assert_eq!(sheet.row_upper_bound, Some(4));
        assert_eq!(sheet.col_upper_bound, Some(3));

        let table = sheet.into_table(&[]).unwrap();
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["Unnamed: 0", "NAME", "Unnamed: 2", "PIC"]
        );
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.cell(0, 1), Some(&Value::Empty));
        assert_eq!(table.cell(1, 1), Some(&Value::from("Alice")));
        assert_eq!(table.cell(2, 3), Some(&Value::from("Bob")));
    }

    #[test]
    fn duplicate_headers_are_renamed() {
        let names = header_names(vec![
            Value::from("PIC"),
            Value::from("PIC"),
            Value::from("PIC.1"),
            Value::from("PIC"),
            Value::Number(7.0),
        ]);
        assert_eq!(names, vec!["PIC", "PIC.1", "PIC.1.1", "PIC.2", "7"]);
    }

    #[test]
    fn invalid_cell_reports_reference() {
        let mut sheet = Sheet::new("dst.xlsx", "Sheet1");
        push(&mut sheet, 0, 0, "NAME");
        sheet.push(Cell {
            row: 1,
            col: 0,
            kind: CellType::Number,
            value: "abc".to_owned(),
        });
        let error = sheet.into_table(&[]).unwrap_err().to_string();
        assert!(error.contains("A2"), "{}", error);
    }

    #[test]
    fn sparse_sheet_over_the_cell_limit_is_rejected() {
        let mut sheet = Sheet::new("dst.xlsx", "Sheet1");
        push(&mut sheet, 0, 0, "PIC");
        push(&mut sheet, 1_048_575, 16_383, "far");
        assert!(matches!(
            sheet.into_table(&[]),
            Err(DstError::SpreadsheetError(SpreadsheetError::TableTooLargeError(_, cells, MAX_TABLE_CELLS)))
                if cells == 16_384 * 1_048_576
        ));
    }
}
