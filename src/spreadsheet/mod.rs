//! # Spreadsheet Codec
//!
//! Reads the first worksheet of an `.xlsx` package into a [`Table`] and writes
//! a table back out as a single-sheet `.xlsx` package. Only cell values travel
//! through the codec; formulas and formatting of the source workbook are not
//! preserved.
use crate::error::DstError;
use crate::error::ResultMessage;
use crate::table::Table;
use std::io::Cursor;
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod writer;
pub(crate) mod xlsx;

pub use writer::encode;

/// MIME type of `.xlsx` files
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Errors raised while decoding a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in workbook package")]
    FileError(String),

    #[error("'{0}' is an encrypted workbook or a legacy .xls file; save it as .xlsx without a password")]
    CompoundFileError(String),

    #[error("'{0}' is empty")]
    EmptyFileError(String),

    #[error("'{0}' contains no worksheet")]
    SpreadsheetEmptyError(String),

    #[error("Invalid cell value in '{0}' sheet '{1}' at {2}: {3}")]
    CellValueError(String, String, String, String),

    #[error("Invalid cell reference '{1}' in '{0}'")]
    CellReferenceError(String, String),

    #[error("'{0}' spans {1} cells, more than the {2} supported")]
    TableTooLargeError(String, usize, usize),
}

/// Decodes the first worksheet of an `.xlsx` file.
///
/// # Arguments
/// * `name` - Name of the uploaded file, used in error messages
/// * `bytes` - The complete file content
///
/// # Errors
/// Fails when the bytes are not a readable `.xlsx` package or a cell value
/// cannot be interpreted.
pub fn decode(name: &str, bytes: &[u8]) -> Result<Table, DstError> {
    if bytes.is_empty() {
        Err(SpreadsheetError::EmptyFileError(name.to_owned()))?
    }
    if excel::is_compound_file(bytes) {
        Err(SpreadsheetError::CompoundFileError(name.to_owned()))?
    }

    let mut workbook = xlsx::XlsxWorkbook::open(name, Cursor::new(bytes))
        .with_prefix("Open workbook failed")?;
    let shared_strings = workbook.load_shared_strings()?;
    let sheet = workbook.read_first_sheet()?;
    tracing::debug!(
        file = name,
        sheet = workbook.first_sheet_name().unwrap_or_default(),
        cells = sheet.cells.len(),
        "worksheet read"
    );
    sheet.into_table(&shared_strings)
}
