use thiserror::Error;

/// Main error type for the DST amendment service.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum DstError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet and table errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    TableError(#[from] crate::table::TableError),

    // Workflow errors
    #[error("{0}")]
    AmendError(#[from] crate::workflow::amendment::AmendError),

    #[error("{0}")]
    ValidationError(#[from] crate::workflow::export::ValidationError),

    #[error("{0}")]
    WorkflowError(#[from] crate::workflow::WorkflowError),

    #[error("{0}")]
    StorageError(#[from] crate::storage::StorageError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, DstError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| DstError::WithContextError(format!("{}: {}", message, e)))
    }
}
