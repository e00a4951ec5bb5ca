use chrono::NaiveDate;
use thiserror::Error;

/// Branch codes offered in the export form, in display order
pub const BRANCH_OPTIONS: [&str; 6] = ["WG", "KV", "RP", "NMC", "SMC", OTHER_BRANCH];

/// The option that asks for a free-text branch code
pub const OTHER_BRANCH: &str = "Other";

/// Date layout used in generated file names
const FILENAME_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your name before generating the amended DST.")]
    MissingEditorNameError,

    #[error("Please select or enter a branch code.")]
    MissingBranchError,

    #[error("Unknown branch option '{0}'")]
    UnknownBranchError(String),
}

/// Inputs of the export form, as entered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    pub editor_name: String,
    pub date: NaiveDate,
    /// Selected option from [`BRANCH_OPTIONS`], empty when nothing is selected
    pub branch: String,
    /// Free-text branch code, only read when `branch` is [`OTHER_BRANCH`]
    pub custom_branch: String,
}

impl ExportRequest {
    pub fn new(date: NaiveDate) -> ExportRequest {
        ExportRequest {
            editor_name: String::new(),
            date,
            branch: String::new(),
            custom_branch: String::new(),
        }
    }

    /// Checks the guard rails, editor name first, then the branch.
    pub fn validate(&self) -> Result<ValidatedExport, ValidationError> {
        let editor_name = self.editor_name.trim();
        if editor_name.is_empty() {
            return Err(ValidationError::MissingEditorNameError);
        }

        let branch = match self.branch.trim() {
            "" => return Err(ValidationError::MissingBranchError),
            OTHER_BRANCH => match self.custom_branch.trim() {
                "" => return Err(ValidationError::MissingBranchError),
                custom => custom,
            },
            option if BRANCH_OPTIONS.contains(&option) => option,
            option => return Err(ValidationError::UnknownBranchError(option.to_owned())),
        };

        Ok(ValidatedExport {
            editor_name: editor_name.to_owned(),
            branch: branch.to_owned(),
            date: self.date,
        })
    }
}

/// An export request that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedExport {
    pub editor_name: String,
    pub branch: String,
    pub date: NaiveDate,
}

impl ValidatedExport {
    pub fn filename(&self) -> String {
        amended_filename(self.date, &self.branch, &self.editor_name)
    }
}

/// A generated workbook kept for download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Name of an amended DST: `{DD-MM-YYYY} {branch} DST amended by {editor}.xlsx`
pub fn amended_filename(date: NaiveDate, branch: &str, editor_name: &str) -> String {
    format!(
        "{} {} DST amended by {}.xlsx",
        date.format(FILENAME_DATE_FORMAT),
        path_safe(branch.trim()),
        path_safe(editor_name.trim()),
    )
}

/// Name of an archived original DST
pub fn original_filename(date: NaiveDate) -> String {
    format!("Original DST - {}.xlsx", date.format(FILENAME_DATE_FORMAT))
}

/// Path separators would be read as folders by storage backends.
fn path_safe(text: &str) -> String {
    text.replace(['/', '\\'], "-")
}
