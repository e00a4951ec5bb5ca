//! # DST Workflow
//!
//! The two tabs of the tool as one object. The intake tab decodes the file the
//! BCC uploads and may archive it; the amendment tab lets the FL edit the
//! allow-listed columns and export the result. Every operation works on a
//! [`Session`] passed in by the caller and reports failures both as a return
//! value and as a notice on the affected tab.
use crate::error::DstError;
use crate::spreadsheet;
use crate::storage::FileStore;
use crate::storage::StorageError;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing::warn;

pub mod amendment;
pub mod export;
pub mod session;

use amendment::Amendment;
use export::ExportRequest;
use export::ExportedFile;
use session::Handoff;
use session::Notice;
use session::Session;
use session::Stage;

/// Columns the FL may edit; every other column is locked
pub const EDITABLE_COLUMNS: [&str; 4] = [
    "SALES CONSULTANT (SC/SM)",
    "DOCTOR CUSTOMER ADMIN (DCA)",
    "CONSULTANT THERAPIST (CT)",
    "PIC",
];

/// Rows shown in the intake preview
pub const PREVIEW_ROWS: usize = 20;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("No DST loaded yet. Please ask BCC to upload DST in Tab 1.")]
    NoTableError,

    #[error("Please upload the daily DST Excel file provided by BCC.")]
    NoFileError,
}

/// Destination folders in the file store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Folders {
    pub original: String,
    pub amended: String,
}

/// A successful upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    pub filename: String,
    pub file_id: String,
}

/// Result of an export that got as far as producing a workbook. The file is
/// kept for download whether or not the upload succeeded.
#[derive(Debug)]
pub struct ExportOutcome {
    pub file: ExportedFile,
    pub upload: Result<UploadReceipt, StorageError>,
}

pub struct Workflow {
    store: Arc<dyn FileStore>,
    folders: Folders,
    editable_columns: Vec<String>,
}

impl Workflow {
    pub fn new(store: Arc<dyn FileStore>, folders: Folders) -> Workflow {
        Workflow {
            store,
            folders,
            editable_columns: EDITABLE_COLUMNS.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn editable_columns(&self) -> &[String] {
        &self.editable_columns
    }

    /// Decodes an uploaded file and hands the table to the amendment tab.
    ///
    /// On failure the previous handoff is dropped, so the amendment tab never
    /// works on a table that no longer matches the intake tab.
    pub fn intake(&self, session: &mut Session, file_name: &str, bytes: Vec<u8>) -> Result<(), DstError> {
        session.intake.reset(Stage::Idle);
        if bytes.is_empty() {
            session.set_handoff(None);
            session.amend.reset(Stage::Idle);
            session.intake.notify(Notice::Info(WorkflowError::NoFileError.to_string()));
            Err(WorkflowError::NoFileError)?
        }
        session.intake.enter(Stage::FileSelected);

        match spreadsheet::decode(file_name, &bytes) {
            Ok(table) => {
                info!(file = file_name, rows = table.row_count(), columns = table.column_count(), "DST decoded");
                session.set_handoff(Some(Handoff {
                    file_name: file_name.to_owned(),
                    table,
                    original_bytes: bytes,
                }));
                session.intake.enter(Stage::Decoded);
                session.intake.notify(Notice::Success("DST file loaded successfully. Preview below:".to_owned()));
                session.amend.reset(Stage::Decoded);
                Ok(())
            }
            Err(error) => {
                warn!(file = file_name, %error, "DST decode failed");
                session.set_handoff(None);
                session.amend.reset(Stage::Idle);
                session.intake.fail(format!("Error reading Excel file: {}", error));
                Err(error)
            }
        }
    }

    /// Uploads the original bytes to the originals folder.
    pub async fn archive_original(&self, session: &mut Session, today: NaiveDate) -> Result<UploadReceipt, DstError> {
        let handoff = match session.handoff.as_ref() {
            Some(handoff) => handoff,
            None => {
                session.intake.notify(Notice::Info(WorkflowError::NoFileError.to_string()));
                Err(WorkflowError::NoFileError)?
            }
        };

        let filename = export::original_filename(today);
        match self.store.upload(&self.folders.original, &handoff.original_bytes, &filename).await {
            Ok(file_id) => {
                session.intake.enter(Stage::Uploaded);
                session.intake.notify(Notice::Success(format!(
                    "Original DST uploaded to Google Drive.\nFilename: {}\nFile ID: {}",
                    filename, file_id
                )));
                Ok(UploadReceipt { filename, file_id })
            }
            Err(error) => {
                session.intake.fail(format!("Failed to upload to Google Drive: {}", error));
                Err(error)?
            }
        }
    }

    /// Returns the session's amendment, starting one from the decoded table if needed.
    pub fn amendment<'s>(&self, session: &'s mut Session) -> Result<&'s mut Amendment, DstError> {
        if session.amendment.is_none() {
            let handoff = session.handoff.as_ref().ok_or(WorkflowError::NoTableError)?;
            session.amendment = Some(Amendment::new(&handoff.table, &self.editable_columns));
        }
        session.amendment.as_mut().ok_or_else(|| WorkflowError::NoTableError.into())
    }

    /// Applies one cell edit. Rejected edits leave the table unchanged and
    /// queue an error notice.
    pub fn edit(&self, session: &mut Session, row: usize, column: &str, input: &str) -> Result<bool, DstError> {
        let result = self.amendment(session).and_then(|amendment| amendment.edit(row, column, input));
        match result {
            Ok(true) => {
                session.amend.enter(Stage::EditInProgress);
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(error) => {
                session.amend.notify(Notice::Error(error.to_string()));
                Err(error)
            }
        }
    }

    /// Validates the request, encodes the edited table and uploads it.
    ///
    /// Validation failures return an error before anything is written. Once
    /// the workbook is built it stays downloadable from the session, and the
    /// upload result is reported in [`ExportOutcome::upload`].
    pub async fn export(&self, session: &mut Session, request: ExportRequest) -> Result<ExportOutcome, DstError> {
        session.draft = Some(request.to_owned());

        if session.handoff.is_none() {
            session.amend.notify(Notice::Warning(WorkflowError::NoTableError.to_string()));
            Err(WorkflowError::NoTableError)?
        }
        let export = match request.validate() {
            Ok(export) => export,
            Err(error) => {
                warn!(%error, "export blocked");
                session.amend.fail(error.to_string());
                Err(error)?
            }
        };
        session.amend.enter(Stage::Validated);

        let amendment = self.amendment(session)?;
        let edits = amendment.edit_count();
        let table = amendment.snapshot();
        let bytes = match spreadsheet::encode(&table) {
            Ok(bytes) => bytes,
            Err(error) => {
                session.amend.fail(format!("Failed to generate or upload amended DST: {}", error));
                return Err(error);
            }
        };
        let file = ExportedFile {
            filename: export.filename(),
            bytes,
        };
        session.last_export = Some(file.to_owned());

        let upload = self.store
            .upload(&self.folders.amended, &file.bytes, &file.filename)
            .await
            .map(|file_id| UploadReceipt {
                filename: file.filename.to_owned(),
                file_id,
            });
        match &upload {
            Ok(receipt) => {
                info!(
                    filename = %receipt.filename,
                    editor = %export.editor_name,
                    branch = %export.branch,
                    edits,
                    "amended DST exported"
                );
                session.amend.enter(Stage::Uploaded);
                session.amend.notify(Notice::Success(format!(
                    "Amended DST generated and uploaded to Google Drive.\nFilename: {}\nFile ID: {}",
                    receipt.filename, receipt.file_id
                )));
            }
            Err(error) => {
                session.amend.fail(format!("Failed to generate or upload amended DST: {}", error));
            }
        }
        Ok(ExportOutcome { file, upload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use crate::table::Value;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records uploads; fails every call when `fail` is set.
    #[derive(Default)]
    struct FakeStore {
        fail: bool,
        uploads: Mutex<Vec<(String, String, usize)>>,
    }

    #[async_trait]
    impl FileStore for FakeStore {
        async fn upload(&self, folder_id: &str, bytes: &[u8], filename: &str) -> Result<String, StorageError> {
            if self.fail {
                return Err(StorageError::ApiError {
                    status: 503,
                    message: "Backend Error".to_owned(),
                });
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((folder_id.to_owned(), filename.to_owned(), bytes.len()));
            Ok(format!("file-{}", uploads.len()))
        }
    }

    impl FakeStore {
        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }
    }

    fn folders() -> Folders {
        Folders {
            original: "originals".to_owned(),
            amended: "amended".to_owned(),
        }
    }

    fn workflow(fail: bool) -> (Workflow, Arc<FakeStore>) {
        let store = Arc::new(FakeStore { fail, ..FakeStore::default() });
        (Workflow::new(store.clone(), folders()), store)
    }

    fn dst() -> Table {
        Table::from_rows(
            vec!["NAME".to_owned(), "PIC".to_owned(), "HOURS".to_owned()],
            vec![
                vec!["Alice".into(), "Bob".into(), Value::Number(8.0)],
                vec!["Carol".into(), Value::Empty, Value::Number(6.5)],
            ],
        )
        .unwrap()
    }

    fn loaded_session(workflow: &Workflow) -> Session {
        let mut session = Session::default();
        let bytes = spreadsheet::encode(&dst()).unwrap();
        workflow.intake(&mut session, "dst.xlsx", bytes).unwrap();
        session
    }

    fn may_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn request(editor_name: &str, branch: &str, custom_branch: &str) -> ExportRequest {
        ExportRequest {
            editor_name: editor_name.to_owned(),
            date: may_day(),
            branch: branch.to_owned(),
            custom_branch: custom_branch.to_owned(),
        }
    }

    #[test]
    fn intake_hands_table_to_amendment_tab() {
        let (workflow, _) = workflow(false);
        let session = loaded_session(&workflow);

        assert_eq!(session.handoff().map(|handoff| &handoff.table), Some(&dst()));
        assert_eq!(session.intake.stage(), Stage::Decoded);
        assert_eq!(session.amend.stage(), Stage::Decoded);
        assert_eq!(
            session.intake.notices(),
            [Notice::Success("DST file loaded successfully. Preview below:".to_owned())]
        );
    }

    #[test]
    fn failed_intake_clears_previous_table() {
        let (workflow, _) = workflow(false);
        let mut session = loaded_session(&workflow);

        let result = workflow.intake(&mut session, "notes.txt", b"not a workbook".to_vec());

        assert!(result.is_err());
        assert!(session.handoff().is_none());
        assert!(session.current_table().is_none());
        assert_eq!(session.intake.stage(), Stage::Failed);
        assert_eq!(session.intake.resume_stage(), Stage::Idle);
        assert!(matches!(
            session.intake.notices(),
            [Notice::Error(message)] if message.starts_with("Error reading Excel file: ")
        ));
    }

    #[test]
    fn locked_edit_has_no_effect() {
        let (workflow, _) = workflow(false);
        let mut session = loaded_session(&workflow);

        assert!(workflow.edit(&mut session, 0, "NAME", "Mallory").is_err());
        assert!(workflow.edit(&mut session, 1, "HOURS", "12").is_err());
        assert_eq!(session.current_table(), Some(&dst()));
        assert_eq!(session.amend.stage(), Stage::Decoded);

        assert!(workflow.edit(&mut session, 1, "PIC", "Dave").unwrap());
        assert_eq!(session.amend.stage(), Stage::EditInProgress);
        assert_eq!(session.current_table().and_then(|table| table.cell(1, 1)), Some(&Value::from("Dave")));
    }

    #[test]
    fn edit_without_table() {
        let (workflow, _) = workflow(false);
        let mut session = Session::default();
        assert!(matches!(
            workflow.edit(&mut session, 0, "PIC", "x"),
            Err(DstError::WorkflowError(WorkflowError::NoTableError))
        ));
    }

    #[tokio::test]
    async fn archive_original_uses_dated_name() {
        let (workflow, store) = workflow(false);
        let mut session = loaded_session(&workflow);

        let receipt = workflow.archive_original(&mut session, may_day()).await.unwrap();

        assert_eq!(receipt.filename, "Original DST - 01-05-2024.xlsx");
        assert_eq!(receipt.file_id, "file-1");
        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads[0].0, "originals");
        assert_eq!(uploads[0].2, session.handoff().unwrap().original_bytes.len());
        assert_eq!(session.intake.stage(), Stage::Uploaded);
    }

    #[tokio::test]
    async fn export_uploads_edited_table() {
        let (workflow, store) = workflow(false);
        let mut session = loaded_session(&workflow);
        workflow.edit(&mut session, 1, "PIC", "Dave").unwrap();

        let outcome = workflow.export(&mut session, request("Jane Doe", "WG", "")).await.unwrap();

        assert_eq!(outcome.file.filename, "01-05-2024 WG DST amended by Jane Doe.xlsx");
        assert_eq!(outcome.upload.unwrap().file_id, "file-1");
        assert_eq!(store.uploads.lock().unwrap()[0].0, "amended");
        assert_eq!(session.amend.stage(), Stage::Uploaded);

        let exported = spreadsheet::decode("export.xlsx", &outcome.file.bytes).unwrap();
        assert_eq!(exported.cell(1, 1), Some(&Value::from("Dave")));
        assert_eq!(exported.cell(0, 0), Some(&Value::from("Alice")));
        assert_eq!(session.last_export().map(|file| &file.bytes), Some(&outcome.file.bytes));
    }

    #[tokio::test]
    async fn unedited_export_round_trips() {
        let (workflow, _) = workflow(false);
        let mut session = loaded_session(&workflow);

        let outcome = workflow.export(&mut session, request("Jane", "KV", "")).await.unwrap();

        assert_eq!(spreadsheet::decode("export.xlsx", &outcome.file.bytes).unwrap(), dst());
    }

    #[tokio::test]
    async fn blank_name_blocks_export() {
        let (workflow, store) = workflow(false);
        let mut session = loaded_session(&workflow);

        let error = workflow.export(&mut session, request("   ", "WG", "")).await.unwrap_err();

        assert_eq!(error.to_string(), "Please enter your name before generating the amended DST.");
        assert_eq!(store.upload_count(), 0);
        assert!(session.last_export().is_none());
        assert_eq!(session.amend.stage(), Stage::Failed);
        assert_eq!(session.amend.resume_stage(), Stage::Decoded);
        assert_eq!(session.draft().map(|draft| draft.branch.as_str()), Some("WG"));
    }

    #[tokio::test]
    async fn other_branch_requires_custom_code() {
        let (workflow, store) = workflow(false);
        let mut session = loaded_session(&workflow);

        let error = workflow.export(&mut session, request("Jane", "Other", "  ")).await.unwrap_err();

        assert_eq!(error.to_string(), "Please select or enter a branch code.");
        assert_eq!(store.upload_count(), 0);
        assert!(session.last_export().is_none());
    }

    #[tokio::test]
    async fn storage_failure_keeps_download() {
        let (workflow, _) = workflow(true);
        let mut session = loaded_session(&workflow);
        workflow.edit(&mut session, 0, "PIC", "Eve").unwrap();

        let outcome = workflow.export(&mut session, request("Jane", "Other", "PJ")).await.unwrap();

        assert!(outcome.upload.is_err());
        let file = session.last_export().unwrap();
        assert_eq!(file.filename, "01-05-2024 PJ DST amended by Jane.xlsx");
        let table = spreadsheet::decode(&file.filename, &file.bytes).unwrap();
        assert_eq!(table.cell(0, 1), Some(&Value::from("Eve")));
        assert_eq!(session.amend.stage(), Stage::Failed);
        assert_eq!(session.amend.resume_stage(), Stage::EditInProgress);
        assert!(matches!(
            session.amend.notices(),
            [Notice::Error(message)] if message.starts_with("Failed to generate or upload amended DST: ")
        ));
    }

    #[tokio::test]
    async fn export_without_table() {
        let (workflow, store) = workflow(false);
        let mut session = Session::default();

        let error = workflow.export(&mut session, request("Jane", "WG", "")).await.unwrap_err();

        assert!(matches!(error, DstError::WorkflowError(WorkflowError::NoTableError)));
        assert_eq!(store.upload_count(), 0);
    }
}
