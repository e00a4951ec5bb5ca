use crate::table::Table;
use crate::workflow::amendment::Amendment;
use crate::workflow::export::ExportRequest;
use crate::workflow::export::ExportedFile;

/// Progress of one tab.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Idle,
    FileSelected,
    Decoded,
    EditInProgress,
    Validated,
    Uploaded,
    Failed,
}

impl Stage {
    /// Stages the user can act from; a failure falls back to the last of these.
    fn is_interactive(self) -> bool {
        matches!(self, Stage::Idle | Stage::Decoded | Stage::EditInProgress)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
}

/// Stage and pending messages of one tab.
#[derive(Clone, Debug, Default)]
pub struct TabState {
    stage: Stage,
    resume: Stage,
    notices: Vec<Notice>,
}

impl TabState {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The interactive stage the tab returns to after an upload or a failure.
    pub fn resume_stage(&self) -> Stage {
        self.resume
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        if stage.is_interactive() {
            self.resume = stage;
        }
        self.stage = stage;
    }

    /// Marks the current action as failed and queues the error message.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.stage = Stage::Failed;
        self.notices.push(Notice::Error(message.into()));
    }

    /// Starts over from `stage`, dropping queued messages.
    pub(crate) fn reset(&mut self, stage: Stage) {
        self.stage = stage;
        self.resume = stage;
        self.notices.clear();
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Removes and returns the queued messages once they have been shown.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

/// What the intake tab hands to the amendment tab.
#[derive(Clone, Debug)]
pub struct Handoff {
    pub file_name: String,
    pub table: Table,
    pub original_bytes: Vec<u8>,
}

/// Everything one browser session holds between requests.
#[derive(Debug, Default)]
pub struct Session {
    pub(crate) handoff: Option<Handoff>,
    pub(crate) amendment: Option<Amendment>,
    pub(crate) draft: Option<ExportRequest>,
    pub(crate) last_export: Option<ExportedFile>,
    pub intake: TabState,
    pub amend: TabState,
}

impl Session {
    pub fn handoff(&self) -> Option<&Handoff> {
        self.handoff.as_ref()
    }

    pub fn amendment(&self) -> Option<&Amendment> {
        self.amendment.as_ref()
    }

    /// Export form values from the last submission
    pub fn draft(&self) -> Option<&ExportRequest> {
        self.draft.as_ref()
    }

    pub fn last_export(&self) -> Option<&ExportedFile> {
        self.last_export.as_ref()
    }

    /// The table the amendment tab works on: the edited copy if editing has
    /// started, otherwise the decoded table.
    pub fn current_table(&self) -> Option<&Table> {
        self.amendment
            .as_ref()
            .map(Amendment::table)
            .or_else(|| self.handoff.as_ref().map(|handoff| &handoff.table))
    }

    /// Replaces the handoff, discarding edits and exports built on the previous one.
    pub(crate) fn set_handoff(&mut self, handoff: Option<Handoff>) {
        self.handoff = handoff;
        self.amendment = None;
        self.last_export = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_resumes_last_interactive_stage() {
        let mut tab = TabState::default();
        tab.enter(Stage::Decoded);
        tab.enter(Stage::EditInProgress);
        tab.enter(Stage::Validated);
        tab.fail("upload failed");

        assert_eq!(tab.stage(), Stage::Failed);
        assert_eq!(tab.resume_stage(), Stage::EditInProgress);
        assert_eq!(tab.take_notices(), vec![Notice::Error("upload failed".to_owned())]);
        assert!(tab.notices().is_empty());
    }

    #[test]
    fn reset_clears_notices() {
        let mut tab = TabState::default();
        tab.notify(Notice::Info("hello".to_owned()));
        tab.reset(Stage::Decoded);
        assert_eq!(tab.stage(), Stage::Decoded);
        assert_eq!(tab.resume_stage(), Stage::Decoded);
        assert!(tab.notices().is_empty());
    }

    #[test]
    fn new_handoff_discards_previous_work() {
        let mut session = Session::default();
        session.last_export = Some(ExportedFile { filename: "a.xlsx".to_owned(), bytes: vec![1] });
        session.set_handoff(Some(Handoff {
            file_name: "dst.xlsx".to_owned(),
            table: Table::default(),
            original_bytes: vec![],
        }));
        assert!(session.last_export().is_none());
        assert_eq!(session.current_table(), Some(&Table::default()));
    }
}
