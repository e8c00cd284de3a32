use crate::document::Document;
use crate::file_browser::{FileBrowser, FileBrowserOutcome};
use crate::reports::ReportLog;
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    Finished,
    Cancelled,
    /// The operator is waiting on a user-driven modal interaction managed by the host.
    RunningModal,
}

pub struct OperatorContext<'a> {
    pub document: &'a mut Document,
    pub reports: &'a mut ReportLog,
    pub file_browser: &'a mut dyn FileBrowser,
}

impl<'a> OperatorContext<'a> {
    pub fn new(
        document: &'a mut Document,
        reports: &'a mut ReportLog,
        file_browser: &'a mut dyn FileBrowser,
    ) -> Self {
        Self { document, reports, file_browser }
    }
}

/// An action the host can run from a panel button or by id.
pub trait Operator {
    fn idname(&self) -> &'static str;

    fn label(&self) -> &'static str;

    fn icon(&self) -> Option<&'static str> {
        None
    }

    /// Entry point for interactive use. Defaults to `execute`.
    fn invoke(&mut self, ctx: &mut OperatorContext<'_>) -> Result<OperatorStatus> {
        self.execute(ctx)
    }

    fn execute(&mut self, ctx: &mut OperatorContext<'_>) -> Result<OperatorStatus>;

    /// Receives the file browser outcome after `invoke` returned `RunningModal`.
    fn modal(&mut self, _ctx: &mut OperatorContext<'_>, _outcome: FileBrowserOutcome) -> Result<OperatorStatus> {
        Ok(OperatorStatus::Cancelled)
    }
}
