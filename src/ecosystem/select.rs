use super::settings::EcosystemSettings;
use super::SELECT_JSON_IDNAME;
use crate::config::ImporterConfig;
use crate::file_browser::{FileBrowserOutcome, FileBrowserRequest};
use crate::operators::{Operator, OperatorContext, OperatorStatus};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Opens the host file browser and stores the chosen file as the settings' JSON path.
pub struct SelectJsonOperator {
    config: ImporterConfig,
    filepath: Option<PathBuf>,
}

impl SelectJsonOperator {
    pub fn new(config: ImporterConfig) -> Self {
        Self { config, filepath: None }
    }

    /// Presets the path `execute` will store, bypassing the browser.
    pub fn set_filepath(&mut self, path: impl Into<PathBuf>) {
        self.filepath = Some(path.into());
    }
}

impl Operator for SelectJsonOperator {
    fn idname(&self) -> &'static str {
        SELECT_JSON_IDNAME
    }

    fn label(&self) -> &'static str {
        "Select JSON"
    }

    fn icon(&self) -> Option<&'static str> {
        Some("FILE_FOLDER")
    }

    fn invoke(&mut self, ctx: &mut OperatorContext<'_>) -> Result<OperatorStatus> {
        let settings = EcosystemSettings::load(ctx.document)?;
        let start_dir = (!settings.json_path.is_empty())
            .then(|| ctx.document.resolve_path(&settings.json_path))
            .and_then(|path| path.parent().map(Path::to_path_buf));
        ctx.file_browser.open(FileBrowserRequest {
            title: self.label().to_string(),
            filter: Some(self.config.file_filter.clone()),
            start_dir,
        })?;
        Ok(OperatorStatus::RunningModal)
    }

    fn execute(&mut self, ctx: &mut OperatorContext<'_>) -> Result<OperatorStatus> {
        let Some(path) = self.filepath.take() else {
            return Ok(OperatorStatus::Cancelled);
        };
        let absolute = if path.is_absolute() {
            path
        } else {
            env::current_dir().context("resolving selected JSON path")?.join(path)
        };
        let mut settings = EcosystemSettings::load(ctx.document)?;
        settings.json_path = absolute.display().to_string();
        settings.store(ctx.document)?;
        Ok(OperatorStatus::Finished)
    }

    fn modal(&mut self, ctx: &mut OperatorContext<'_>, outcome: FileBrowserOutcome) -> Result<OperatorStatus> {
        match outcome {
            FileBrowserOutcome::Selected(path) => {
                self.filepath = Some(path);
                self.execute(ctx)
            }
            FileBrowserOutcome::Cancelled => Ok(OperatorStatus::Cancelled),
        }
    }
}
