use crate::document::Document;
use crate::file_browser::{FileBrowser, NullFileBrowser};
use crate::operators::{OperatorContext, OperatorStatus};
use crate::panels::{PanelAction, PanelUi};
use crate::plugins::{CapabilityRegistry, EditorPlugin, PluginManager};
use crate::reports::ReportLog;
use anyhow::{anyhow, bail, Result};
use std::path::Path;

/// Owns the document and drives registered plugins: operators run on demand, the modal file
/// browser is polled once per UI frame, and panels are drawn into whatever `PanelUi` the caller
/// provides.
pub struct EditorHost {
    // Capabilities may point into dynamically loaded plugin code, so they drop before the plugins.
    registry: CapabilityRegistry,
    plugins: PluginManager,
    document: Document,
    reports: ReportLog,
    file_browser: Box<dyn FileBrowser>,
    pending_modal: Option<String>,
}

impl EditorHost {
    pub fn new(document: Document) -> Self {
        Self::with_file_browser(document, Box::new(NullFileBrowser::default()))
    }

    pub fn with_file_browser(document: Document, file_browser: Box<dyn FileBrowser>) -> Self {
        Self {
            registry: CapabilityRegistry::new(),
            plugins: PluginManager::new(),
            document,
            reports: ReportLog::new(),
            file_browser,
            pending_modal: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn reports(&self) -> &ReportLog {
        &self.reports
    }

    pub fn reports_mut(&mut self) -> &mut ReportLog {
        &mut self.reports
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginManager {
        &mut self.plugins
    }

    pub fn pending_modal(&self) -> Option<&str> {
        self.pending_modal.as_deref()
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn EditorPlugin>) -> Result<()> {
        self.plugins.register(plugin, &mut self.document, &mut self.registry)
    }

    pub fn unregister_plugin(&mut self, name: &str) -> Result<()> {
        let result = self.plugins.unregister(name, &mut self.document, &mut self.registry);
        self.cancel_orphaned_modal();
        result
    }

    pub fn load_plugins_from_manifest(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        self.plugins.load_from_manifest(path, &mut self.document, &mut self.registry)
    }

    /// Runs an operator's `invoke`. Errors raised by the operator are reported under its idname
    /// and the call resolves to `Cancelled`.
    pub fn invoke_operator(&mut self, idname: &str) -> Result<OperatorStatus> {
        self.run_operator(idname, true)
    }

    /// Runs an operator's `execute`, skipping any interactive step.
    pub fn execute_operator(&mut self, idname: &str) -> Result<OperatorStatus> {
        self.run_operator(idname, false)
    }

    fn run_operator(&mut self, idname: &str, interactive: bool) -> Result<OperatorStatus> {
        if let Some(pending) = &self.pending_modal {
            bail!("operator '{pending}' is still waiting for the file browser");
        }
        let operator =
            self.registry.operator_mut(idname).ok_or_else(|| anyhow!("operator '{idname}' is not registered"))?;
        let mut ctx = OperatorContext::new(&mut self.document, &mut self.reports, self.file_browser.as_mut());
        let result = if interactive { operator.invoke(&mut ctx) } else { operator.execute(&mut ctx) };
        let status = match result {
            Ok(status) => status,
            Err(err) => {
                self.reports.error(idname, format!("{err:#}"));
                OperatorStatus::Cancelled
            }
        };
        if status == OperatorStatus::RunningModal {
            self.pending_modal = Some(idname.to_string());
        }
        Ok(status)
    }

    /// Hands a finished file browser interaction to the waiting operator. Returns the operator's
    /// final status, or `None` while nothing is pending or the browser is still open.
    pub fn poll_modal(&mut self) -> Option<OperatorStatus> {
        let idname = self.pending_modal.clone()?;
        let outcome = self.file_browser.poll()?;
        let Some(operator) = self.registry.operator_mut(&idname) else {
            self.pending_modal = None;
            return Some(OperatorStatus::Cancelled);
        };
        let mut ctx = OperatorContext::new(&mut self.document, &mut self.reports, self.file_browser.as_mut());
        let status = match operator.modal(&mut ctx, outcome) {
            Ok(status) => status,
            Err(err) => {
                self.reports.error(&idname, format!("{err:#}"));
                OperatorStatus::Cancelled
            }
        };
        if status != OperatorStatus::RunningModal {
            self.pending_modal = None;
        }
        Some(status)
    }

    /// Draws every registered panel, optionally limited to one sidebar category, and collects the
    /// actions they request.
    pub fn draw_panels(&self, ui: &mut dyn PanelUi, category: Option<&str>) -> Result<Vec<PanelAction>> {
        let mut actions = Vec::new();
        for panel in self.registry.panels() {
            if category.is_some_and(|wanted| wanted != panel.category()) {
                continue;
            }
            actions.extend(panel.draw(ui, &self.document)?);
        }
        Ok(actions)
    }

    /// Applies panel actions in order and returns the status of each operator they invoked.
    pub fn apply_panel_actions(&mut self, actions: Vec<PanelAction>) -> Result<Vec<OperatorStatus>> {
        let mut statuses = Vec::new();
        for action in actions {
            match action {
                PanelAction::InvokeOperator(idname) => statuses.push(self.invoke_operator(&idname)?),
                PanelAction::SetProperty { group, field, value } => {
                    if self.registry.property_group(&group).is_none() {
                        bail!("property group '{group}' is not registered");
                    }
                    self.document.properties.set_field(&group, &field, value)?;
                }
            }
        }
        Ok(statuses)
    }

    pub fn shutdown(&mut self) {
        self.plugins.shutdown(&mut self.document, &mut self.registry);
        self.pending_modal = None;
    }

    fn cancel_orphaned_modal(&mut self) {
        if let Some(idname) = &self.pending_modal {
            if self.registry.operator(idname).is_none() {
                eprintln!("[host] dropping modal state of unregistered operator '{idname}'");
                self.pending_modal = None;
            }
        }
    }
}

impl Drop for EditorHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}
