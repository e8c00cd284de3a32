use super::settings::{base_object_items, EcosystemSettings};
use super::{IMPORT_IDNAME, PANEL_CATEGORY, PANEL_IDNAME, SELECT_JSON_IDNAME, SETTINGS_GROUP};
use crate::document::Document;
use crate::panels::{Panel, PanelAction, PanelUi};
use anyhow::Result;
use serde_json::json;

pub const BASE_OBJECT_LABEL: &str = "Base Model";

pub struct EcosystemPanel {
    placeholder: String,
}

impl EcosystemPanel {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self { placeholder: placeholder.into() }
    }
}

impl Panel for EcosystemPanel {
    fn idname(&self) -> &'static str {
        PANEL_IDNAME
    }

    fn label(&self) -> &'static str {
        "Ecosystem Generator"
    }

    fn category(&self) -> &'static str {
        PANEL_CATEGORY
    }

    fn draw(&self, ui: &mut dyn PanelUi, document: &Document) -> Result<Vec<PanelAction>> {
        let settings = EcosystemSettings::load(document)?;
        let mut actions = Vec::new();

        if settings.json_path.is_empty() {
            ui.label(&self.placeholder);
        } else {
            ui.label(&settings.json_path);
        }

        if ui.operator_button(SELECT_JSON_IDNAME, "Select JSON", Some("FILE_FOLDER")) {
            actions.push(PanelAction::InvokeOperator(SELECT_JSON_IDNAME.to_string()));
        }

        let items = base_object_items(document);
        let current = settings.effective_base(&items).unwrap_or_default();
        if let Some(choice) = ui.enum_property(BASE_OBJECT_LABEL, current, &items) {
            actions.push(PanelAction::SetProperty {
                group: SETTINGS_GROUP.to_string(),
                field: "base_object".to_string(),
                value: json!(choice),
            });
        }

        if ui.operator_button(IMPORT_IDNAME, "Import Ecosystem", Some("IMPORT")) {
            actions.push(PanelAction::InvokeOperator(IMPORT_IDNAME.to_string()));
        }

        Ok(actions)
    }
}
