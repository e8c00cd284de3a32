use crate::document::Document;
use anyhow::Result;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[cfg(feature = "editor")]
mod egui_ui;
#[cfg(feature = "editor")]
pub use egui_ui::EguiPanelUi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    pub id: String,
    pub label: String,
}

impl EnumItem {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { label: id.clone(), id }
    }
}

/// What a panel asks the host to do after drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    InvokeOperator(String),
    SetProperty { group: String, field: String, value: Value },
}

/// Drawing surface handed to panels. Widgets report user interaction through their return values.
pub trait PanelUi {
    fn label(&mut self, text: &str);

    /// Returns true when the button was pressed this frame.
    fn operator_button(&mut self, idname: &str, label: &str, icon: Option<&str>) -> bool;

    /// Returns the newly chosen item id, if the selection changed this frame.
    fn enum_property(&mut self, label: &str, current: &str, items: &[EnumItem]) -> Option<String>;
}

pub trait Panel {
    fn idname(&self) -> &'static str;

    fn label(&self) -> &'static str;

    fn category(&self) -> &'static str;

    fn draw(&self, ui: &mut dyn PanelUi, document: &Document) -> Result<Vec<PanelAction>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelWidget {
    Label(String),
    Button { idname: String, label: String, icon: Option<String> },
    EnumProperty { label: String, current: String, items: Vec<EnumItem> },
}

/// Headless `PanelUi` that records every widget and replays scripted clicks and selections.
#[derive(Debug, Default)]
pub struct RecordingPanelUi {
    widgets: Vec<PanelWidget>,
    clicks: HashSet<String>,
    selections: HashMap<String, String>,
}

impl RecordingPanelUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presses the button for `idname` on the next draw.
    pub fn click(mut self, idname: &str) -> Self {
        self.clicks.insert(idname.to_string());
        self
    }

    /// Picks `id` in the enum widget labelled `label` on the next draw.
    pub fn select(mut self, label: &str, id: &str) -> Self {
        self.selections.insert(label.to_string(), id.to_string());
        self
    }

    pub fn widgets(&self) -> &[PanelWidget] {
        &self.widgets
    }

    pub fn labels(&self) -> Vec<&str> {
        self.widgets
            .iter()
            .filter_map(|widget| match widget {
                PanelWidget::Label(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl PanelUi for RecordingPanelUi {
    fn label(&mut self, text: &str) {
        self.widgets.push(PanelWidget::Label(text.to_string()));
    }

    fn operator_button(&mut self, idname: &str, label: &str, icon: Option<&str>) -> bool {
        self.widgets.push(PanelWidget::Button {
            idname: idname.to_string(),
            label: label.to_string(),
            icon: icon.map(str::to_string),
        });
        self.clicks.remove(idname)
    }

    fn enum_property(&mut self, label: &str, current: &str, items: &[EnumItem]) -> Option<String> {
        self.widgets.push(PanelWidget::EnumProperty {
            label: label.to_string(),
            current: current.to_string(),
            items: items.to_vec(),
        });
        let choice = self.selections.remove(label)?;
        (choice != current && items.iter().any(|item| item.id == choice)).then_some(choice)
    }
}
