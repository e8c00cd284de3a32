use super::{EnumItem, PanelUi};

/// Draws panels into an `egui::Ui`, typically the body of a side panel.
pub struct EguiPanelUi<'a> {
    ui: &'a mut egui::Ui,
}

impl<'a> EguiPanelUi<'a> {
    pub fn new(ui: &'a mut egui::Ui) -> Self {
        Self { ui }
    }
}

/// Icons map to emoji covered by egui's bundled Noto Emoji font. Unknown icons draw no glyph.
fn icon_glyph(icon: &str) -> &'static str {
    match icon {
        "FILE_FOLDER" => "📂 ",
        "IMPORT" => "📥 ",
        _ => "",
    }
}

impl PanelUi for EguiPanelUi<'_> {
    fn label(&mut self, text: &str) {
        self.ui.label(text);
    }

    fn operator_button(&mut self, _idname: &str, label: &str, icon: Option<&str>) -> bool {
        let text = format!("{}{label}", icon.map(icon_glyph).unwrap_or_default());
        self.ui.button(text).clicked()
    }

    fn enum_property(&mut self, label: &str, current: &str, items: &[EnumItem]) -> Option<String> {
        let selected_text = items
            .iter()
            .find(|item| item.id == current)
            .map(|item| item.label.as_str())
            .unwrap_or(current);
        let mut choice = None;
        egui::ComboBox::from_label(label).selected_text(selected_text).show_ui(self.ui, |ui| {
            for item in items {
                if ui.selectable_label(item.id == current, item.label.as_str()).clicked() && item.id != current {
                    choice = Some(item.id.clone());
                }
            }
        });
        choice
    }
}
