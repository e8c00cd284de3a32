//! Point-cloud ecosystem importer: reads labeled points from JSON and places a tinted copy of a
//! chosen mesh object at each one.

mod import;
mod panel;
mod points;
mod select;
mod settings;

pub use import::{import_points, run_import, ImportEcosystemOperator, ImportError, ImportSummary};
pub use panel::{EcosystemPanel, BASE_OBJECT_LABEL};
pub use points::{load_points, parse_points, PointRecord, PointsError};
pub use select::SelectJsonOperator;
pub use settings::{base_object_items, EcosystemSettings};

use crate::config::ImporterConfig;
use crate::plugins::{Capability, EditorPlugin, PluginContext};
use crate::properties::PropertyGroupDef;
use anyhow::Result;
use std::any::Any;

pub const PLUGIN_NAME: &str = "ecosystem_importer";
pub const SETTINGS_GROUP: &str = "ecosystem_settings";
pub const SELECT_JSON_IDNAME: &str = "ecosystem.select_json";
pub const IMPORT_IDNAME: &str = "ecosystem.import_json";
pub const PANEL_IDNAME: &str = "VIEW3D_PT_ecosystem";
pub const PANEL_CATEGORY: &str = "Ecosystem";

/// Registers the settings group, both operators and the sidebar panel, and removes them again in
/// reverse order.
#[derive(Default)]
pub struct EcosystemPlugin {
    config: ImporterConfig,
}

impl EcosystemPlugin {
    pub fn new(config: ImporterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    fn capabilities() -> [Capability; 4] {
        [
            Capability::PropertyGroup(SETTINGS_GROUP.to_string()),
            Capability::Operator(SELECT_JSON_IDNAME.to_string()),
            Capability::Operator(IMPORT_IDNAME.to_string()),
            Capability::Panel(PANEL_IDNAME.to_string()),
        ]
    }
}

impl EditorPlugin for EcosystemPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn register(&mut self, ctx: &mut PluginContext<'_>) -> Result<()> {
        ctx.register_property_group(PropertyGroupDef::new::<EcosystemSettings>(SETTINGS_GROUP)?)?;
        ctx.register_operator(Box::new(SelectJsonOperator::new(self.config.clone())))?;
        ctx.register_operator(Box::new(ImportEcosystemOperator::new(self.config.clone())))?;
        ctx.register_panel(Box::new(EcosystemPanel::new(self.config.placeholder.clone())))?;
        Ok(())
    }

    fn unregister(&mut self, ctx: &mut PluginContext<'_>) -> Result<()> {
        for capability in Self::capabilities().iter().rev() {
            ctx.unregister(capability)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
