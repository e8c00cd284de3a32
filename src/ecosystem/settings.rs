use super::SETTINGS_GROUP;
use crate::document::Document;
use crate::panels::EnumItem;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcosystemSettings {
    #[serde(default)]
    pub json_path: String,
    #[serde(default)]
    pub base_object: String,
}

impl EcosystemSettings {
    pub fn load(document: &Document) -> Result<Self> {
        document.properties.get(SETTINGS_GROUP)
    }

    pub fn store(&self, document: &mut Document) -> Result<()> {
        document.properties.set(SETTINGS_GROUP, self)
    }

    /// The base object the selector shows: the stored name, or the first candidate while nothing
    /// has been picked yet.
    pub fn effective_base<'a>(&'a self, candidates: &'a [EnumItem]) -> Option<&'a str> {
        if self.base_object.is_empty() {
            candidates.first().map(|item| item.id.as_str())
        } else {
            Some(self.base_object.as_str())
        }
    }
}

/// Selector options for the base object. Always a live query of the document.
pub fn base_object_items(document: &Document) -> Vec<EnumItem> {
    document.mesh_object_names().into_iter().map(EnumItem::new).collect()
}
