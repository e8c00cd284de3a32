use crate::file_browser::FileFilter;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/ecosystem.json";

#[derive(Debug, Clone, Deserialize)]
pub struct ImporterConfig {
    /// Boolean custom property that marks generated instances for later cleanup.
    #[serde(default = "ImporterConfig::default_marker_attribute")]
    pub marker_attribute: String,
    /// Instances with label `L` look up the material `{material_prefix}{L}`.
    #[serde(default = "ImporterConfig::default_material_prefix")]
    pub material_prefix: String,
    #[serde(default = "ImporterConfig::default_file_filter")]
    pub file_filter: FileFilter,
    #[serde(default = "ImporterConfig::default_placeholder")]
    pub placeholder: String,
}

impl ImporterConfig {
    fn default_marker_attribute() -> String {
        "is_ecosystem_instance".to_string()
    }

    fn default_material_prefix() -> String {
        "Cluster_".to_string()
    }

    fn default_file_filter() -> FileFilter {
        FileFilter { name: "JSON".to_string(), extensions: vec!["json".to_string()] }
    }

    fn default_placeholder() -> String {
        "No JSON file selected".to_string()
    }

    pub fn material_name(&self, label: i64) -> String {
        format!("{}{label}", self.material_prefix)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("[ecosystem] Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            marker_attribute: Self::default_marker_attribute(),
            material_prefix: Self::default_material_prefix(),
            file_filter: Self::default_file_filter(),
            placeholder: Self::default_placeholder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: ImporterConfig = serde_json::from_str(r#"{ "material_prefix": "Biome_" }"#).expect("parse");
        assert_eq!(cfg.material_prefix, "Biome_");
        assert_eq!(cfg.marker_attribute, "is_ecosystem_instance");
        assert_eq!(cfg.file_filter.extensions, vec!["json".to_string()]);
        assert_eq!(cfg.material_name(4), "Biome_4");
    }

    #[test]
    fn unreadable_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ecosystem.json");
        let mut file = fs::File::create(&path).expect("create");
        file.write_all(b"{ not json").expect("write");
        let cfg = ImporterConfig::load_or_default(&path);
        assert_eq!(cfg.material_name(0), "Cluster_0");
        assert_eq!(cfg.placeholder, "No JSON file selected");
    }
}
