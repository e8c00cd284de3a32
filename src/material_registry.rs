use anyhow::{bail, Result};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDefinition {
    pub key: String,
    pub label: String,
    pub base_color_factor: [f32; 4],
    pub source: Option<String>,
}

impl MaterialDefinition {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            source: None,
        }
    }

    pub fn with_base_color(mut self, rgba: [f32; 4]) -> Self {
        self.base_color_factor = rgba;
        self
    }
}

/// Name-keyed materials known to a document.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    materials: HashMap<String, MaterialDefinition>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self { materials: HashMap::new() }
    }

    /// Adds or replaces a material under its key.
    pub fn register(&mut self, definition: MaterialDefinition) -> Result<()> {
        if definition.key.is_empty() {
            bail!("Material key must not be empty");
        }
        self.materials.insert(definition.key.clone(), definition);
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.materials.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&MaterialDefinition> {
        self.materials.get(key)
    }

    pub fn material_source(&self, key: &str) -> Option<&str> {
        self.materials.get(key).and_then(|definition| definition.source.as_deref())
    }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.materials.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn definitions(&self) -> impl Iterator<Item = &MaterialDefinition> {
        self.materials.values()
    }

    pub fn remove(&mut self, key: &str) -> Option<MaterialDefinition> {
        self.materials.remove(key)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_existing_key() {
        let mut registry = MaterialRegistry::new();
        registry.register(MaterialDefinition::new("Cluster_1")).expect("register");
        registry
            .register(MaterialDefinition::new("Cluster_1").with_base_color([0.2, 0.8, 0.2, 1.0]))
            .expect("re-register");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Cluster_1").map(|m| m.base_color_factor), Some([0.2, 0.8, 0.2, 1.0]));
    }

    #[test]
    fn keys_are_sorted() {
        let mut registry = MaterialRegistry::new();
        for key in ["Cluster_2", "Bark", "Cluster_0"] {
            registry.register(MaterialDefinition::new(key)).expect("register");
        }
        assert_eq!(registry.keys(), vec!["Bark", "Cluster_0", "Cluster_2"]);
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut registry = MaterialRegistry::new();
        assert!(registry.register(MaterialDefinition::new("")).is_err());
        assert!(registry.is_empty());
    }
}
