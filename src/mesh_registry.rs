use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};

use crate::mesh::MeshData;
use crate::naming::NameAllocator;

/// Mesh datablocks owned by a document. Objects reference entries by key; every duplicate gets its
/// own entry so edits to one copy never reach another.
#[derive(Debug, Default)]
pub struct MeshRegistry {
    entries: HashMap<String, MeshEntry>,
    keys: NameAllocator,
}

#[derive(Debug)]
struct MeshEntry {
    mesh: MeshData,
    source: Option<PathBuf>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self { entries: HashMap::new(), keys: NameAllocator::new() }
    }

    pub fn insert(&mut self, key: impl Into<String>, mesh: MeshData) -> Result<()> {
        self.insert_entry(key.into(), mesh, None)
    }

    fn insert_entry(&mut self, key: String, mesh: MeshData, source: Option<PathBuf>) -> Result<()> {
        if key.is_empty() {
            bail!("Mesh key must not be empty");
        }
        self.keys.insert(key.clone());
        self.entries.insert(key, MeshEntry { mesh, source });
        Ok(())
    }

    /// Inserts under `name`, or under a suffixed variant when `name` is taken. Returns the key used.
    pub fn insert_unique(&mut self, name: &str, mesh: MeshData) -> Result<String> {
        self.insert_unique_entry(name, mesh, None)
    }

    fn insert_unique_entry(&mut self, name: &str, mesh: MeshData, source: Option<PathBuf>) -> Result<String> {
        if name.is_empty() {
            bail!("Mesh key must not be empty");
        }
        let key = self.keys.claim(name);
        self.entries.insert(key.clone(), MeshEntry { mesh, source });
        Ok(key)
    }

    /// Loads a glTF mesh under `name` or a suffixed variant of it. Returns the key used.
    pub fn load_unique(&mut self, name: &str, path: impl AsRef<Path>) -> Result<String> {
        let path_ref = path.as_ref();
        let mesh = MeshData::load_gltf(path_ref)?;
        self.insert_unique_entry(name, mesh, Some(path_ref.to_path_buf()))
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&MeshData> {
        self.entries.get(key).map(|entry| &entry.mesh)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MeshData> {
        self.entries.get_mut(key).map(|entry| &mut entry.mesh)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mesh_source(&self, key: &str) -> Option<&Path> {
        self.entries.get(key).and_then(|entry| entry.source.as_deref())
    }

    /// Deep-copies `key` into a new entry and returns the new key (`name.001`, `name.002`, ...).
    pub fn duplicate(&mut self, key: &str) -> Result<String> {
        let entry = self.entries.get(key).ok_or_else(|| anyhow!("Mesh '{key}' not registered"))?;
        let mesh = entry.mesh.clone();
        let source = entry.source.clone();
        let new_key = self.keys.claim_suffixed(key);
        self.entries.insert(new_key.clone(), MeshEntry { mesh, source });
        Ok(new_key)
    }

    pub fn remove(&mut self, key: &str) -> Option<MeshData> {
        let entry = self.entries.remove(key)?;
        self.keys.release(key);
        Some(entry.mesh)
    }
}
