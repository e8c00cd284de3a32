use crate::document::{ObjectKind, Transform3D};
use crate::material_registry::MaterialDefinition;
use crate::mesh::MeshData;
use crate::properties::PropertyValue;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const SCENE_FILE_VERSION: u32 = 1;

/// On-disk form of a document. Property groups are stored verbatim so plugin settings survive a
/// save/load cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub meshes: Vec<SceneMesh>,
    #[serde(default)]
    pub materials: Vec<SceneMaterial>,
    #[serde(default)]
    pub collections: Vec<SceneCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_collection: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
}

impl Default for SceneFile {
    fn default() -> Self {
        Self {
            version: SCENE_FILE_VERSION,
            objects: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            collections: Vec::new(),
            active_collection: None,
            properties: BTreeMap::new(),
        }
    }
}

const fn default_version() -> u32 {
    SCENE_FILE_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub transform: TransformData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMesh {
    pub key: String,
    #[serde(default)]
    pub positions: Vec<Vec3Data>,
    #[serde(default)]
    pub indices: Vec<u32>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMaterial {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_base_color")]
    pub base_color_factor: [f32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn default_base_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneCollection {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformData {
    pub translation: Vec3Data,
    #[serde(default = "QuatData::identity")]
    pub rotation: QuatData,
    #[serde(default = "Vec3Data::one")]
    pub scale: Vec3Data,
}

impl Default for TransformData {
    fn default() -> Self {
        Self::from(Transform3D::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3Data {
    fn one() -> Self {
        Self { x: 1.0, y: 1.0, z: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuatData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl QuatData {
    fn identity() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

impl SceneFile {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading scene file {}", path.display()))?;
        let scene = serde_json::from_slice::<SceneFile>(&bytes)
            .with_context(|| format!("Parsing scene file {}", path.display()))?;
        Ok(scene)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Creating scene directory {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json.as_bytes()).with_context(|| format!("Writing scene file {}", path.display()))?;
        Ok(())
    }
}

impl SceneMesh {
    pub fn from_mesh(key: &str, mesh: &MeshData, source: Option<&Path>) -> Self {
        Self {
            key: key.to_string(),
            positions: mesh.positions.iter().copied().map(Vec3Data::from).collect(),
            indices: mesh.indices.clone(),
            materials: mesh.materials.clone(),
            source: source.map(|path| path.display().to_string()),
        }
    }

    pub fn to_mesh(&self) -> MeshData {
        let positions = self.positions.iter().copied().map(glam::Vec3::from).collect();
        MeshData::new(positions, self.indices.clone()).with_materials(self.materials.iter().cloned())
    }
}

impl From<&MaterialDefinition> for SceneMaterial {
    fn from(definition: &MaterialDefinition) -> Self {
        Self {
            key: definition.key.clone(),
            label: (definition.label != definition.key).then(|| definition.label.clone()),
            base_color_factor: definition.base_color_factor,
            source: definition.source.clone(),
        }
    }
}

impl From<&SceneMaterial> for MaterialDefinition {
    fn from(material: &SceneMaterial) -> Self {
        Self {
            key: material.key.clone(),
            label: material.label.clone().unwrap_or_else(|| material.key.clone()),
            base_color_factor: material.base_color_factor,
            source: material.source.clone(),
        }
    }
}

impl From<Transform3D> for TransformData {
    fn from(transform: Transform3D) -> Self {
        Self {
            translation: transform.translation.into(),
            rotation: transform.rotation.into(),
            scale: transform.scale.into(),
        }
    }
}

impl From<&TransformData> for Transform3D {
    fn from(data: &TransformData) -> Self {
        Self { translation: data.translation.into(), rotation: data.rotation.into(), scale: data.scale.into() }
    }
}

impl From<glam::Vec3> for Vec3Data {
    fn from(value: glam::Vec3) -> Self {
        Self { x: value.x, y: value.y, z: value.z }
    }
}

impl From<Vec3Data> for glam::Vec3 {
    fn from(value: Vec3Data) -> Self {
        glam::Vec3::new(value.x, value.y, value.z)
    }
}

impl From<glam::Quat> for QuatData {
    fn from(value: glam::Quat) -> Self {
        let v = value.normalize();
        Self { x: v.x, y: v.y, z: v.z, w: v.w }
    }
}

impl From<QuatData> for glam::Quat {
    fn from(value: QuatData) -> Self {
        glam::Quat::from_xyzw(value.x, value.y, value.z, value.w).normalize()
    }
}
