use crate::material_registry::{MaterialDefinition, MaterialRegistry};
use crate::mesh::MeshData;
use crate::mesh_registry::MeshRegistry;
use crate::naming::NameAllocator;
use crate::properties::{PropertyStore, PropertyValue};
use crate::scene::{
    SceneCollection, SceneFile, SceneMaterial, SceneMesh, SceneObject, TransformData, SCENE_FILE_VERSION,
};
use anyhow::{anyhow, bail, Context, Result};
use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_COLLECTION: &str = "Collection";

// ---------- Components ----------
#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct ObjectName(pub String);

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Mesh,
    Empty,
    Camera,
    Light,
}

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform3D {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::default() }
    }
}

#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct MeshInstance {
    pub mesh: String,
}

#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct CustomProperties(pub BTreeMap<String, PropertyValue>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    objects: Vec<Entity>,
    members: HashSet<Entity>,
}

impl Collection {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), objects: Vec::new(), members: HashSet::new() }
    }

    pub fn objects(&self) -> &[Entity] {
        &self.objects
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    /// Appends `entity` unless it is already linked. Returns whether it was added.
    fn push(&mut self, entity: Entity) -> bool {
        if !self.members.insert(entity) {
            return false;
        }
        self.objects.push(entity);
        true
    }

    fn unlink_all(&mut self, removed: &HashSet<Entity>) {
        if removed.iter().any(|entity| self.members.contains(entity)) {
            self.objects.retain(|entity| !removed.contains(entity));
            self.members.retain(|entity| !removed.contains(entity));
        }
    }
}

/// In-memory model of the content being edited: objects live in a `bevy_ecs` world, are made
/// visible to the scene by linking them into collections, and reference mesh datablocks and
/// materials held by the document's registries.
#[derive(Debug)]
pub struct Document {
    pub world: World,
    pub meshes: MeshRegistry,
    pub materials: MaterialRegistry,
    pub properties: PropertyStore,
    collections: Vec<Collection>,
    active_collection: usize,
    source_path: Option<PathBuf>,
    object_names: NameAllocator,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            meshes: MeshRegistry::new(),
            materials: MaterialRegistry::new(),
            properties: PropertyStore::new(),
            collections: vec![Collection::new(DEFAULT_COLLECTION)],
            active_collection: 0,
            source_path: None,
            object_names: NameAllocator::new(),
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn set_source_path(&mut self, path: Option<PathBuf>) {
        self.source_path = path;
    }

    // ---------- Collections ----------
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn add_collection(&mut self, name: &str) -> Result<usize> {
        if self.collections.iter().any(|collection| collection.name == name) {
            bail!("Collection '{name}' already exists");
        }
        self.collections.push(Collection::new(name));
        Ok(self.collections.len() - 1)
    }

    pub fn set_active_collection(&mut self, name: &str) -> Result<()> {
        let index = self
            .collections
            .iter()
            .position(|collection| collection.name == name)
            .ok_or_else(|| anyhow!("Collection '{name}' not found"))?;
        self.active_collection = index;
        Ok(())
    }

    pub fn active_collection(&self) -> &Collection {
        &self.collections[self.active_collection]
    }

    // ---------- Objects ----------
    /// Spawns an object and links it into the active collection. Taken names get a numeric suffix.
    pub fn spawn_object(
        &mut self,
        name: &str,
        kind: ObjectKind,
        transform: Transform3D,
        mesh: Option<&str>,
    ) -> Result<Entity> {
        if let Some(key) = mesh {
            if !self.meshes.has(key) {
                bail!("Mesh '{key}' not registered");
            }
        }
        let name = self.object_names.claim(name);
        let mut entity = self.world.spawn((ObjectName(name), kind, transform, CustomProperties::default()));
        if let Some(key) = mesh {
            entity.insert(MeshInstance { mesh: key.to_string() });
        }
        let entity = entity.id();
        self.link_object(entity)?;
        Ok(entity)
    }

    /// Registers `mesh` under the object's name and spawns a linked mesh object using it.
    pub fn add_mesh_object(&mut self, name: &str, mesh: MeshData, translation: Vec3) -> Result<Entity> {
        let key = self.meshes.insert_unique(name, mesh)?;
        self.spawn_object(name, ObjectKind::Mesh, Transform3D::from_translation(translation), Some(&key))
    }

    /// Loads the first mesh of a glTF file and spawns a linked mesh object using it.
    pub fn import_gltf_object(&mut self, name: &str, path: impl AsRef<Path>, translation: Vec3) -> Result<Entity> {
        let key = self.meshes.load_unique(name, path)?;
        self.spawn_object(name, ObjectKind::Mesh, Transform3D::from_translation(translation), Some(&key))
    }

    pub fn add_material(&mut self, definition: MaterialDefinition) -> Result<()> {
        self.materials.register(definition)
    }

    fn exists(&self, entity: Entity) -> bool {
        self.world.get::<ObjectName>(entity).is_some()
    }

    fn ensure_exists(&self, entity: Entity) -> Result<()> {
        if self.exists(entity) {
            Ok(())
        } else {
            Err(anyhow!("Object {entity:?} does not exist"))
        }
    }

    /// Objects linked into any collection, in collection order, each listed once.
    pub fn scene_objects(&self) -> Vec<Entity> {
        let mut seen = HashSet::new();
        self.collections
            .iter()
            .flat_map(|collection| collection.objects.iter().copied())
            .filter(|entity| seen.insert(*entity))
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.scene_objects().len()
    }

    pub fn find_object(&self, name: &str) -> Option<Entity> {
        self.scene_objects().into_iter().find(|&entity| self.object_name(entity) == Some(name))
    }

    /// Names of every mesh object in the scene, queried fresh on each call.
    pub fn mesh_object_names(&self) -> Vec<String> {
        self.scene_objects()
            .into_iter()
            .filter(|&entity| self.object_kind(entity) == Some(ObjectKind::Mesh))
            .filter_map(|entity| self.object_name(entity).map(str::to_string))
            .collect()
    }

    pub fn object_name(&self, entity: Entity) -> Option<&str> {
        self.world.get::<ObjectName>(entity).map(|name| name.0.as_str())
    }

    pub fn object_kind(&self, entity: Entity) -> Option<ObjectKind> {
        self.world.get::<ObjectKind>(entity).copied()
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform3D> {
        self.world.get::<Transform3D>(entity).copied()
    }

    pub fn location(&self, entity: Entity) -> Option<Vec3> {
        self.transform(entity).map(|transform| transform.translation)
    }

    pub fn set_location(&mut self, entity: Entity, location: Vec3) -> Result<()> {
        let mut transform = self
            .world
            .get_mut::<Transform3D>(entity)
            .ok_or_else(|| anyhow!("Object {entity:?} has no transform"))?;
        transform.translation = location;
        Ok(())
    }

    pub fn mesh_key(&self, entity: Entity) -> Option<&str> {
        self.world.get::<MeshInstance>(entity).map(|instance| instance.mesh.as_str())
    }

    /// Copies an object together with an independent copy of its mesh datablock. The copy is not
    /// linked into any collection.
    pub fn duplicate_object(&mut self, entity: Entity) -> Result<Entity> {
        self.ensure_exists(entity)?;
        let name = self.object_name(entity).unwrap_or("Object").to_string();
        let kind = self.object_kind(entity).unwrap_or(ObjectKind::Empty);
        let transform = self.transform(entity).unwrap_or_default();
        let properties = self.world.get::<CustomProperties>(entity).cloned().unwrap_or_default();
        let mesh = match self.mesh_key(entity).map(str::to_string) {
            Some(key) => Some(self.meshes.duplicate(&key)?),
            None => None,
        };
        let name = self.object_names.claim(&name);
        let mut copy = self.world.spawn((ObjectName(name), kind, transform, properties));
        if let Some(mesh) = mesh {
            copy.insert(MeshInstance { mesh });
        }
        Ok(copy.id())
    }

    pub fn link_object(&mut self, entity: Entity) -> Result<()> {
        self.ensure_exists(entity)?;
        let collection = &mut self.collections[self.active_collection];
        if !collection.push(entity) {
            bail!("Object {entity:?} already linked into collection '{}'", collection.name);
        }
        Ok(())
    }

    /// Unlinks an object from every collection, despawns it and frees its mesh datablock once no
    /// other object uses it.
    pub fn remove_object(&mut self, entity: Entity) -> Result<()> {
        self.remove_objects(&[entity])
    }

    /// Removes a batch of objects. Every entity is checked before anything changes, and the
    /// remaining objects are scanned once for mesh datablocks that are still in use.
    pub fn remove_objects(&mut self, entities: &[Entity]) -> Result<()> {
        for &entity in entities {
            self.ensure_exists(entity)?;
        }
        let removed: HashSet<Entity> = entities.iter().copied().collect();
        for collection in &mut self.collections {
            collection.unlink_all(&removed);
        }
        let mut orphaned: HashSet<String> = HashSet::new();
        for &entity in &removed {
            if let Some(key) = self.mesh_key(entity) {
                orphaned.insert(key.to_string());
            }
            if let Some(name) = self.world.get::<ObjectName>(entity) {
                self.object_names.release(&name.0);
            }
            self.world.despawn(entity);
        }
        if !orphaned.is_empty() {
            for instance in self.world.query::<&MeshInstance>().iter(&self.world) {
                orphaned.remove(&instance.mesh);
            }
            for key in &orphaned {
                self.meshes.remove(key);
            }
        }
        Ok(())
    }

    // ---------- Custom properties ----------
    pub fn property(&self, entity: Entity, key: &str) -> Option<&PropertyValue> {
        self.world.get::<CustomProperties>(entity).and_then(|props| props.0.get(key))
    }

    pub fn set_property(&mut self, entity: Entity, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let mut props = self
            .world
            .get_mut::<CustomProperties>(entity)
            .ok_or_else(|| anyhow!("Object {entity:?} cannot hold custom properties"))?;
        props.0.insert(key.to_string(), value.into());
        Ok(())
    }

    // ---------- Materials ----------
    pub fn material_slots(&self, entity: Entity) -> Option<&[String]> {
        let key = self.mesh_key(entity)?;
        self.meshes.get(key).map(|mesh| mesh.materials.as_slice())
    }

    pub fn set_material_slots(&mut self, entity: Entity, materials: Vec<String>) -> Result<()> {
        let key = self.mesh_key(entity).ok_or_else(|| anyhow!("Object {entity:?} has no mesh data"))?.to_string();
        let mesh = self.meshes.get_mut(&key).ok_or_else(|| anyhow!("Mesh '{key}' not registered"))?;
        mesh.materials = materials;
        Ok(())
    }

    // ---------- Paths ----------
    /// Resolves a user-entered path. `//` prefixes are relative to the document file's directory;
    /// other relative paths resolve against the working directory.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = match raw.strip_prefix("//") {
            Some(relative) => {
                let base = self
                    .source_path
                    .as_deref()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                base.join(relative)
            }
            None => PathBuf::from(raw),
        };
        if path.is_absolute() {
            path
        } else {
            match env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path,
            }
        }
    }

    // ---------- Scene files ----------
    pub fn export_scene(&self) -> SceneFile {
        let objects = self.scene_objects();
        let mut mesh_keys: Vec<&str> = objects.iter().filter_map(|&entity| self.mesh_key(entity)).collect();
        mesh_keys.sort_unstable();
        mesh_keys.dedup();
        SceneFile {
            version: SCENE_FILE_VERSION,
            objects: objects
                .iter()
                .map(|&entity| SceneObject {
                    name: self.object_name(entity).unwrap_or_default().to_string(),
                    kind: self.object_kind(entity).unwrap_or(ObjectKind::Empty),
                    transform: TransformData::from(self.transform(entity).unwrap_or_default()),
                    mesh: self.mesh_key(entity).map(str::to_string),
                    properties: self
                        .world
                        .get::<CustomProperties>(entity)
                        .map(|props| props.0.clone())
                        .unwrap_or_default(),
                })
                .collect(),
            meshes: mesh_keys
                .into_iter()
                .filter_map(|key| {
                    self.meshes.get(key).map(|mesh| {
                        SceneMesh::from_mesh(key, mesh, self.meshes.mesh_source(key))
                    })
                })
                .collect(),
            materials: {
                let mut materials: Vec<SceneMaterial> =
                    self.materials.definitions().map(SceneMaterial::from).collect();
                materials.sort_by(|a, b| a.key.cmp(&b.key));
                materials
            },
            collections: self
                .collections
                .iter()
                .map(|collection| SceneCollection {
                    name: collection.name.clone(),
                    objects: collection
                        .objects
                        .iter()
                        .filter_map(|&entity| self.object_name(entity).map(str::to_string))
                        .collect(),
                })
                .collect(),
            active_collection: Some(self.active_collection().name.clone()),
            properties: self.properties.groups().map(|(name, value)| (name.to_string(), value.clone())).collect(),
        }
    }

    pub fn from_scene(scene: &SceneFile) -> Result<Self> {
        let mut document = Document::new();
        document.load_scene(scene)?;
        Ok(document)
    }

    /// Replaces the document contents with `scene`.
    pub fn load_scene(&mut self, scene: &SceneFile) -> Result<()> {
        if scene.version > SCENE_FILE_VERSION {
            bail!("Scene file version {} is newer than supported version {SCENE_FILE_VERSION}", scene.version);
        }
        let mut world = World::new();
        let mut meshes = MeshRegistry::new();
        let mut materials = MaterialRegistry::new();
        let mut properties = PropertyStore::new();
        let mut object_names = NameAllocator::new();

        for mesh in &scene.meshes {
            meshes.insert(mesh.key.clone(), mesh.to_mesh())?;
        }
        for material in &scene.materials {
            materials.register(MaterialDefinition::from(material))?;
        }
        let mut by_name: HashMap<&str, Entity> = HashMap::new();
        for object in &scene.objects {
            if by_name.contains_key(object.name.as_str()) {
                bail!("Scene contains duplicate object name '{}'", object.name);
            }
            let mut entity = world.spawn((
                ObjectName(object.name.clone()),
                object.kind,
                Transform3D::from(&object.transform),
                CustomProperties(object.properties.clone()),
            ));
            if let Some(key) = &object.mesh {
                if !meshes.has(key) {
                    bail!("Object '{}' references missing mesh '{key}'", object.name);
                }
                entity.insert(MeshInstance { mesh: key.clone() });
            }
            by_name.insert(object.name.as_str(), entity.id());
            object_names.insert(object.name.as_str());
        }

        let mut collections = Vec::with_capacity(scene.collections.len().max(1));
        for scene_collection in &scene.collections {
            let mut collection = Collection::new(scene_collection.name.clone());
            for name in &scene_collection.objects {
                let entity = by_name.get(name.as_str()).copied().with_context(|| {
                    format!("Collection '{}' references missing object '{name}'", scene_collection.name)
                })?;
                collection.push(entity);
            }
            collections.push(collection);
        }
        if collections.is_empty() {
            let mut collection = Collection::new(DEFAULT_COLLECTION);
            for object in &scene.objects {
                if let Some(&entity) = by_name.get(object.name.as_str()) {
                    collection.push(entity);
                }
            }
            collections.push(collection);
        }
        let active_collection = match &scene.active_collection {
            Some(name) => collections
                .iter()
                .position(|collection| &collection.name == name)
                .ok_or_else(|| anyhow!("Active collection '{name}' not found"))?,
            None => 0,
        };
        for (name, value) in &scene.properties {
            properties.insert_raw(name.clone(), value.clone());
        }

        self.world = world;
        self.meshes = meshes;
        self.materials = materials;
        self.properties = properties;
        self.collections = collections;
        self.object_names = object_names;
        self.active_collection = active_collection;
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let scene = SceneFile::load_from_path(path)?;
        let mut document = Self::from_scene(&scene)?;
        document.source_path = Some(path.to_path_buf());
        Ok(document)
    }

    pub fn save_to_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.export_scene().save_to_path(path)?;
        self.source_path = Some(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_gets_fresh_name_and_mesh() {
        let mut document = Document::new();
        let base = document.add_mesh_object("Tree", MeshData::cube(1.0), Vec3::ZERO).expect("base");
        let copy = document.duplicate_object(base).expect("duplicate");
        assert_eq!(document.object_name(copy), Some("Tree.001"));
        assert_ne!(document.mesh_key(copy), document.mesh_key(base));
        assert_eq!(document.object_count(), 1, "duplicates are not linked until asked");
        document.link_object(copy).expect("link");
        assert_eq!(document.object_count(), 2);
    }

    #[test]
    fn remove_frees_unshared_mesh_data() {
        let mut document = Document::new();
        let base = document.add_mesh_object("Rock", MeshData::cube(1.0), Vec3::ZERO).expect("base");
        let copy = document.duplicate_object(base).expect("duplicate");
        document.link_object(copy).expect("link");
        let copy_mesh = document.mesh_key(copy).expect("copy mesh").to_string();
        document.remove_object(copy).expect("remove");
        assert!(!document.meshes.has(&copy_mesh));
        assert!(document.meshes.has("Rock"));
        assert_eq!(document.find_object("Rock.001"), None);
    }

    #[test]
    fn batch_removal_frees_names_and_meshes() {
        let mut document = Document::new();
        let base = document.add_mesh_object("Rock", MeshData::cube(1.0), Vec3::ZERO).expect("base");
        let copies: Vec<Entity> = (0..3)
            .map(|_| {
                let copy = document.duplicate_object(base).expect("duplicate");
                document.link_object(copy).expect("link");
                copy
            })
            .collect();
        document.remove_objects(&copies).expect("remove batch");
        assert_eq!(document.object_count(), 1);
        assert_eq!(document.meshes.len(), 1);
        assert!(!document.active_collection().contains(copies[0]));

        let again = document.duplicate_object(base).expect("duplicate");
        assert_eq!(document.object_name(again), Some("Rock.001"));
        assert_eq!(document.mesh_key(again), Some("Rock.001"));
    }

    #[test]
    fn batch_removal_with_stale_entity_changes_nothing() {
        let mut document = Document::new();
        let base = document.add_mesh_object("Rock", MeshData::cube(1.0), Vec3::ZERO).expect("base");
        let gone = document.duplicate_object(base).expect("duplicate");
        document.remove_object(gone).expect("remove");
        assert!(document.remove_objects(&[base, gone]).is_err());
        assert_eq!(document.find_object("Rock"), Some(base));
    }

    #[test]
    fn loaded_scene_names_are_not_reissued() {
        let mut document = Document::new();
        let base = document.add_mesh_object("Tree", MeshData::cube(1.0), Vec3::ZERO).expect("base");
        let copy = document.duplicate_object(base).expect("duplicate");
        document.link_object(copy).expect("link");

        let mut reloaded = Document::from_scene(&document.export_scene()).expect("reload");
        let base = reloaded.find_object("Tree").expect("base");
        let next = reloaded.duplicate_object(base).expect("duplicate");
        assert_eq!(reloaded.object_name(next), Some("Tree.002"));
        assert_eq!(reloaded.mesh_key(next), Some("Tree.002"));
    }

    #[test]
    fn shared_mesh_survives_removal_of_one_user() {
        let mut document = Document::new();
        let first = document.add_mesh_object("Bush", MeshData::cube(1.0), Vec3::ZERO).expect("first");
        let second = document
            .spawn_object("Bush", ObjectKind::Mesh, Transform3D::default(), Some("Bush"))
            .expect("second");
        assert_eq!(document.object_name(second), Some("Bush.001"));
        document.remove_object(first).expect("remove");
        assert!(document.meshes.has("Bush"));
    }

    #[test]
    fn double_slash_paths_resolve_against_document_dir() {
        let mut document = Document::new();
        let root = env::temp_dir().join("ecosystem_docs");
        document.set_source_path(Some(root.join("forest.scene.json")));
        assert_eq!(document.resolve_path("//data/points.json"), root.join("data/points.json"));
        let absolute = root.join("elsewhere.json");
        assert_eq!(document.resolve_path(absolute.to_str().expect("utf8 path")), absolute);
    }

    const TRIANGLE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 36, "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                       "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}],
        "materials": [{"name": "Fern"}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "material": 0}]}]
    }"#;

    #[test]
    fn gltf_objects_keep_their_source() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("fern.gltf");
        std::fs::write(&path, TRIANGLE_GLTF).expect("write gltf");

        let mut document = Document::new();
        let fern = document.import_gltf_object("Fern", &path, Vec3::Y).expect("import gltf");
        assert_eq!(document.material_slots(fern), Some(&["Fern".to_string()][..]));
        let mesh = document.meshes.get("Fern").expect("mesh registered");
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);

        let scene = document.export_scene();
        let source = scene.meshes[0].source.as_deref().expect("source recorded");
        assert!(source.ends_with("fern.gltf"));
    }

    #[test]
    fn mesh_object_names_skip_other_kinds() {
        let mut document = Document::new();
        document.add_mesh_object("Fern", MeshData::cube(1.0), Vec3::ZERO).expect("fern");
        document.spawn_object("Sun", ObjectKind::Light, Transform3D::default(), None).expect("light");
        assert_eq!(document.mesh_object_names(), vec!["Fern".to_string()]);
    }
}
