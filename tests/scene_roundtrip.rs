use ecosystem_importer::document::Document;
use ecosystem_importer::ecosystem::{EcosystemSettings, IMPORT_IDNAME};
use ecosystem_importer::material_registry::MaterialDefinition;
use ecosystem_importer::mesh::MeshData;
use ecosystem_importer::operators::OperatorStatus;
use ecosystem_importer::properties::PropertyValue;
use ecosystem_importer::scene::SceneFile;
use ecosystem_importer::{EcosystemPlugin, EditorHost};
use glam::Vec3;
use std::fs;
use tempfile::tempdir;

const MARKER: &str = "is_ecosystem_instance";

fn imported_host(points_path: &std::path::Path) -> EditorHost {
    let mut document = Document::new();
    document
        .add_mesh_object("Tree", MeshData::cube(1.0).with_materials(["Bark"]), Vec3::ZERO)
        .expect("base tree");
    document.add_material(MaterialDefinition::new("Bark")).expect("bark");
    document
        .add_material(MaterialDefinition::new("Cluster_2").with_base_color([0.2, 0.6, 0.1, 1.0]))
        .expect("cluster material");
    let mut host = EditorHost::new(document);
    host.register_plugin(Box::new(EcosystemPlugin::default())).expect("register");
    let settings = EcosystemSettings { json_path: points_path.display().to_string(), base_object: "Tree".into() };
    settings.store(host.document_mut()).expect("store settings");
    assert_eq!(host.invoke_operator(IMPORT_IDNAME).expect("import"), OperatorStatus::Finished);
    host
}

fn tagged(document: &Document) -> Vec<String> {
    document
        .scene_objects()
        .into_iter()
        .filter(|&entity| document.property(entity, MARKER) == Some(&PropertyValue::Bool(true)))
        .filter_map(|entity| document.object_name(entity).map(str::to_string))
        .collect()
}

#[test]
fn imported_scene_survives_save_and_load() {
    let dir = tempdir().expect("temp dir");
    let points = dir.path().join("points.json");
    fs::write(&points, r#"[{"x":1,"y":0,"z":0,"label":2},{"x":0,"y":4,"z":0,"label":7}]"#).expect("points");
    let mut host = imported_host(&points);
    let scene_path = dir.path().join("scenes/forest.scene.json");
    host.document_mut().save_to_path(&scene_path).expect("save scene");
    assert_eq!(host.document().source_path(), Some(scene_path.as_path()));

    let loaded = Document::load_from_path(&scene_path).expect("load scene");
    assert_eq!(loaded.object_count(), 3);
    assert_eq!(tagged(&loaded), tagged(host.document()));

    let first = loaded.find_object("Tree.001").expect("first instance");
    assert_eq!(loaded.location(first), Some(Vec3::new(1.0, 0.0, 0.0)));
    assert_eq!(loaded.material_slots(first), Some(&["Cluster_2".to_string()][..]));
    let second = loaded.find_object("Tree.002").expect("second instance");
    assert_eq!(loaded.material_slots(second), Some(&["Bark".to_string()][..]));

    let material = loaded.materials.get("Cluster_2").expect("material kept");
    assert_eq!(material.base_color_factor, [0.2, 0.6, 0.1, 1.0]);

    let settings: EcosystemSettings = loaded.properties.get("ecosystem_settings").expect("settings kept");
    assert_eq!(settings.base_object, "Tree");
    assert_eq!(settings.json_path, points.display().to_string());
}

#[test]
fn reloaded_instances_are_replaced_on_next_import() {
    let dir = tempdir().expect("temp dir");
    let points = dir.path().join("points.json");
    fs::write(&points, r#"[{"x":1,"y":0,"z":0},{"x":2,"y":0,"z":0},{"x":3,"y":0,"z":0}]"#).expect("points");
    let mut host = imported_host(&points);
    let scene_path = dir.path().join("forest.scene.json");
    host.document_mut().save_to_path(&scene_path).expect("save scene");

    fs::write(&points, r#"[{"x":9,"y":9,"z":9}]"#).expect("rewrite points");
    let loaded = Document::load_from_path(&scene_path).expect("load scene");
    let mut reloaded = EditorHost::new(loaded);
    reloaded.register_plugin(Box::new(EcosystemPlugin::default())).expect("register");
    assert_eq!(reloaded.invoke_operator(IMPORT_IDNAME).expect("import"), OperatorStatus::Finished);

    let document = reloaded.document();
    let names = tagged(document);
    assert_eq!(names.len(), 1);
    let instance = document.find_object(&names[0]).expect("instance");
    assert_eq!(document.location(instance), Some(Vec3::splat(9.0)));
    assert_eq!(document.object_count(), 2);
}

#[test]
fn newer_scene_versions_are_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("future.scene.json");
    let scene = SceneFile { version: 99, ..SceneFile::default() };
    scene.save_to_path(&path).expect("save");
    let err = Document::load_from_path(&path).expect_err("version too new");
    assert!(err.to_string().contains("newer than supported"));
}

#[test]
fn scene_with_dangling_mesh_reference_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("broken.scene.json");
    fs::write(&path, r#"{"version":1,"objects":[{"name":"Tree","kind":"mesh","mesh":"Gone"}]}"#)
        .expect("write scene");
    assert!(Document::load_from_path(&path).is_err());
}

#[test]
fn scene_without_collections_links_every_object() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("flat.scene.json");
    fs::write(&path, r#"{"version":1,"objects":[{"name":"Cam","kind":"camera"},{"name":"Sun","kind":"light"}]}"#)
        .expect("write scene");
    let document = Document::load_from_path(&path).expect("load");
    assert_eq!(document.object_count(), 2);
    assert_eq!(document.active_collection().name, "Collection");
    assert!(document.mesh_object_names().is_empty());
}
