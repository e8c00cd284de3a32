pub mod config;
pub mod document;
pub mod ecosystem;
pub mod file_browser;
pub mod host;
pub mod material_registry;
pub mod mesh;
pub mod mesh_registry;
mod naming;
pub mod operators;
pub mod panels;
pub mod plugins;
pub mod properties;
pub mod reports;
pub mod scene;

pub use ecosystem::EcosystemPlugin;
pub use host::EditorHost;
