use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use std::path::Path;

/// Geometry plus the ordered material slot list of one mesh datablock.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub materials: Vec<String>,
}

impl MeshData {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { positions, indices, materials: Vec::new() }
    }

    pub fn with_materials(mut self, materials: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.materials = materials.into_iter().map(Into::into).collect();
        self
    }

    pub fn cube(size: f32) -> Self {
        let hs = size * 0.5;
        let positions = vec![
            Vec3::new(-hs, -hs, -hs),
            Vec3::new(hs, -hs, -hs),
            Vec3::new(hs, hs, -hs),
            Vec3::new(-hs, hs, -hs),
            Vec3::new(-hs, -hs, hs),
            Vec3::new(hs, -hs, hs),
            Vec3::new(hs, hs, hs),
            Vec3::new(-hs, hs, hs),
        ];
        let faces: [[u32; 4]; 6] = [
            [0, 3, 2, 1], // back
            [4, 5, 6, 7], // front
            [0, 4, 7, 3], // left
            [1, 2, 6, 5], // right
            [3, 7, 6, 2], // top
            [0, 1, 5, 4], // bottom
        ];
        let mut indices = Vec::with_capacity(36);
        for [a, b, c, d] in faces {
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
        Self::new(positions, indices)
    }

    /// Loads the first mesh of a glTF file. Material slots take the glTF material names of its
    /// primitives, in primitive order, skipping duplicates.
    pub fn load_gltf(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let (document, buffers, _images) = gltf::import(path_ref)
            .with_context(|| format!("Failed to import glTF from {}", path_ref.display()))?;
        let mesh =
            document.meshes().next().ok_or_else(|| anyhow!("No meshes found in {}", path_ref.display()))?;

        let mut positions = Vec::new();
        let mut indices = Vec::new();
        let mut materials: Vec<String> = Vec::new();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let base = positions.len() as u32;
            let prim_positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or_else(|| anyhow!("Primitive without positions in {}", path_ref.display()))?
                .map(Vec3::from_array)
                .collect();
            match reader.read_indices() {
                Some(read) => indices.extend(read.into_u32().map(|i| i + base)),
                None => indices.extend(base..base + prim_positions.len() as u32),
            }
            positions.extend(prim_positions);
            if let Some(name) = primitive.material().name() {
                if !materials.iter().any(|existing| existing == name) {
                    materials.push(name.to_string());
                }
            }
        }
        Ok(Self::new(positions, indices).with_materials(materials))
    }
}
