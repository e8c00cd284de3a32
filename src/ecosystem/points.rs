use glam::Vec3;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// One labeled point from the input file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PointRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub label: i64,
}

impl PointRecord {
    pub fn location(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Error)]
pub enum PointsError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

pub fn parse_points(bytes: &[u8]) -> Result<Vec<PointRecord>, PointsError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn load_points(path: &Path) -> Result<Vec<PointRecord>, PointsError> {
    let bytes = fs::read(path)?;
    parse_points(&bytes)
}
