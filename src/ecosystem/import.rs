use super::points::{load_points, PointRecord, PointsError};
use super::settings::{base_object_items, EcosystemSettings};
use super::IMPORT_IDNAME;
use crate::config::ImporterConfig;
use crate::document::Document;
use crate::operators::{Operator, OperatorContext, OperatorStatus};
use anyhow::Result;
use bevy_ecs::prelude::Entity;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Error loading JSON from {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: PointsError,
    },
    #[error("Base model '{0}' not found")]
    MissingBase(String),
    /// Any other fault while editing the document. Not recovered locally.
    #[error(transparent)]
    Document(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub removed: usize,
    pub created: usize,
    pub tinted: usize,
}

/// Loads the points named by `settings` and rebuilds the instance set from them.
pub fn run_import(
    document: &mut Document,
    config: &ImporterConfig,
    settings: &EcosystemSettings,
) -> Result<ImportSummary, ImportError> {
    let path = document.resolve_path(&settings.json_path);
    let points = load_points(&path).map_err(|source| ImportError::Load { path: path.clone(), source })?;
    let candidates = base_object_items(document);
    let base_name = settings.effective_base(&candidates).unwrap_or_default().to_string();
    import_points(document, config, &base_name, &points)
}

/// Replaces every marker-tagged object in the active collection with one copy of `base_name` per
/// point, in point order. Nothing is touched when the base cannot be resolved.
///
/// A failure while creating instances leaves the ones already created in place.
pub fn import_points(
    document: &mut Document,
    config: &ImporterConfig,
    base_name: &str,
    points: &[PointRecord],
) -> Result<ImportSummary, ImportError> {
    let base = resolve_base(document, config, base_name)?;

    let stale: Vec<Entity> = document
        .active_collection()
        .objects()
        .iter()
        .copied()
        .filter(|&entity| is_instance(document, config, entity))
        .collect();
    let mut summary = ImportSummary { removed: stale.len(), ..ImportSummary::default() };
    document.remove_objects(&stale)?;

    for point in points {
        let instance = document.duplicate_object(base)?;
        if finish_instance(document, config, instance, point)? {
            summary.tinted += 1;
        }
        summary.created += 1;
    }

    eprintln!(
        "[ecosystem] removed {} stale instances, created {} ({} tinted) from '{base_name}'",
        summary.removed, summary.created, summary.tinted
    );
    Ok(summary)
}

/// Places, tags, tints and links a fresh copy. Returns whether it was tinted. A copy that fails
/// part way is discarded so no unlinked leftovers stay in the document.
fn finish_instance(
    document: &mut Document,
    config: &ImporterConfig,
    instance: Entity,
    point: &PointRecord,
) -> Result<bool> {
    let result = place_instance(document, config, instance, point);
    if result.is_err() {
        if let Err(err) = document.remove_object(instance) {
            eprintln!("[ecosystem] failed to discard partial instance {instance:?}: {err:#}");
        }
    }
    result
}

fn place_instance(
    document: &mut Document,
    config: &ImporterConfig,
    instance: Entity,
    point: &PointRecord,
) -> Result<bool> {
    document.set_location(instance, point.location())?;
    document.set_property(instance, &config.marker_attribute, true)?;
    let material = config.material_name(point.label);
    let tinted = document.materials.has(&material);
    if tinted {
        document.set_material_slots(instance, vec![material])?;
    }
    document.link_object(instance)?;
    Ok(tinted)
}

/// The base must be a scene object with mesh data that the cleanup pass will not delete.
fn resolve_base(document: &Document, config: &ImporterConfig, base_name: &str) -> Result<Entity, ImportError> {
    let missing = || ImportError::MissingBase(base_name.to_string());
    if base_name.is_empty() {
        return Err(missing());
    }
    let base = document.find_object(base_name).ok_or_else(missing)?;
    if document.mesh_key(base).is_none() || is_instance(document, config, base) {
        return Err(missing());
    }
    Ok(base)
}

fn is_instance(document: &Document, config: &ImporterConfig, entity: Entity) -> bool {
    document.property(entity, &config.marker_attribute).is_some_and(|value| value.is_truthy())
}

pub struct ImportEcosystemOperator {
    config: ImporterConfig,
}

impl ImportEcosystemOperator {
    pub fn new(config: ImporterConfig) -> Self {
        Self { config }
    }
}

impl Operator for ImportEcosystemOperator {
    fn idname(&self) -> &'static str {
        IMPORT_IDNAME
    }

    fn label(&self) -> &'static str {
        "Import Ecosystem"
    }

    fn icon(&self) -> Option<&'static str> {
        Some("IMPORT")
    }

    fn execute(&mut self, ctx: &mut OperatorContext<'_>) -> Result<OperatorStatus> {
        let settings = EcosystemSettings::load(ctx.document)?;
        match run_import(ctx.document, &self.config, &settings) {
            Ok(_) => {
                ctx.reports.info(IMPORT_IDNAME, "Ecosystem imported successfully");
                Ok(OperatorStatus::Finished)
            }
            Err(ImportError::Document(err)) => Err(err),
            Err(err) => {
                ctx.reports.error(IMPORT_IDNAME, err.to_string());
                Ok(OperatorStatus::Cancelled)
            }
        }
    }
}
