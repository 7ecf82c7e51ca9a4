//! Contract between the toolkit and the geometry/scene engine that hosts it.
//!
//! The toolkit never computes containment, alignment, feature queries,
//! elevation or meshes itself; the host hands in a [`SceneProvider`] and the
//! selection/export systems call through it. Async operations are cancelled
//! by dropping the task that awaits them.

use std::sync::Arc;

use async_trait::async_trait;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{SceneExtent, ScenePoint, ScenePolygon};

/// Failure of a scene-engine operation. Cancellation is not an error: a
/// cancelled operation simply never reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("feature query failed: {0}")]
    FeatureQuery(String),
    #[error("elevation query failed: {0}")]
    Elevation(String),
    #[error("mesh construction failed: {0}")]
    MeshBuild(String),
    #[error("mesh serialization failed: {0}")]
    MeshSerialize(String),
}

/// A scene feature intersecting the selection region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFeature {
    pub id: u64,
    pub class: String,
    pub footprint: SceneExtent,
}

/// Result of a feature query: the intersecting features plus the combined,
/// buffer-smoothed building footprint when the provider can produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub features: Vec<SceneFeature>,
    pub footprint: Option<ScenePolygon>,
}

impl FeatureSet {
    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
            footprint: None,
        }
    }
}

/// Ground elevation sampled at a single position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationSample {
    pub position: ScenePoint,
    pub elevation: f64,
    /// Resolution of the elevation model the sample was read from.
    pub resolution: f64,
}

/// Elevation sampled at the four rectangle corners, ring-slot order
/// (origin, origin/terminal mix, terminal, terminal/origin mix).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationProfile {
    pub corners: [ElevationSample; 4],
    pub min_elevation: f64,
    pub max_elevation: f64,
}

impl ElevationProfile {
    pub fn from_corners(corners: [ElevationSample; 4]) -> Self {
        let mut min_elevation = f64::INFINITY;
        let mut max_elevation = f64::NEG_INFINITY;
        for sample in &corners {
            min_elevation = min_elevation.min(sample.elevation);
            max_elevation = max_elevation.max(sample.elevation);
        }
        Self {
            corners,
            min_elevation,
            max_elevation,
        }
    }
}

/// Terrain mesh built for an export extent. Positions are metres relative
/// to `anchor`; triangles are indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMesh {
    pub anchor: ScenePoint,
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl SceneMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Capabilities the host's geometry/scene engine must supply.
///
/// Synchronous methods are cheap geometry predicates; asynchronous methods
/// may hit the network or heavy compute and must tolerate being dropped
/// mid-flight (the toolkit's cancellation model).
#[async_trait]
pub trait SceneProvider: Send + Sync {
    /// Containment test used by the click-to-reselect watcher.
    fn point_in_polygon(&self, polygon: &ScenePolygon, point: &ScenePoint) -> bool;

    /// Normalize a mid-drag ring so that slots 0 and 2 are the updated
    /// origin/terminal corners of an axis-aligned rectangle.
    fn align_polygon(&self, next: &ScenePolygon, previous: &ScenePolygon) -> ScenePolygon;

    /// Find scene features intersecting the region.
    async fn query_features(&self, region: &ScenePolygon) -> Result<FeatureSet, SceneError>;

    /// Sample ground elevation at a position.
    async fn sample_elevation(&self, point: &ScenePoint) -> Result<ElevationSample, SceneError>;

    /// Build the terrain/building mesh covering an extent.
    async fn build_mesh(&self, extent: &SceneExtent) -> Result<SceneMesh, SceneError>;

    /// Serialize a built mesh into its binary file form.
    async fn serialize_mesh(&self, mesh: &SceneMesh) -> Result<Vec<u8>, SceneError>;
}

/// Handle to the host-supplied scene engine, inserted before the toolkit
/// plugins run.
#[derive(Resource, Clone)]
pub struct SceneServices {
    pub provider: Arc<dyn SceneProvider>,
}

impl SceneServices {
    pub fn new(provider: Arc<dyn SceneProvider>) -> Self {
        Self { provider }
    }
}
