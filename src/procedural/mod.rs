//! Procedural scene backend. Serves a synthetic terrain described by a
//! small JSON manifest: a sinusoidal relief field plus a flat list of
//! classified features. Used by the demo binary and the test suites, and a
//! reference for wiring real scene services behind [`SceneProvider`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::FOOTPRINT_BUFFER;
use crate::constants::MAX_MESH_GRID;
use crate::export::glb;
use crate::geometry::{build_rectangle, SceneExtent, ScenePoint, ScenePolygon};
use crate::scene::{ElevationSample, FeatureSet, SceneError, SceneFeature, SceneMesh, SceneProvider};
use crate::surface::{EditingSurface, GestureEvent, SurfaceError, SurfaceFeed};

/// Feature class treated as a building when combining footprints.
const BUILDING_CLASS: &str = "building";

/// Manifest describing one synthetic terrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainModel {
    /// Region the model covers; exports outside it are rejected.
    pub extent: SceneExtent,
    pub base_elevation: f64,
    pub relief_amplitude: f64,
    pub relief_period: f64,
    /// Ground sampling distance of the synthetic elevation grid (metres).
    pub grid_resolution: f64,
    pub features: Vec<SceneFeature>,
}

/// Scene provider computing everything from a [`TerrainModel`].
pub struct ProceduralScene {
    model: TerrainModel,
}

impl ProceduralScene {
    pub fn new(model: TerrainModel) -> Self {
        Self { model }
    }

    pub fn from_json(manifest: &str) -> Result<Self, SceneError> {
        let model: TerrainModel = serde_json::from_str(manifest)
            .map_err(|err| SceneError::FeatureQuery(format!("invalid terrain manifest: {err}")))?;
        Ok(Self::new(model))
    }

    pub fn model(&self) -> &TerrainModel {
        &self.model
    }

    /// Synthetic elevation field: a smooth sinusoidal relief around the
    /// base elevation, defined everywhere.
    fn elevation_at(&self, x: f64, y: f64) -> f64 {
        let period = self.model.relief_period.max(1e-6);
        self.model.base_elevation
            + self.model.relief_amplitude * (x / period).sin() * (y / period).cos()
    }
}

#[async_trait]
impl SceneProvider for ProceduralScene {
    fn point_in_polygon(&self, polygon: &ScenePolygon, point: &ScenePoint) -> bool {
        let ring = &polygon.ring;
        let len = if polygon.is_closed() {
            ring.len() - 1
        } else {
            ring.len()
        };
        if len < 3 {
            return false;
        }
        // Even-odd ray cast along +x.
        let mut inside = false;
        let mut j = len - 1;
        for i in 0..len {
            let (a, b) = (&ring[i], &ring[j]);
            if (a.y > point.y) != (b.y > point.y) {
                let cross_x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
                if point.x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    fn align_polygon(&self, next: &ScenePolygon, previous: &ScenePolygon) -> ScenePolygon {
        let (Some(prev_origin), Some(prev_terminal)) = (previous.corner(0), previous.corner(2))
        else {
            return next.clone();
        };
        // Ring slots share coordinates with the defining corners: x of
        // slots 0 and 1 belongs to the origin, x of 2 and 3 to the
        // terminal; y of slots 0 and 3 to the origin, y of 1 and 2 to the
        // terminal. Fold every moved coordinate into its owner, then
        // rebuild the rectangle axis-aligned.
        let mut origin = (prev_origin.x, prev_origin.y);
        let mut terminal = (prev_terminal.x, prev_terminal.y);
        for slot in 0..4 {
            let (Some(moved), Some(fixed)) = (next.corner(slot), previous.corner(slot)) else {
                continue;
            };
            if moved.x != fixed.x {
                if slot < 2 {
                    origin.0 = moved.x;
                } else {
                    terminal.0 = moved.x;
                }
            }
            if moved.y != fixed.y {
                if slot == 0 || slot == 3 {
                    origin.1 = moved.y;
                } else {
                    terminal.1 = moved.y;
                }
            }
        }
        build_rectangle(
            prev_origin.moved_to(origin.0, origin.1),
            prev_terminal.moved_to(terminal.0, terminal.1),
        )
    }

    async fn query_features(&self, region: &ScenePolygon) -> Result<FeatureSet, SceneError> {
        if region.ring.len() < 3 {
            return Err(SceneError::FeatureQuery(
                "query region has no interior".into(),
            ));
        }
        let extent = region.extent();
        let features: Vec<SceneFeature> = self
            .model
            .features
            .iter()
            .filter(|feature| feature.footprint.intersects(&extent))
            .cloned()
            .collect();
        let footprint = combined_footprint(&features);
        Ok(FeatureSet {
            features,
            footprint,
        })
    }

    async fn sample_elevation(&self, point: &ScenePoint) -> Result<ElevationSample, SceneError> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(SceneError::Elevation("sample position is not finite".into()));
        }
        let elevation = self.elevation_at(point.x, point.y);
        Ok(ElevationSample {
            position: ScenePoint::with_z(point.x, point.y, elevation, point.spatial_reference),
            elevation,
            resolution: self.model.grid_resolution,
        })
    }

    async fn build_mesh(&self, extent: &SceneExtent) -> Result<SceneMesh, SceneError> {
        if !(extent.width() > 0.0 && extent.height() > 0.0) {
            return Err(SceneError::MeshBuild("export region has no area".into()));
        }
        if !extent.intersects(&self.model.extent) {
            return Err(SceneError::MeshBuild(
                "export region lies outside the modeled terrain".into(),
            ));
        }
        let step = self.model.grid_resolution.max(1e-6);
        let nx = ((extent.width() / step).ceil() as usize + 1).clamp(2, MAX_MESH_GRID);
        let ny = ((extent.height() / step).ceil() as usize + 1).clamp(2, MAX_MESH_GRID);

        // Positions are metres relative to the anchor at the minimum
        // corner, keeping f32 precision regardless of where on the globe
        // the region sits.
        let anchor_elevation = self.elevation_at(extent.xmin, extent.ymin);
        let anchor = ScenePoint::with_z(
            extent.xmin,
            extent.ymin,
            anchor_elevation,
            extent.spatial_reference,
        );
        let mut positions = Vec::with_capacity(nx * ny);
        for row in 0..ny {
            for col in 0..nx {
                let x = extent.xmin + extent.width() * col as f64 / (nx - 1) as f64;
                let y = extent.ymin + extent.height() * row as f64 / (ny - 1) as f64;
                let z = self.elevation_at(x, y);
                positions.push([
                    (x - anchor.x) as f32,
                    (y - anchor.y) as f32,
                    (z - anchor_elevation) as f32,
                ]);
            }
        }
        let mut indices = Vec::with_capacity((nx - 1) * (ny - 1) * 6);
        for row in 0..ny - 1 {
            for col in 0..nx - 1 {
                let a = (row * nx + col) as u32;
                let b = a + 1;
                let c = a + nx as u32;
                let d = c + 1;
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }
        Ok(SceneMesh {
            anchor,
            positions,
            indices,
        })
    }

    async fn serialize_mesh(&self, mesh: &SceneMesh) -> Result<Vec<u8>, SceneError> {
        glb::encode(mesh)
    }
}

/// Union of all building footprints in the set, buffered outward so thin
/// slivers between adjacent buildings close up. `None` when the set holds
/// no buildings.
fn combined_footprint(features: &[SceneFeature]) -> Option<ScenePolygon> {
    let mut union: Option<SceneExtent> = None;
    for feature in features {
        if feature.class != BUILDING_CLASS {
            continue;
        }
        union = Some(match union {
            Some(current) => current.union(&feature.footprint),
            None => feature.footprint,
        });
    }
    union.map(|extent| extent.buffered(FOOTPRINT_BUFFER).to_polygon())
}

/// Current gesture of a [`ScriptedSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Inactive,
    Placing,
    Reshaping,
}

/// Interaction counters recorded by a [`ScriptedSurface`].
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    pub placements_begun: usize,
    pub reshapes_begun: usize,
    pub finishes: usize,
    pub cancels: usize,
    pub overlay_clears: usize,
    /// Rectangle the most recent reshape gesture was started with.
    pub last_reshape_ring: Option<ScenePolygon>,
}

/// Editing surface driven from code instead of a pointer device. Input is
/// pushed into its feed by the caller; the surface itself only tracks
/// gesture state and echoes completion when a reshape is finished.
pub struct ScriptedSurface {
    feed: SurfaceFeed,
    state: Mutex<GesturePhase>,
    log: Mutex<SurfaceLog>,
    refuse_placement: AtomicBool,
    refuse_reshape: AtomicBool,
}

impl ScriptedSurface {
    pub fn new(feed: SurfaceFeed) -> Self {
        Self {
            feed,
            state: Mutex::new(GesturePhase::Inactive),
            log: Mutex::new(SurfaceLog::default()),
            refuse_placement: AtomicBool::new(false),
            refuse_reshape: AtomicBool::new(false),
        }
    }

    pub fn gesture_phase(&self) -> GesturePhase {
        self.state.lock().map(|state| *state).unwrap_or_default()
    }

    pub fn log(&self) -> SurfaceLog {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Make the next `begin_point_placement` fail once.
    pub fn refuse_next_placement(&self) {
        self.refuse_placement.store(true, Ordering::SeqCst);
    }

    /// Make the next `begin_reshape` fail once.
    pub fn refuse_next_reshape(&self) {
        self.refuse_reshape.store(true, Ordering::SeqCst);
    }

    fn set_phase(&self, phase: GesturePhase) {
        if let Ok(mut state) = self.state.lock() {
            *state = phase;
        }
    }
}

impl EditingSurface for ScriptedSurface {
    fn begin_point_placement(&self) -> Result<(), SurfaceError> {
        if self.refuse_placement.swap(false, Ordering::SeqCst) {
            return Err(SurfaceError("point placement unavailable".into()));
        }
        self.set_phase(GesturePhase::Placing);
        if let Ok(mut log) = self.log.lock() {
            log.placements_begun += 1;
        }
        Ok(())
    }

    fn begin_reshape(&self, polygon: &ScenePolygon) -> Result<(), SurfaceError> {
        if self.refuse_reshape.swap(false, Ordering::SeqCst) {
            return Err(SurfaceError("reshape unavailable".into()));
        }
        self.set_phase(GesturePhase::Reshaping);
        if let Ok(mut log) = self.log.lock() {
            log.reshapes_begun += 1;
            log.last_reshape_ring = Some(polygon.clone());
        }
        Ok(())
    }

    fn finish_gesture(&self) {
        let was_reshaping = self
            .state
            .lock()
            .map(|mut state| {
                let reshaping = *state == GesturePhase::Reshaping;
                *state = GesturePhase::Inactive;
                reshaping
            })
            .unwrap_or(false);
        if let Ok(mut log) = self.log.lock() {
            log.finishes += 1;
        }
        if was_reshaping {
            self.feed.push_gesture(GestureEvent::Completed);
        }
    }

    fn cancel_gesture(&self) {
        // Cancellation initiated by the machine is not echoed back into
        // the feed; the machine already knows.
        self.set_phase(GesturePhase::Inactive);
        if let Ok(mut log) = self.log.lock() {
            log.cancels += 1;
        }
    }

    fn clear_overlay(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.overlay_clears += 1;
        }
    }
}
