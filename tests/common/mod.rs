//! Shared harness for the integration suites: a headless app with every
//! plugin installed, a scripted surface bound, and helpers for driving
//! frames until the machine or its tasks settle.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use bevy::tasks::futures_lite::future;

use scene_export_tools::geometry::{SceneExtent, ScenePoint, ScenePolygon, SpatialReference};
use scene_export_tools::procedural::{ProceduralScene, ScriptedSurface, TerrainModel};
use scene_export_tools::scene::{
    ElevationSample, FeatureSet, SceneError, SceneFeature, SceneMesh, SceneProvider,
};
use scene_export_tools::selection::{
    BindSurface, SelectionChanged, SelectionContext, SelectionError, SelectionPhase,
};
use scene_export_tools::{
    EditingSurface, ExportError, MeshExportPlugin, SceneServices, SelectionPlugin,
    SelectionQueriesPlugin, SurfaceFeed, SurfacePlugin,
};

pub fn sr() -> SpatialReference {
    SpatialReference::default()
}

pub fn pt(x: f64, y: f64) -> ScenePoint {
    ScenePoint::new(x, y, sr())
}

pub fn extent(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> SceneExtent {
    SceneExtent {
        xmin,
        ymin,
        xmax,
        ymax,
        spatial_reference: sr(),
    }
}

/// Flat-ish terrain with one building and one tree near the origin.
pub fn test_model() -> TerrainModel {
    TerrainModel {
        extent: extent(-200.0, -200.0, 200.0, 200.0),
        base_elevation: 10.0,
        relief_amplitude: 2.0,
        relief_period: 40.0,
        grid_resolution: 1.0,
        features: vec![
            SceneFeature {
                id: 1,
                class: "building".into(),
                footprint: extent(2.0, 2.0, 6.0, 6.0),
            },
            SceneFeature {
                id: 2,
                class: "tree".into(),
                footprint: extent(8.0, 8.0, 9.0, 9.0),
            },
        ],
    }
}

/// Host-facing events accumulated every frame so assertions are not racing
/// event expiry.
#[derive(Resource, Default, Clone)]
pub struct Captured {
    pub selection_changes: Vec<Option<ScenePolygon>>,
    pub selection_errors: Vec<SelectionError>,
    pub export_errors: Vec<String>,
}

fn capture_outbound(
    mut captured: ResMut<Captured>,
    mut changes: EventReader<SelectionChanged>,
    mut errors: EventReader<SelectionError>,
    mut export_errors: EventReader<ExportError>,
) {
    for change in changes.read() {
        captured.selection_changes.push(change.polygon.clone());
    }
    for error in errors.read() {
        captured.selection_errors.push(error.clone());
    }
    for error in export_errors.read() {
        captured.export_errors.push(error.message.clone());
    }
}

pub struct TestHarness {
    pub app: App,
    pub feed: SurfaceFeed,
    pub surface: Arc<ScriptedSurface>,
}

/// App with all plugins and the procedural test scene, no surface bound.
pub fn unbound_app(provider: Arc<dyn SceneProvider>) -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, StatesPlugin))
        .add_plugins((
            SurfacePlugin,
            SelectionPlugin,
            SelectionQueriesPlugin,
            MeshExportPlugin,
        ))
        .init_resource::<Captured>()
        .add_systems(Update, capture_outbound)
        .insert_resource(SceneServices::new(provider));
    app
}

pub fn harness() -> TestHarness {
    harness_with_provider(Arc::new(ProceduralScene::new(test_model())))
}

pub fn harness_with_provider(provider: Arc<dyn SceneProvider>) -> TestHarness {
    let mut app = unbound_app(provider);
    let feed = SurfaceFeed::default();
    let surface = Arc::new(ScriptedSurface::new(feed.clone()));
    let bound: Arc<dyn EditingSurface> = surface.clone();
    app.world_mut().send_event(BindSurface {
        surface: bound,
        feed: feed.clone(),
    });
    advance(&mut app, 3);
    TestHarness { app, feed, surface }
}

pub fn advance(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

/// Update until `predicate` holds, sleeping a moment between frames so
/// background task threads get scheduled. Panics after a few seconds.
pub fn advance_until(app: &mut App, what: &str, mut predicate: impl FnMut(&App) -> bool) {
    for _ in 0..5000 {
        if predicate(app) {
            return;
        }
        app.update();
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("timed out waiting for {what}");
}

pub fn phase(app: &App) -> SelectionPhase {
    *app.world().resource::<State<SelectionPhase>>().get()
}

pub fn selection(app: &App) -> SelectionContext {
    app.world().resource::<SelectionContext>().clone()
}

pub fn captured(app: &App) -> Captured {
    app.world().resource::<Captured>().clone()
}

/// Provider wrapper for export concurrency tests. Builds delegate to the
/// procedural scene but can be held at a gate, told to fail once, and are
/// recorded along with the extent they were asked for.
pub struct GatedProvider {
    inner: ProceduralScene,
    release: AtomicBool,
    fail_next: AtomicBool,
    builds: AtomicUsize,
    built_extents: Mutex<Vec<SceneExtent>>,
}

impl GatedProvider {
    pub fn new(model: TerrainModel) -> Self {
        Self {
            inner: ProceduralScene::new(model),
            release: AtomicBool::new(true),
            fail_next: AtomicBool::new(false),
            builds: AtomicUsize::new(0),
            built_extents: Mutex::new(Vec::new()),
        }
    }

    /// Block builds at the gate until `release` is called.
    pub fn hold(&self) {
        self.release.store(false, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.release.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_build(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn built_extents(&self) -> Vec<SceneExtent> {
        self.built_extents
            .lock()
            .map(|extents| extents.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SceneProvider for GatedProvider {
    fn point_in_polygon(&self, polygon: &ScenePolygon, point: &ScenePoint) -> bool {
        self.inner.point_in_polygon(polygon, point)
    }

    fn align_polygon(&self, next: &ScenePolygon, previous: &ScenePolygon) -> ScenePolygon {
        self.inner.align_polygon(next, previous)
    }

    async fn query_features(&self, region: &ScenePolygon) -> Result<FeatureSet, SceneError> {
        self.inner.query_features(region).await
    }

    async fn sample_elevation(&self, point: &ScenePoint) -> Result<ElevationSample, SceneError> {
        self.inner.sample_elevation(point).await
    }

    async fn build_mesh(&self, extent: &SceneExtent) -> Result<SceneMesh, SceneError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut extents) = self.built_extents.lock() {
            extents.push(*extent);
        }
        while !self.release.load(Ordering::SeqCst) {
            future::yield_now().await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SceneError::MeshBuild("synthetic build failure".into()));
        }
        self.inner.build_mesh(extent).await
    }

    async fn serialize_mesh(&self, mesh: &SceneMesh) -> Result<Vec<u8>, SceneError> {
        self.inner.serialize_mesh(mesh).await
    }
}
