//! Selection lifecycle and mesh export for 3D geospatial scenes.
//!
//! The host application owns the scene, the camera and the actual editing
//! surface; this crate owns the workflow. It drives one axis-aligned
//! rectangular selection through draw, edit, repick and delete on a
//! surface the host binds at runtime, keeps feature and elevation queries
//! pointed at the current geometry, and exports the enclosed terrain as a
//! binary glTF mesh through a supersede-on-rerequest build pipeline.
//!
//! Scene access goes through the [`scene::SceneProvider`] trait; the
//! [`procedural`] module ships a synthetic implementation used by the demo
//! binary and the test suites.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bevy::prelude::*;
//! use bevy::state::app::StatesPlugin;
//!
//! use scene_export_tools::procedural::{ProceduralScene, ScriptedSurface};
//! use scene_export_tools::selection::BindSurface;
//! use scene_export_tools::{
//!     EditingSurface, MeshExportPlugin, SceneServices, SelectionPlugin, SelectionQueriesPlugin,
//!     SurfaceFeed, SurfacePlugin,
//! };
//!
//! let manifest = r#"{
//!     "extent": { "xmin": -100, "ymin": -100, "xmax": 100, "ymax": 100,
//!                 "spatial_reference": { "wkid": 3857 } },
//!     "base_elevation": 10, "relief_amplitude": 3, "relief_period": 25,
//!     "grid_resolution": 1, "features": []
//! }"#;
//! let provider = Arc::new(ProceduralScene::from_json(manifest).expect("valid manifest"));
//! let feed = SurfaceFeed::default();
//! let surface: Arc<dyn EditingSurface> = Arc::new(ScriptedSurface::new(feed.clone()));
//!
//! let mut app = App::new();
//! app.add_plugins((MinimalPlugins, StatesPlugin))
//!     .add_plugins((
//!         SurfacePlugin,
//!         SelectionPlugin,
//!         SelectionQueriesPlugin,
//!         MeshExportPlugin,
//!     ))
//!     .insert_resource(SceneServices::new(provider));
//! app.world_mut().send_event(BindSurface { surface, feed });
//! app.run();
//! ```

pub mod constants;
pub mod export;
pub mod geometry;
pub mod procedural;
pub mod scene;
pub mod selection;
pub mod surface;

pub use export::{ClearExport, ExportError, MeshExport, MeshExportPlugin, RequestExport};
pub use scene::{SceneProvider, SceneServices};
pub use selection::{SelectionPlugin, SelectionQueriesPlugin};
pub use surface::{EditingSurface, SurfaceFeed, SurfacePlugin};
