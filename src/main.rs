use std::sync::Arc;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use scene_export_tools::constants::EXPORT_MEDIA_TYPE;
use scene_export_tools::geometry::{ScenePoint, SpatialReference};
use scene_export_tools::procedural::{ProceduralScene, ScriptedSurface};
use scene_export_tools::selection::{
    BeginSelection, BindSurface, DeleteSelection, ElevationQuery, FeatureQuery, FinishReshape,
    SelectionContext, SelectionError, SelectionPhase,
};
use scene_export_tools::surface::{GestureEvent, PointerEvent};
use scene_export_tools::{
    EditingSurface, ExportError, MeshExport, MeshExportPlugin, RequestExport, SceneServices,
    SelectionPlugin, SelectionQueriesPlugin, SurfaceFeed, SurfacePlugin,
};

/// Synthetic town used by the demo: gentle relief with a few buildings
/// and trees scattered around the selection area.
const DEMO_MANIFEST: &str = r#"{
    "extent": { "xmin": -50.0, "ymin": -50.0, "xmax": 150.0, "ymax": 150.0,
                "spatial_reference": { "wkid": 3857 } },
    "base_elevation": 12.0,
    "relief_amplitude": 4.0,
    "relief_period": 35.0,
    "grid_resolution": 2.0,
    "features": [
        { "id": 1, "class": "building",
          "footprint": { "xmin": 30.0, "ymin": 40.0, "xmax": 42.0, "ymax": 52.0,
                         "spatial_reference": { "wkid": 3857 } } },
        { "id": 2, "class": "building",
          "footprint": { "xmin": 55.0, "ymin": 58.0, "xmax": 70.0, "ymax": 68.0,
                         "spatial_reference": { "wkid": 3857 } } },
        { "id": 3, "class": "building",
          "footprint": { "xmin": 110.0, "ymin": 110.0, "xmax": 120.0, "ymax": 118.0,
                         "spatial_reference": { "wkid": 3857 } } },
        { "id": 4, "class": "tree",
          "footprint": { "xmin": 25.0, "ymin": 60.0, "xmax": 27.0, "ymax": 62.0,
                         "spatial_reference": { "wkid": 3857 } } }
    ]
}"#;

/// Scripted walkthrough state: which step runs next and how many frames to
/// wait before it.
#[derive(Resource, Default)]
struct DemoScript {
    stage: usize,
    settle: u32,
    feed: Option<SurfaceFeed>,
}

fn main() {
    println!("Scene export demo starting");
    create_app().run();
}

/// Build the headless demo app around the procedural scene backend.
fn create_app() -> App {
    let provider =
        ProceduralScene::from_json(DEMO_MANIFEST).expect("demo terrain manifest is valid");

    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(2))),
    )
    .add_plugins(LogPlugin::default())
    .add_plugins(StatesPlugin)
    .add_plugins((
        SurfacePlugin,
        SelectionPlugin,
        SelectionQueriesPlugin,
        MeshExportPlugin,
    ))
    .insert_resource(SceneServices::new(Arc::new(provider)))
    .init_resource::<DemoScript>()
    .add_systems(Startup, bind_demo_surface)
    .add_systems(Update, (drive_demo_script, report_errors));
    app
}

fn bind_demo_surface(mut script: ResMut<DemoScript>, mut binds: EventWriter<BindSurface>) {
    let feed = SurfaceFeed::default();
    let surface: Arc<dyn EditingSurface> = Arc::new(ScriptedSurface::new(feed.clone()));
    script.feed = Some(feed.clone());
    binds.write(BindSurface { surface, feed });
}

/// Walk the whole lifecycle: draw a rectangle, drag a corner, finish the
/// edit, report queries, export the mesh and delete the selection.
fn drive_demo_script(
    mut script: ResMut<DemoScript>,
    phase: Res<State<SelectionPhase>>,
    context: Res<SelectionContext>,
    features: Res<FeatureQuery>,
    elevation: Res<ElevationQuery>,
    export: Res<MeshExport>,
    mut begin: EventWriter<BeginSelection>,
    mut finish: EventWriter<FinishReshape>,
    mut delete: EventWriter<DeleteSelection>,
    mut export_requests: EventWriter<RequestExport>,
    mut exit: EventWriter<AppExit>,
) {
    if script.settle > 0 {
        script.settle -= 1;
        return;
    }
    match script.stage {
        0 => {
            if *phase.get() != SelectionPhase::NonExistent {
                return;
            }
            println!("Surface bound, starting a selection");
            begin.write(BeginSelection);
            script.stage = 1;
        }
        1 => {
            if *phase.get() != SelectionPhase::PlacingOrigin {
                return;
            }
            let Some(feed) = script.feed.clone() else {
                return;
            };
            feed.push_pointer(PointerEvent::Clicked(demo_point(20.0, 30.0)));
            script.stage = 2;
            script.settle = 2;
        }
        2 => {
            if *phase.get() != SelectionPhase::PlacingTerminal {
                return;
            }
            let Some(feed) = script.feed.clone() else {
                return;
            };
            feed.push_pointer(PointerEvent::Moved(demo_point(60.0, 55.0)));
            feed.push_pointer(PointerEvent::Moved(demo_point(80.0, 70.0)));
            feed.push_pointer(PointerEvent::Clicked(demo_point(80.0, 70.0)));
            script.stage = 3;
            script.settle = 2;
        }
        3 => {
            if *phase.get() != SelectionPhase::Reshaping {
                return;
            }
            let (Some(feed), Some(polygon)) = (script.feed.clone(), context.polygon.clone())
            else {
                return;
            };
            let bounds = polygon.extent();
            println!(
                "Selection created, {:.0}m x {:.0}m, dragging a corner",
                bounds.width(),
                bounds.height()
            );
            let mut dragged = polygon;
            if let Some(corner) = dragged.ring.get_mut(2) {
                *corner = demo_point(95.0, 85.0);
            }
            feed.push_gesture(GestureEvent::Changed(dragged));
            script.stage = 4;
            script.settle = 3;
        }
        4 => {
            if *phase.get() != SelectionPhase::Reshaping {
                return;
            }
            finish.write(FinishReshape);
            script.stage = 5;
        }
        5 => {
            if *phase.get() != SelectionPhase::Idle {
                return;
            }
            let Some(set) = &features.result else {
                return;
            };
            let (Some(anchor), Some(profile)) = (&elevation.anchor, &elevation.profile) else {
                return;
            };
            let Some(polygon) = &context.polygon else {
                return;
            };
            let buildings = set
                .features
                .iter()
                .filter(|feature| feature.class == "building")
                .count();
            println!(
                "Features inside selection: {} total, {} buildings",
                set.features.len(),
                buildings
            );
            println!(
                "Anchor elevation {:.2} m, corner profile {:.2} m to {:.2} m",
                anchor.elevation, profile.min_elevation, profile.max_elevation
            );
            export_requests.write(RequestExport {
                extent: polygon.extent(),
            });
            script.stage = 6;
        }
        6 => {
            if export.loading {
                return;
            }
            let Some(file) = &export.file else {
                return;
            };
            let path = std::env::temp_dir().join("scene-export-demo.glb");
            match std::fs::write(&path, file) {
                Ok(()) => println!(
                    "Wrote {} ({} bytes, {})",
                    path.display(),
                    file.len(),
                    EXPORT_MEDIA_TYPE
                ),
                Err(err) => eprintln!("Failed to write export file: {err}"),
            }
            delete.write(DeleteSelection);
            script.stage = 7;
        }
        7 => {
            if *phase.get() != SelectionPhase::NonExistent {
                return;
            }
            println!("Selection deleted, demo complete");
            exit.write(AppExit::Success);
            script.stage = 8;
        }
        _ => {}
    }
}

fn report_errors(
    mut selection_errors: EventReader<SelectionError>,
    mut export_errors: EventReader<ExportError>,
) {
    for error in selection_errors.read() {
        warn!("Selection error ({:?}): {}", error.kind, error.message);
    }
    for error in export_errors.read() {
        warn!("Export error: {}", error.message);
    }
}

fn demo_point(x: f64, y: f64) -> ScenePoint {
    ScenePoint::new(x, y, SpatialReference::default())
}
