//! Asynchronous mesh export. The supervisor owns at most one build task
//! for the integration-mesh of a region extent; re-requesting supersedes
//! the running build and only the newest result can land.

pub mod glb;

use bevy::prelude::*;
use bevy::tasks::futures_lite::future;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task};

use crate::geometry::SceneExtent;
use crate::scene::{SceneError, SceneMesh, SceneServices};

/// Export supervisor plugin. Independent of the selection machine; the
/// host forwards whatever extent it wants exported.
pub struct MeshExportPlugin;

impl Plugin for MeshExportPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<RequestExport>()
            .add_event::<ClearExport>()
            .add_event::<ExportError>()
            .init_resource::<MeshExport>()
            .add_systems(
                Update,
                (handle_export_requests, handle_clear_requests, poll_export).chain(),
            );
    }
}

/// Start (or restart) a mesh export for the given region extent.
#[derive(Event, Debug, Clone)]
pub struct RequestExport {
    pub extent: SceneExtent,
}

/// Drop any in-flight build and wipe all export output.
#[derive(Event, Debug, Clone, Copy)]
pub struct ClearExport;

/// A build or serialization failure for an export that was still current.
#[derive(Event, Debug, Clone)]
pub struct ExportError {
    pub message: String,
}

struct ExportPayload {
    mesh: SceneMesh,
    file: Vec<u8>,
}

/// Current export output. `loading` covers the window from request to
/// settled result; `size_bytes` is cleared on every new request while the
/// previous mesh and file stay readable until the replacement lands.
#[derive(Resource, Default)]
pub struct MeshExport {
    pub loading: bool,
    pub size_bytes: Option<usize>,
    pub mesh: Option<SceneMesh>,
    pub file: Option<Vec<u8>>,
    task: Option<Task<Result<ExportPayload, SceneError>>>,
}

impl MeshExport {
    pub fn in_flight(&self) -> bool {
        self.task.is_some()
    }
}

fn handle_export_requests(
    mut requests: EventReader<RequestExport>,
    services: Option<Res<SceneServices>>,
    mut export: ResMut<MeshExport>,
) {
    let Some(request) = requests.read().last() else {
        return;
    };
    let Some(services) = services else {
        warn!("Mesh export requested without scene services");
        return;
    };
    if export.task.is_some() {
        debug!("Superseding in-flight mesh export");
    }
    export.task = None;
    export.size_bytes = None;
    export.loading = true;

    let extent = request.extent;
    let provider = services.provider.clone();
    export.task = Some(AsyncComputeTaskPool::get().spawn(async move {
        let mesh = provider.build_mesh(&extent).await?;
        let file = provider.serialize_mesh(&mesh).await?;
        Ok(ExportPayload { mesh, file })
    }));
    info!(
        "Mesh export started for {:.1}m x {:.1}m region",
        extent.width(),
        extent.height()
    );
}

fn handle_clear_requests(mut requests: EventReader<ClearExport>, mut export: ResMut<MeshExport>) {
    if requests.is_empty() {
        return;
    }
    requests.clear();

    if export.task.is_some() {
        debug!("Cancelling in-flight mesh export");
    }
    *export = MeshExport::default();
}

fn poll_export(mut export: ResMut<MeshExport>, mut errors: EventWriter<ExportError>) {
    let Some(task) = export.task.as_mut() else {
        return;
    };
    let Some(result) = block_on(future::poll_once(task)) else {
        return;
    };
    export.task = None;
    export.loading = false;
    match result {
        Ok(payload) => {
            info!("Mesh export finished, {} bytes", payload.file.len());
            export.size_bytes = Some(payload.file.len());
            export.mesh = Some(payload.mesh);
            export.file = Some(payload.file);
        }
        Err(err) => {
            warn!("Mesh export failed: {err}");
            errors.write(ExportError {
                message: err.to_string(),
            });
        }
    }
}
