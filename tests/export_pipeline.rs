//! Mesh export behavior: request/supersede/clear semantics, the loading
//! flag, failure reporting and the full draw-then-export path.

mod common;

use std::sync::Arc;

use common::{
    advance, advance_until, captured, extent, harness, harness_with_provider, phase, pt,
    selection, test_model, GatedProvider,
};
use scene_export_tools::selection::{
    BeginSelection, DeleteSelection, SelectionConfig, SelectionPhase,
};
use scene_export_tools::surface::PointerEvent;
use scene_export_tools::{ClearExport, MeshExport, RequestExport};

fn export_state(app: &bevy::prelude::App) -> &MeshExport {
    app.world().resource::<MeshExport>()
}

#[test]
fn export_produces_a_glb_file_with_its_size() {
    let mut h = harness();
    h.app.world_mut().send_event(RequestExport {
        extent: extent(0.0, 0.0, 10.0, 10.0),
    });
    advance_until(&mut h.app, "export file", |app| {
        export_state(app).file.is_some()
    });

    let export = export_state(&h.app);
    assert!(!export.loading);
    assert!(!export.in_flight());
    let file = export.file.as_ref().expect("file bytes");
    assert_eq!(export.size_bytes, Some(file.len()));
    assert_eq!(&file[0..4], b"glTF");

    // 10m x 10m at 1m resolution grids to 11x11 vertices.
    let mesh = export.mesh.as_ref().expect("mesh");
    assert_eq!(mesh.vertex_count(), 121);
    assert_eq!(mesh.anchor.x, 0.0);
    assert_eq!(mesh.anchor.y, 0.0);
}

#[test]
fn loading_spans_the_whole_build_window() {
    let provider = Arc::new(GatedProvider::new(test_model()));
    let mut h = harness_with_provider(provider.clone());
    provider.hold();

    h.app.world_mut().send_event(RequestExport {
        extent: extent(0.0, 0.0, 10.0, 10.0),
    });
    advance_until(&mut h.app, "loading flag", |app| export_state(app).loading);
    assert!(export_state(&h.app).in_flight());
    assert_eq!(export_state(&h.app).size_bytes, None);
    assert!(export_state(&h.app).file.is_none());

    provider.release();
    advance_until(&mut h.app, "export settles", |app| {
        let export = export_state(app);
        export.file.is_some() && !export.loading
    });
}

#[test]
fn new_requests_supersede_in_flight_builds() {
    let provider = Arc::new(GatedProvider::new(test_model()));
    let mut h = harness_with_provider(provider.clone());
    provider.hold();

    let first = extent(0.0, 0.0, 10.0, 10.0);
    let second = extent(5.0, 5.0, 25.0, 20.0);
    h.app.world_mut().send_event(RequestExport { extent: first });
    advance_until(&mut h.app, "first build starts", |_| {
        provider.build_count() == 1
    });
    h.app.world_mut().send_event(RequestExport { extent: second });
    advance_until(&mut h.app, "second build starts", |_| {
        provider.build_count() == 2
    });

    provider.release();
    advance_until(&mut h.app, "export settles", |app| {
        export_state(app).file.is_some()
    });

    assert_eq!(provider.built_extents(), vec![first, second]);
    let export = export_state(&h.app);
    let mesh = export.mesh.as_ref().expect("mesh");
    assert_eq!(mesh.anchor.x, 5.0);
    assert_eq!(mesh.anchor.y, 5.0);
    // The superseded build never surfaces, as a result or as an error.
    assert!(captured(&h.app).export_errors.is_empty());
}

#[test]
fn clear_after_success_resets_everything() {
    let mut h = harness();
    h.app.world_mut().send_event(RequestExport {
        extent: extent(0.0, 0.0, 10.0, 10.0),
    });
    advance_until(&mut h.app, "export file", |app| {
        export_state(app).file.is_some()
    });

    h.app.world_mut().send_event(ClearExport);
    advance_until(&mut h.app, "export cleared", |app| {
        export_state(app).file.is_none()
    });
    let export = export_state(&h.app);
    assert!(!export.loading);
    assert_eq!(export.size_bytes, None);
    assert!(export.mesh.is_none());
}

#[test]
fn clear_cancels_in_flight_builds_silently() {
    let provider = Arc::new(GatedProvider::new(test_model()));
    let mut h = harness_with_provider(provider.clone());
    provider.hold();

    h.app.world_mut().send_event(RequestExport {
        extent: extent(0.0, 0.0, 10.0, 10.0),
    });
    advance_until(&mut h.app, "loading flag", |app| export_state(app).loading);

    h.app.world_mut().send_event(ClearExport);
    advance_until(&mut h.app, "export cleared", |app| {
        !export_state(app).loading
    });

    // Even after the gate opens, the cancelled build never lands.
    provider.release();
    advance(&mut h.app, 20);
    let export = export_state(&h.app);
    assert!(export.file.is_none());
    assert!(export.mesh.is_none());
    assert_eq!(export.size_bytes, None);
    assert!(captured(&h.app).export_errors.is_empty());
}

#[test]
fn build_failures_surface_an_export_error() {
    let provider = Arc::new(GatedProvider::new(test_model()));
    let mut h = harness_with_provider(provider.clone());
    provider.fail_next_build();

    h.app.world_mut().send_event(RequestExport {
        extent: extent(0.0, 0.0, 10.0, 10.0),
    });
    advance_until(&mut h.app, "export error", |app| {
        !captured(app).export_errors.is_empty()
    });

    let errors = captured(&h.app).export_errors;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("synthetic build failure"));
    let export = export_state(&h.app);
    assert!(!export.loading);
    assert!(export.file.is_none());
    assert_eq!(export.size_bytes, None);
}

#[test]
fn drawn_selection_exports_end_to_end() {
    let mut h = harness();
    h.app
        .world_mut()
        .resource_mut::<SelectionConfig>()
        .reshape_after_creation = false;

    h.app.world_mut().send_event(BeginSelection);
    advance_until(&mut h.app, "origin placement", |app| {
        phase(app) == SelectionPhase::PlacingOrigin
    });
    h.feed.push_pointer(PointerEvent::Clicked(pt(2.0, 2.0)));
    advance_until(&mut h.app, "terminal placement", |app| {
        phase(app) == SelectionPhase::PlacingTerminal
    });
    h.feed.push_pointer(PointerEvent::Moved(pt(12.0, 12.0)));
    h.feed.push_pointer(PointerEvent::Clicked(pt(12.0, 12.0)));
    advance_until(&mut h.app, "idle rectangle", |app| {
        phase(app) == SelectionPhase::Idle
    });

    let polygon = selection(&h.app).polygon.expect("rectangle exists");
    h.app.world_mut().send_event(RequestExport {
        extent: polygon.extent(),
    });
    advance_until(&mut h.app, "export file", |app| {
        export_state(app).file.is_some()
    });

    let export = export_state(&h.app);
    let mesh = export.mesh.as_ref().expect("mesh");
    assert_eq!(mesh.anchor.x, 2.0);
    assert_eq!(mesh.anchor.y, 2.0);
    assert!(mesh.triangle_count() > 0);
    let file = export.file.as_ref().expect("file bytes");
    assert_eq!(&file[0..4], b"glTF");
    assert_eq!(u32::from_le_bytes([file[8], file[9], file[10], file[11]]) as usize, file.len());

    // Deleting the selection does not touch the export; the host clears it.
    h.app.world_mut().send_event(DeleteSelection);
    advance_until(&mut h.app, "selection deleted", |app| {
        phase(app) == SelectionPhase::NonExistent
    });
    assert!(export_state(&h.app).file.is_some());
}
