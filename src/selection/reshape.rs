//! Reshape sessions. While the machine is in its reshaping phase the bound
//! surface runs a vertex-edit gesture on the rectangle; every change is
//! re-aligned to axis-parallel form and folded back into the context.

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use crate::geometry::ScenePolygon;
use crate::scene::SceneServices;
use crate::surface::{ActiveSurface, GestureEvent};

use super::state::{
    AnchorChanged, FinishReshape, SelectionChanged, SelectionContext, SelectionError,
    SelectionErrorKind, SelectionGeometryChanged, SelectionPhase,
};

/// Live reshape session, spawned on entry to the reshaping phase with a
/// gesture cursor so stale gesture events are never replayed into it.
#[derive(Component)]
pub(crate) struct ReshapeSession {
    feed: EventCursor<GestureEvent>,
}

/// Entry action: hand the current rectangle to the surface for vertex
/// editing. Entering without a rectangle is a machine bug; recover to idle.
pub(crate) fn begin_reshape_session(
    mut commands: Commands,
    context: Res<SelectionContext>,
    surface: Option<Res<ActiveSurface>>,
    gesture_events: Res<Events<GestureEvent>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
    mut errors: EventWriter<SelectionError>,
) {
    let Some(active) = surface else {
        error!("Reshape entered without a bound surface");
        next_phase.set(SelectionPhase::Idle);
        return;
    };
    let Some(polygon) = context.polygon.clone() else {
        error!("Reshape entered without an existing rectangle");
        next_phase.set(SelectionPhase::Idle);
        return;
    };
    if let Err(err) = active.surface.begin_reshape(&polygon) {
        errors.write(SelectionError {
            kind: SelectionErrorKind::Update,
            message: err.to_string(),
        });
        next_phase.set(SelectionPhase::Idle);
        return;
    }
    commands.spawn(ReshapeSession {
        feed: gesture_events.get_cursor_current(),
    });
    debug!("Reshape gesture started");
}

/// Exit action: drop the session and abandon any gesture still running.
pub(crate) fn end_reshape_session(
    mut commands: Commands,
    sessions: Query<Entity, With<ReshapeSession>>,
    surface: Option<Res<ActiveSurface>>,
) {
    for entity in &sessions {
        commands.entity(entity).despawn();
    }
    if let Some(active) = surface {
        active.surface.cancel_gesture();
    }
}

/// Consume gesture events for the active session. Geometry changes update
/// the rectangle in place; completion and cancellation both settle to idle,
/// keeping whatever shape the last change produced.
pub(crate) fn drive_reshape(
    mut sessions: Query<&mut ReshapeSession>,
    gesture_events: Res<Events<GestureEvent>>,
    mut context: ResMut<SelectionContext>,
    services: Option<Res<SceneServices>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
    mut errors: EventWriter<SelectionError>,
    mut selection_changed: EventWriter<SelectionChanged>,
    mut geometry_changed: EventWriter<SelectionGeometryChanged>,
    mut anchor_changed: EventWriter<AnchorChanged>,
) {
    let Some(services) = services else {
        return;
    };
    let Ok(mut session) = sessions.single_mut() else {
        return;
    };
    for event in session.feed.read(&gesture_events) {
        match event {
            GestureEvent::Started => {}
            GestureEvent::Changed(ring) => {
                assign_polygon(
                    &mut context,
                    ring.clone(),
                    &*services,
                    &mut selection_changed,
                    &mut geometry_changed,
                    &mut anchor_changed,
                );
            }
            GestureEvent::Completed | GestureEvent::Cancelled => {
                next_phase.set(SelectionPhase::Idle);
                break;
            }
            // Vertex removal and deletion are routed through the gesture
            // watcher, which turns them into a delete request.
            GestureEvent::VertexRemoved | GestureEvent::Deleted => {}
            GestureEvent::Failed { message } => {
                errors.write(SelectionError {
                    kind: SelectionErrorKind::Update,
                    message: message.clone(),
                });
                next_phase.set(SelectionPhase::Idle);
                break;
            }
        }
    }
}

/// Finish the gesture on request from the host. The surface ends its sketch
/// and reports completion through the gesture feed.
pub(crate) fn finish_reshape_requests(
    mut requests: EventReader<FinishReshape>,
    phase: Res<State<SelectionPhase>>,
    surface: Option<Res<ActiveSurface>>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();

    if *phase.get() != SelectionPhase::Reshaping {
        return;
    }
    let Some(active) = surface else {
        return;
    };
    active.surface.finish_gesture();
}

/// Fold an edited ring back into the context. The provider re-aligns the
/// ring against the previous rectangle first, then the defining corners are
/// re-derived from ring slots 0 and 2, keeping their elevations.
fn assign_polygon(
    context: &mut SelectionContext,
    next_ring: ScenePolygon,
    services: &SceneServices,
    selection_changed: &mut EventWriter<SelectionChanged>,
    geometry_changed: &mut EventWriter<SelectionGeometryChanged>,
    anchor_changed: &mut EventWriter<AnchorChanged>,
) {
    let (Some(origin), Some(terminal)) = (context.origin, context.terminal) else {
        error!("Reshape update without defining corners");
        return;
    };
    let aligned = match &context.polygon {
        Some(previous) => services.provider.align_polygon(&next_ring, previous),
        None => next_ring,
    };
    let (Some(slot0), Some(slot2)) = (aligned.corner(0).copied(), aligned.corner(2).copied())
    else {
        error!("Aligned ring is missing its defining corners");
        return;
    };
    context.origin = Some(origin.moved_to(slot0.x, slot0.y));
    context.terminal = Some(terminal.moved_to(slot2.x, slot2.y));
    context.polygon = Some(aligned.clone());
    selection_changed.write(SelectionChanged {
        polygon: Some(aligned.clone()),
    });
    geometry_changed.write(SelectionGeometryChanged {
        polygon: Some(aligned),
    });
    anchor_changed.write(AnchorChanged {
        anchor: context.origin,
    });
}
