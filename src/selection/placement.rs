//! Point placement sessions. One session entity lives while a placement
//! phase is active; it owns a pointer-event cursor created at entry so that
//! clicks from before the session never resolve it.

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use crate::geometry::{build_rectangle, ScenePoint};
use crate::surface::{ActiveSurface, PointerEvent};

use super::state::{
    AnchorChanged, SelectionChanged, SelectionConfig, SelectionContext, SelectionError,
    SelectionErrorKind, SelectionGeometryChanged, SelectionPhase,
};

/// Live point-placement session. Spawned on entry to a placement phase and
/// despawned on exit, cancelling the pick in flight.
#[derive(Component)]
pub(crate) struct PlacementSession {
    feed: EventCursor<PointerEvent>,
}

pub(crate) fn begin_origin_placement(
    commands: Commands,
    surface: Option<Res<ActiveSurface>>,
    pointer_events: Res<Events<PointerEvent>>,
    next_phase: ResMut<NextState<SelectionPhase>>,
    errors: EventWriter<SelectionError>,
) {
    begin_placement(
        commands,
        surface,
        pointer_events,
        next_phase,
        errors,
        SelectionPhase::NonExistent,
    );
}

pub(crate) fn begin_terminal_placement(
    commands: Commands,
    surface: Option<Res<ActiveSurface>>,
    pointer_events: Res<Events<PointerEvent>>,
    next_phase: ResMut<NextState<SelectionPhase>>,
    errors: EventWriter<SelectionError>,
) {
    begin_placement(
        commands,
        surface,
        pointer_events,
        next_phase,
        errors,
        SelectionPhase::NonExistent,
    );
}

pub(crate) fn begin_repick_placement(
    commands: Commands,
    surface: Option<Res<ActiveSurface>>,
    pointer_events: Res<Events<PointerEvent>>,
    next_phase: ResMut<NextState<SelectionPhase>>,
    errors: EventWriter<SelectionError>,
) {
    // A failed repick keeps the rectangle, so fall back to idle.
    begin_placement(
        commands,
        surface,
        pointer_events,
        next_phase,
        errors,
        SelectionPhase::Idle,
    );
}

fn begin_placement(
    mut commands: Commands,
    surface: Option<Res<ActiveSurface>>,
    pointer_events: Res<Events<PointerEvent>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
    mut errors: EventWriter<SelectionError>,
    fallback: SelectionPhase,
) {
    let Some(active) = surface else {
        error!("Point placement entered without a bound surface");
        next_phase.set(fallback);
        return;
    };
    if let Err(err) = active.surface.begin_point_placement() {
        errors.write(SelectionError {
            kind: SelectionErrorKind::Create,
            message: err.to_string(),
        });
        next_phase.set(fallback);
        return;
    }
    commands.spawn(PlacementSession {
        feed: pointer_events.get_cursor_current(),
    });
    debug!("Point placement started");
}

/// Exit action shared by all placement phases. Drops the session entity and
/// tells the surface to abandon whatever pick is still active.
pub(crate) fn end_placement(
    mut commands: Commands,
    sessions: Query<Entity, With<PlacementSession>>,
    surface: Option<Res<ActiveSurface>>,
) {
    for entity in &sessions {
        commands.entity(entity).despawn();
    }
    if let Some(active) = surface {
        active.surface.cancel_gesture();
    }
}

pub(crate) fn drive_origin_placement(
    mut sessions: Query<&mut PlacementSession>,
    pointer_events: Res<Events<PointerEvent>>,
    mut context: ResMut<SelectionContext>,
    surface: Option<Res<ActiveSurface>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
    mut errors: EventWriter<SelectionError>,
    mut selection_changed: EventWriter<SelectionChanged>,
    mut anchor_changed: EventWriter<AnchorChanged>,
) {
    resolve_corner_pick(
        &mut sessions,
        &pointer_events,
        &mut context,
        surface.as_deref(),
        &mut next_phase,
        &mut errors,
        &mut selection_changed,
        &mut anchor_changed,
        SelectionPhase::NonExistent,
    );
}

pub(crate) fn drive_repick_placement(
    mut sessions: Query<&mut PlacementSession>,
    pointer_events: Res<Events<PointerEvent>>,
    mut context: ResMut<SelectionContext>,
    surface: Option<Res<ActiveSurface>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
    mut errors: EventWriter<SelectionError>,
    mut selection_changed: EventWriter<SelectionChanged>,
    mut anchor_changed: EventWriter<AnchorChanged>,
) {
    resolve_corner_pick(
        &mut sessions,
        &pointer_events,
        &mut context,
        surface.as_deref(),
        &mut next_phase,
        &mut errors,
        &mut selection_changed,
        &mut anchor_changed,
        SelectionPhase::Idle,
    );
}

/// Wait for the click that fixes the origin corner. A cancelled or failed
/// pick falls back to `fallback`; a repick preserves its rectangle there.
fn resolve_corner_pick(
    sessions: &mut Query<&mut PlacementSession>,
    pointer_events: &Events<PointerEvent>,
    context: &mut SelectionContext,
    surface: Option<&ActiveSurface>,
    next_phase: &mut NextState<SelectionPhase>,
    errors: &mut EventWriter<SelectionError>,
    selection_changed: &mut EventWriter<SelectionChanged>,
    anchor_changed: &mut EventWriter<AnchorChanged>,
    fallback: SelectionPhase,
) {
    let Ok(mut session) = sessions.single_mut() else {
        return;
    };
    for event in session.feed.read(pointer_events) {
        match event {
            PointerEvent::Moved(_) => {}
            PointerEvent::Clicked(point) => {
                assign_origin(context, *point, surface, selection_changed, anchor_changed);
                next_phase.set(SelectionPhase::PlacingTerminal);
                break;
            }
            PointerEvent::Cancelled => {
                next_phase.set(fallback);
                break;
            }
            PointerEvent::Failed { message } => {
                errors.write(SelectionError {
                    kind: SelectionErrorKind::Create,
                    message: message.clone(),
                });
                next_phase.set(fallback);
                break;
            }
        }
    }
}

/// Track pointer motion as a live rectangle preview and fix the terminal
/// corner on click. Every preview update restarts the feature query; the
/// final click only freezes what the last move produced.
pub(crate) fn drive_terminal_placement(
    mut sessions: Query<&mut PlacementSession>,
    pointer_events: Res<Events<PointerEvent>>,
    mut context: ResMut<SelectionContext>,
    config: Res<SelectionConfig>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
    mut errors: EventWriter<SelectionError>,
    mut selection_changed: EventWriter<SelectionChanged>,
    mut geometry_changed: EventWriter<SelectionGeometryChanged>,
) {
    let Some(origin) = context.origin else {
        error!("Terminal placement entered without an origin corner");
        next_phase.set(SelectionPhase::NonExistent);
        return;
    };
    let Ok(mut session) = sessions.single_mut() else {
        return;
    };
    for event in session.feed.read(&pointer_events) {
        match event {
            PointerEvent::Moved(point) => {
                let polygon = build_rectangle(origin, *point);
                context.terminal = Some(*point);
                context.polygon = Some(polygon.clone());
                selection_changed.write(SelectionChanged {
                    polygon: Some(polygon.clone()),
                });
                geometry_changed.write(SelectionGeometryChanged {
                    polygon: Some(polygon),
                });
            }
            PointerEvent::Clicked(point) => {
                let polygon = build_rectangle(origin, *point);
                context.terminal = Some(*point);
                context.polygon = Some(polygon.clone());
                selection_changed.write(SelectionChanged {
                    polygon: Some(polygon),
                });
                let next = if config.reshape_after_creation {
                    SelectionPhase::Reshaping
                } else {
                    SelectionPhase::Idle
                };
                next_phase.set(next);
                info!(
                    "Selection created at ({:.2}, {:.2}) by ({:.2}, {:.2})",
                    origin.x, origin.y, point.x, point.y
                );
                break;
            }
            PointerEvent::Cancelled => {
                next_phase.set(SelectionPhase::NonExistent);
                break;
            }
            PointerEvent::Failed { message } => {
                errors.write(SelectionError {
                    kind: SelectionErrorKind::Create,
                    message: message.clone(),
                });
                next_phase.set(SelectionPhase::NonExistent);
                break;
            }
        }
    }
}

/// Fix the origin corner: wipe any previous rectangle, remember the corner
/// and move the elevation anchor to it.
fn assign_origin(
    context: &mut SelectionContext,
    point: ScenePoint,
    surface: Option<&ActiveSurface>,
    selection_changed: &mut EventWriter<SelectionChanged>,
    anchor_changed: &mut EventWriter<AnchorChanged>,
) {
    if let Some(active) = surface {
        active.surface.clear_overlay();
    }
    context.origin = Some(point);
    context.terminal = None;
    context.polygon = None;
    selection_changed.write(SelectionChanged { polygon: None });
    anchor_changed.write(AnchorChanged {
        anchor: Some(point),
    });
    info!("Origin placed at ({:.2}, {:.2})", point.x, point.y);
}
