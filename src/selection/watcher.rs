//! Background watchers. The gesture watch runs for the whole bound
//! lifetime and turns surface-side deletions into delete requests; the
//! reselect watch arms while a rectangle sits idle and re-opens it for
//! editing when the user clicks inside it.

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use crate::geometry::ScenePolygon;
use crate::scene::SceneServices;
use crate::surface::{GestureEvent, PointerEvent};

use super::state::{BeginReshape, DeleteSelection, SelectionContext, SelectionPhase};

/// Watch entity alive while any surface is bound.
#[derive(Component)]
pub(crate) struct GestureWatch {
    feed: EventCursor<GestureEvent>,
}

/// Watch entity alive while a finished rectangle sits idle. Holds the
/// rectangle snapshot it was armed with for containment tests.
#[derive(Component)]
pub(crate) struct ReselectWatch {
    feed: EventCursor<PointerEvent>,
    polygon: ScenePolygon,
}

pub(crate) fn spawn_gesture_watch(
    mut commands: Commands,
    gesture_events: Res<Events<GestureEvent>>,
) {
    commands.spawn(GestureWatch {
        feed: gesture_events.get_cursor_current(),
    });
}

pub(crate) fn despawn_gesture_watch(
    mut commands: Commands,
    watches: Query<Entity, With<GestureWatch>>,
) {
    for entity in &watches {
        commands.entity(entity).despawn();
    }
}

/// Surface-side lifecycle events the machine did not ask for: removing a
/// vertex or deleting the sketch both discard the selection, and a gesture
/// started by the surface while idle is adopted as a reshape.
pub(crate) fn watch_gestures(
    mut watches: Query<&mut GestureWatch>,
    gesture_events: Res<Events<GestureEvent>>,
    phase: Res<State<SelectionPhase>>,
    mut delete_requests: EventWriter<DeleteSelection>,
    mut reshape_requests: EventWriter<BeginReshape>,
) {
    let Ok(mut watch) = watches.single_mut() else {
        return;
    };
    for event in watch.feed.read(&gesture_events) {
        match event {
            GestureEvent::VertexRemoved | GestureEvent::Deleted => {
                info!("Surface discarded the sketch, deleting selection");
                delete_requests.write(DeleteSelection);
            }
            GestureEvent::Started if *phase.get() == SelectionPhase::Idle => {
                reshape_requests.write(BeginReshape);
            }
            _ => {}
        }
    }
}

pub(crate) fn spawn_reselect_watch(
    mut commands: Commands,
    context: Res<SelectionContext>,
    pointer_events: Res<Events<PointerEvent>>,
) {
    let Some(polygon) = context.polygon.clone() else {
        warn!("Idle phase entered without a rectangle, reselect watch not armed");
        return;
    };
    commands.spawn(ReselectWatch {
        feed: pointer_events.get_cursor_current(),
        polygon,
    });
}

pub(crate) fn despawn_reselect_watch(
    mut commands: Commands,
    watches: Query<Entity, With<ReselectWatch>>,
) {
    for entity in &watches {
        commands.entity(entity).despawn();
    }
}

/// Click-to-reselect: a click inside the idle rectangle re-opens it for
/// reshaping. Clicks outside are ignored.
pub(crate) fn watch_for_reselect(
    mut watches: Query<&mut ReselectWatch>,
    pointer_events: Res<Events<PointerEvent>>,
    services: Option<Res<SceneServices>>,
    mut reshape_requests: EventWriter<BeginReshape>,
) {
    let Some(services) = services else {
        return;
    };
    let Ok(watch) = watches.single_mut() else {
        return;
    };
    let watch = watch.into_inner();
    for event in watch.feed.read(&pointer_events) {
        if let PointerEvent::Clicked(point) = event {
            if services.provider.point_in_polygon(&watch.polygon, point) {
                debug!("Click inside the idle rectangle, reopening for edit");
                reshape_requests.write(BeginReshape);
            }
        }
    }
}
