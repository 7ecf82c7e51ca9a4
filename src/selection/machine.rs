//! Plugin wiring and the top-level transition handlers of the selection
//! lifecycle: surface binding, create/delete/cancel commands and the reset
//! that runs whenever the machine re-enters its empty phase.

use bevy::prelude::*;

use crate::surface::ActiveSurface;

use super::placement;
use super::reshape;
use super::state::{
    AnchorChanged, BeginReshape, BeginSelection, BindSurface, CancelDrawing, DeleteSelection,
    FinishReshape, SelectionChanged, SelectionConfig, SelectionContext, SelectionError,
    SelectionGeometryChanged, SelectionPhase, SurfaceBound,
};
use super::watcher;

/// Selection lifecycle state machine: phases, sessions, watchers and the
/// command handlers driving them. Requires [`crate::surface::SurfacePlugin`]
/// and Bevy's `StatesPlugin`.
pub struct SelectionPlugin;

impl Plugin for SelectionPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<SelectionPhase>()
            .add_computed_state::<SurfaceBound>()
            .init_resource::<SelectionContext>()
            .init_resource::<SelectionConfig>()
            .add_event::<BindSurface>()
            .add_event::<BeginSelection>()
            .add_event::<CancelDrawing>()
            .add_event::<DeleteSelection>()
            .add_event::<BeginReshape>()
            .add_event::<FinishReshape>()
            .add_event::<SelectionChanged>()
            .add_event::<SelectionError>()
            .add_event::<SelectionGeometryChanged>()
            .add_event::<AnchorChanged>()
            .add_systems(
                Update,
                (
                    placement::drive_origin_placement
                        .run_if(in_state(SelectionPhase::PlacingOrigin)),
                    placement::drive_repick_placement.run_if(in_state(SelectionPhase::Repicking)),
                    placement::drive_terminal_placement
                        .run_if(in_state(SelectionPhase::PlacingTerminal)),
                    reshape::finish_reshape_requests,
                    reshape::drive_reshape.run_if(in_state(SelectionPhase::Reshaping)),
                    watcher::watch_gestures.run_if(in_state(SurfaceBound)),
                    watcher::watch_for_reselect.run_if(in_state(SelectionPhase::Idle)),
                    begin_selection_requests,
                    begin_reshape_requests,
                    cancel_drawing_requests,
                    delete_requests,
                    bind_surface,
                )
                    .chain(),
            )
            .add_systems(OnEnter(SelectionPhase::NonExistent), reset_selection)
            .add_systems(
                OnEnter(SelectionPhase::PlacingOrigin),
                placement::begin_origin_placement,
            )
            .add_systems(
                OnExit(SelectionPhase::PlacingOrigin),
                placement::end_placement,
            )
            .add_systems(
                OnEnter(SelectionPhase::PlacingTerminal),
                placement::begin_terminal_placement,
            )
            .add_systems(
                OnExit(SelectionPhase::PlacingTerminal),
                placement::end_placement,
            )
            .add_systems(
                OnEnter(SelectionPhase::Repicking),
                placement::begin_repick_placement,
            )
            .add_systems(OnExit(SelectionPhase::Repicking), placement::end_placement)
            .add_systems(
                OnEnter(SelectionPhase::Reshaping),
                reshape::begin_reshape_session,
            )
            .add_systems(
                OnExit(SelectionPhase::Reshaping),
                reshape::end_reshape_session,
            )
            .add_systems(OnEnter(SurfaceBound), watcher::spawn_gesture_watch)
            .add_systems(OnExit(SurfaceBound), watcher::despawn_gesture_watch)
            .add_systems(OnEnter(SelectionPhase::Idle), watcher::spawn_reselect_watch)
            .add_systems(OnExit(SelectionPhase::Idle), watcher::despawn_reselect_watch);
    }
}

/// Bind (or re-bind) the host's editing surface. The previous binding is
/// torn down first and the machine restarts from its empty phase.
fn bind_surface(
    mut binds: EventReader<BindSurface>,
    mut commands: Commands,
    previous: Option<Res<ActiveSurface>>,
    mut context: ResMut<SelectionContext>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
    mut selection_changed: EventWriter<SelectionChanged>,
    mut geometry_changed: EventWriter<SelectionGeometryChanged>,
    mut anchor_changed: EventWriter<AnchorChanged>,
) {
    let Some(bind) = binds.read().last().cloned() else {
        return;
    };

    if let Some(active) = previous {
        active.surface.cancel_gesture();
        active.surface.clear_overlay();
    }

    commands.insert_resource(ActiveSurface {
        surface: bind.surface,
        feed: bind.feed,
    });
    context.clear();
    selection_changed.write(SelectionChanged { polygon: None });
    geometry_changed.write(SelectionGeometryChanged { polygon: None });
    anchor_changed.write(AnchorChanged { anchor: None });
    next_phase.set(SelectionPhase::NonExistent);
    info!("Editing surface bound, selection tool ready");
}

/// Start drawing: from `NonExistent` places the first rectangle, from
/// `Idle` starts replacing the existing one. Ignored in any other phase.
fn begin_selection_requests(
    mut requests: EventReader<BeginSelection>,
    phase: Res<State<SelectionPhase>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();

    match phase.get() {
        SelectionPhase::NonExistent => next_phase.set(SelectionPhase::PlacingOrigin),
        SelectionPhase::Idle => next_phase.set(SelectionPhase::Repicking),
        _ => {}
    }
}

/// Enter reshape mode on the existing rectangle. Honored only in `Idle`.
fn begin_reshape_requests(
    mut requests: EventReader<BeginReshape>,
    phase: Res<State<SelectionPhase>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();

    if *phase.get() == SelectionPhase::Idle {
        next_phase.set(SelectionPhase::Reshaping);
    }
}

/// Abort corner placement. Honored only while placing origin or terminal;
/// a repick keeps its rectangle and is cancelled through pointer input.
fn cancel_drawing_requests(
    mut requests: EventReader<CancelDrawing>,
    phase: Res<State<SelectionPhase>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();

    if matches!(
        phase.get(),
        SelectionPhase::PlacingOrigin | SelectionPhase::PlacingTerminal
    ) {
        next_phase.set(SelectionPhase::NonExistent);
    }
}

/// Remove the rectangle from any bound phase. Sessions and watchers are
/// torn down by the exit schedules of whatever phase was active.
fn delete_requests(
    mut requests: EventReader<DeleteSelection>,
    phase: Res<State<SelectionPhase>>,
    mut next_phase: ResMut<NextState<SelectionPhase>>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();

    match phase.get() {
        SelectionPhase::Uninitialized | SelectionPhase::NonExistent => {}
        _ => {
            info!("Selection deleted");
            next_phase.set(SelectionPhase::NonExistent);
        }
    }
}

/// Entry action of the empty phase: drop any gesture, wipe the overlay and
/// the context, and push empty snapshots downstream.
fn reset_selection(
    mut context: ResMut<SelectionContext>,
    surface: Option<Res<ActiveSurface>>,
    mut selection_changed: EventWriter<SelectionChanged>,
    mut geometry_changed: EventWriter<SelectionGeometryChanged>,
    mut anchor_changed: EventWriter<AnchorChanged>,
) {
    if let Some(active) = surface {
        active.surface.cancel_gesture();
        active.surface.clear_overlay();
    }
    context.clear();
    selection_changed.write(SelectionChanged { polygon: None });
    geometry_changed.write(SelectionGeometryChanged { polygon: None });
    anchor_changed.write(AnchorChanged { anchor: None });
    debug!("Selection context cleared");
}
