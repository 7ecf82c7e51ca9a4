//! Editing-surface boundary: how the host's interactive 3-D view feeds
//! pointer and gesture input into the toolkit, and how the toolkit drives
//! the view's sketch gestures.
//!
//! The host pushes [`SurfaceInput`] values into a [`SurfaceFeed`] from
//! whatever thread its view callbacks run on; once per frame the pump system
//! drains the feed and rewrites it as typed Bevy events for the selection
//! systems.

use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use thiserror::Error;

use crate::geometry::{ScenePoint, ScenePolygon};

/// Refusal of an editing-surface operation, e.g. the view cannot enter a
/// placement or reshape gesture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("editing surface rejected the gesture: {0}")]
pub struct SurfaceError(pub String);

/// Gesture control over the host view's editing surface.
///
/// `begin_reshape` must present a reshape-only gesture: vertex and edge
/// dragging with rotation, scaling, z-editing and multi-selection disabled.
/// `finish_gesture` and `cancel_gesture` are idempotent, and the surface
/// must not report events for gestures the toolkit itself ended.
pub trait EditingSurface: Send + Sync {
    fn begin_point_placement(&self) -> Result<(), SurfaceError>;
    fn begin_reshape(&self, polygon: &ScenePolygon) -> Result<(), SurfaceError>;
    fn finish_gesture(&self);
    fn cancel_gesture(&self);
    fn clear_overlay(&self);
}

/// Pointer input during point placement.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum PointerEvent {
    /// Intermediate position before the point is confirmed.
    Moved(ScenePoint),
    /// Confirmed point.
    Clicked(ScenePoint),
    /// The user aborted the placement (e.g. escape).
    Cancelled,
    /// The surface failed to produce a point.
    Failed { message: String },
}

/// Gesture input while a rectangle exists on the surface.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// The user grabbed the rectangle through the surface's own handles.
    Started,
    /// Intermediate (possibly skewed) ring streamed mid-drag.
    Changed(ScenePolygon),
    /// The user completed the reshape.
    Completed,
    /// The user cancelled the reshape.
    Cancelled,
    /// A vertex of the rectangle was removed.
    VertexRemoved,
    /// The rectangle graphic itself was deleted on the surface.
    Deleted,
    /// The reshape gesture failed.
    Failed { message: String },
}

/// One unit of input delivered by the host surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceInput {
    Pointer(PointerEvent),
    Gesture(GestureEvent),
}

/// Thread-safe input queue shared between the host view and the pump system.
#[derive(Clone, Default)]
pub struct SurfaceFeed {
    queue: Arc<Mutex<Vec<SurfaceInput>>>,
}

impl SurfaceFeed {
    pub fn push(&self, input: SurfaceInput) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push(input);
        }
    }

    pub fn push_pointer(&self, event: PointerEvent) {
        self.push(SurfaceInput::Pointer(event));
    }

    pub fn push_gesture(&self, event: GestureEvent) {
        self.push(SurfaceInput::Gesture(event));
    }

    pub(crate) fn drain(&self) -> Vec<SurfaceInput> {
        if let Ok(mut queue) = self.queue.lock() {
            std::mem::take(&mut *queue)
        } else {
            Vec::new()
        }
    }
}

/// The currently bound editing surface and its input feed. Inserted by the
/// selection machine when the host binds a surface; replaced wholesale on
/// re-initialization.
#[derive(Resource, Clone)]
pub struct ActiveSurface {
    pub surface: Arc<dyn EditingSurface>,
    pub feed: SurfaceFeed,
}

/// Plugin draining the bound surface's feed into typed events every frame.
pub struct SurfacePlugin;

impl Plugin for SurfacePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PointerEvent>()
            .add_event::<GestureEvent>()
            .add_systems(Update, pump_surface_input);
    }
}

fn pump_surface_input(
    surface: Option<Res<ActiveSurface>>,
    mut pointer_events: EventWriter<PointerEvent>,
    mut gesture_events: EventWriter<GestureEvent>,
) {
    let Some(surface) = surface else {
        return;
    };

    for input in surface.feed.drain() {
        match input {
            SurfaceInput::Pointer(event) => {
                pointer_events.write(event);
            }
            SurfaceInput::Gesture(event) => {
                gesture_events.write(event);
            }
        }
    }
}
