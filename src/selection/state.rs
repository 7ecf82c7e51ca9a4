//! Phases of the selection lifecycle, the canonical selection context and
//! the event protocol in and out of the machine.

use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geometry::{ScenePoint, ScenePolygon};
use crate::surface::{EditingSurface, SurfaceFeed};

/// Lifecycle phase of the selection tool. One flat phase per leaf of the
/// interaction protocol; [`SurfaceBound`] rolls up everything after
/// initialization.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum SelectionPhase {
    /// No editing surface bound yet.
    #[default]
    Uninitialized,
    /// Surface bound, no rectangle exists.
    NonExistent,
    /// Waiting for the user to place the first corner.
    PlacingOrigin,
    /// First corner placed, waiting for the second with live preview.
    PlacingTerminal,
    /// A rectangle exists and is not being edited.
    Idle,
    /// A rectangle exists and the user is placing a replacement origin.
    Repicking,
    /// A rectangle exists and is being reshaped.
    Reshaping,
}

/// Computed rollup: exists in every phase with a bound editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceBound;

impl ComputedStates for SurfaceBound {
    type SourceStates = SelectionPhase;

    fn compute(sources: SelectionPhase) -> Option<Self> {
        match sources {
            SelectionPhase::Uninitialized => None,
            _ => Some(SurfaceBound),
        }
    }
}

/// Canonical selection geometry, mutated only by the selection systems.
/// `polygon` is present iff both corners are; its ring is always derivable
/// from `origin`/`terminal` except mid-drag, when it holds the latest
/// aligned ring.
#[derive(Resource, Debug, Clone, Default)]
pub struct SelectionContext {
    pub origin: Option<ScenePoint>,
    pub terminal: Option<ScenePoint>,
    pub polygon: Option<ScenePolygon>,
}

impl SelectionContext {
    pub fn clear(&mut self) {
        self.origin = None;
        self.terminal = None;
        self.polygon = None;
    }

    pub fn is_empty(&self) -> bool {
        self.origin.is_none() && self.terminal.is_none() && self.polygon.is_none()
    }
}

/// Policy knobs for the selection lifecycle.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Enter reshape mode immediately after the rectangle is created.
    pub reshape_after_creation: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            reshape_after_creation: true,
        }
    }
}

/// Bind (or re-bind) the editing surface. Replaces any previous binding and
/// resets the machine to its empty phase.
#[derive(Event, Clone)]
pub struct BindSurface {
    pub surface: Arc<dyn EditingSurface>,
    pub feed: SurfaceFeed,
}

/// Start drawing a rectangle. Honored in `NonExistent` (first rectangle) and
/// `Idle` (replace the existing one); ignored elsewhere.
#[derive(Event, Debug, Clone, Copy)]
pub struct BeginSelection;

/// Abort corner placement. Honored only while placing origin or terminal.
#[derive(Event, Debug, Clone, Copy)]
pub struct CancelDrawing;

/// Remove the rectangle and reset the context. Honored in every bound phase.
#[derive(Event, Debug, Clone, Copy)]
pub struct DeleteSelection;

/// Enter reshape mode on the existing rectangle. Written by the watchers or
/// by the host; honored only in `Idle`.
#[derive(Event, Debug, Clone, Copy)]
pub struct BeginReshape;

/// Force the active reshape gesture to complete immediately.
#[derive(Event, Debug, Clone, Copy)]
pub struct FinishReshape;

/// Snapshot of the selection geometry after any change, for rendering.
#[derive(Event, Debug, Clone)]
pub struct SelectionChanged {
    pub polygon: Option<ScenePolygon>,
}

/// Which interaction produced a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionErrorKind {
    Create,
    Update,
}

/// Recoverable interaction failure surfaced to the host (e.g. for a toast).
/// Cancellation never produces one.
#[derive(Event, Debug, Clone)]
pub struct SelectionError {
    pub kind: SelectionErrorKind,
    pub message: String,
}

/// Latest selection polygon for the feature query actor (`None` clears it).
#[derive(Event, Debug, Clone)]
pub struct SelectionGeometryChanged {
    pub polygon: Option<ScenePolygon>,
}

/// Latest anchor point for the elevation query actor (`None` clears it).
#[derive(Event, Debug, Clone)]
pub struct AnchorChanged {
    pub anchor: Option<ScenePoint>,
}
