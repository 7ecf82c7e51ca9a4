//! Selection lifecycle for rectangular scene regions.
//!
//! Drives drawing, editing and deleting one axis-aligned rectangle on a
//! host-owned editing surface, and keeps two query actors pointed at the
//! current geometry. The host binds a surface once, then talks to the
//! machine exclusively through events.
//!
//! ## Phase Machine
//!
//! ```text
//! Uninitialized
//!   └─ BindSurface ─> NonExistent
//!        └─ BeginSelection ─> PlacingOrigin ─ click ─> PlacingTerminal
//!             (cancel/fail returns to NonExistent)      │ move: live preview
//!                                                       └ click ─> Reshaping ─> Idle
//! Idle
//!   ├─ BeginSelection ─> Repicking (cancel/fail returns to Idle, keeping
//!   │                    the rectangle; a click starts a fresh draw)
//!   ├─ BeginReshape / click inside rectangle ─> Reshaping
//!   └─ DeleteSelection ─> NonExistent
//! ```
//!
//! Whether a finished draw settles in `Reshaping` or goes straight to
//! `Idle` is controlled by [`state::SelectionConfig::reshape_after_creation`].
//!
//! ## Sessions and Watchers
//!
//! Each active phase owns a session entity holding an event cursor created
//! at entry, so input from before the phase began is never replayed into
//! it. Two watchers run alongside: a gesture watch for the whole bound
//! lifetime (surface-side deletions) and a reselect watch while idle
//! (click inside the rectangle reopens it).
//!
//! ## Query Actors
//!
//! [`queries::FeatureQuery`] and [`queries::ElevationQuery`] follow the
//! machine through [`state::SelectionGeometryChanged`] and
//! [`state::AnchorChanged`] notifications. Each restart drops the previous
//! provider task, so stale results never land.

pub mod machine;
pub mod queries;
pub mod state;

mod placement;
mod reshape;
mod watcher;

pub use machine::SelectionPlugin;
pub use queries::{ElevationQuery, FeatureQuery, SelectionQueriesPlugin};
pub use state::{
    AnchorChanged, BeginReshape, BeginSelection, BindSurface, CancelDrawing, DeleteSelection,
    FinishReshape, SelectionChanged, SelectionConfig, SelectionContext, SelectionError,
    SelectionErrorKind, SelectionGeometryChanged, SelectionPhase, SurfaceBound,
};
