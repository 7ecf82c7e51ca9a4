//! Query actors fed by the selection machine. Each actor owns at most one
//! in-flight provider task; a new notification drops the old task, so only
//! the result for the latest geometry can ever land.

use bevy::prelude::*;
use bevy::tasks::futures_lite::future;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task};

use crate::scene::{ElevationProfile, ElevationSample, FeatureSet, SceneError, SceneServices};

use super::state::{AnchorChanged, SelectionGeometryChanged};

/// Runs the query actors. Pair with [`super::SelectionPlugin`], which emits
/// the notifications these actors react to.
pub struct SelectionQueriesPlugin;

impl Plugin for SelectionQueriesPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SelectionGeometryChanged>()
            .add_event::<AnchorChanged>()
            .init_resource::<FeatureQuery>()
            .init_resource::<ElevationQuery>()
            .add_systems(
                Update,
                (
                    restart_feature_query,
                    restart_anchor_elevation,
                    restart_profile_elevation,
                    poll_feature_query,
                    poll_elevation_query,
                )
                    .chain(),
            );
    }
}

/// Latest known set of scene features intersecting the selection.
#[derive(Resource, Default)]
pub struct FeatureQuery {
    /// Result for the most recent geometry that resolved.
    pub result: Option<FeatureSet>,
    /// Message from the most recent failed query, if any.
    pub error: Option<String>,
    task: Option<Task<Result<FeatureSet, SceneError>>>,
}

impl FeatureQuery {
    pub fn in_flight(&self) -> bool {
        self.task.is_some()
    }
}

/// Terrain elevation at the anchor corner plus a profile over the whole
/// rectangle.
#[derive(Resource, Default)]
pub struct ElevationQuery {
    pub anchor: Option<ElevationSample>,
    pub profile: Option<ElevationProfile>,
    pub error: Option<String>,
    anchor_task: Option<Task<Result<ElevationSample, SceneError>>>,
    profile_task: Option<Task<Result<ElevationProfile, SceneError>>>,
}

impl ElevationQuery {
    pub fn in_flight(&self) -> bool {
        self.anchor_task.is_some() || self.profile_task.is_some()
    }
}

fn restart_feature_query(
    mut changes: EventReader<SelectionGeometryChanged>,
    services: Option<Res<SceneServices>>,
    mut query: ResMut<FeatureQuery>,
) {
    let Some(change) = changes.read().last() else {
        return;
    };
    let Some(services) = services else {
        return;
    };
    // Drop whatever was still running; its geometry is out of date.
    query.task = None;
    match &change.polygon {
        Some(polygon) => {
            let provider = services.provider.clone();
            let region = polygon.clone();
            query.task = Some(
                AsyncComputeTaskPool::get()
                    .spawn(async move { provider.query_features(&region).await }),
            );
            debug!("Feature query restarted");
        }
        None => {
            query.result = None;
            query.error = None;
        }
    }
}

fn restart_anchor_elevation(
    mut changes: EventReader<AnchorChanged>,
    services: Option<Res<SceneServices>>,
    mut query: ResMut<ElevationQuery>,
) {
    let Some(change) = changes.read().last() else {
        return;
    };
    let Some(services) = services else {
        return;
    };
    query.anchor_task = None;
    match change.anchor {
        Some(anchor) => {
            let provider = services.provider.clone();
            query.anchor_task = Some(
                AsyncComputeTaskPool::get()
                    .spawn(async move { provider.sample_elevation(&anchor).await }),
            );
        }
        None => {
            query.anchor = None;
            query.error = None;
        }
    }
}

fn restart_profile_elevation(
    mut changes: EventReader<SelectionGeometryChanged>,
    services: Option<Res<SceneServices>>,
    mut query: ResMut<ElevationQuery>,
) {
    let Some(change) = changes.read().last() else {
        return;
    };
    let Some(services) = services else {
        return;
    };
    query.profile_task = None;
    let Some(polygon) = &change.polygon else {
        query.profile = None;
        return;
    };
    let corners = [
        polygon.corner(0).copied(),
        polygon.corner(1).copied(),
        polygon.corner(2).copied(),
        polygon.corner(3).copied(),
    ];
    let [Some(c0), Some(c1), Some(c2), Some(c3)] = corners else {
        warn!("Elevation profile skipped, ring has fewer than four corners");
        query.profile = None;
        return;
    };
    let provider = services.provider.clone();
    query.profile_task = Some(AsyncComputeTaskPool::get().spawn(async move {
        let samples = [
            provider.sample_elevation(&c0).await?,
            provider.sample_elevation(&c1).await?,
            provider.sample_elevation(&c2).await?,
            provider.sample_elevation(&c3).await?,
        ];
        Ok(ElevationProfile::from_corners(samples))
    }));
}

fn poll_feature_query(mut query: ResMut<FeatureQuery>) {
    let Some(task) = query.task.as_mut() else {
        return;
    };
    let Some(result) = block_on(future::poll_once(task)) else {
        return;
    };
    query.task = None;
    match result {
        Ok(set) => {
            debug!("Feature query resolved with {} features", set.features.len());
            query.result = Some(set);
            query.error = None;
        }
        Err(err) => {
            warn!("Feature query failed: {err}");
            query.error = Some(err.to_string());
        }
    }
}

fn poll_elevation_query(mut query: ResMut<ElevationQuery>) {
    if let Some(task) = query.anchor_task.as_mut() {
        if let Some(result) = block_on(future::poll_once(task)) {
            query.anchor_task = None;
            match result {
                Ok(sample) => {
                    query.anchor = Some(sample);
                    query.error = None;
                }
                Err(err) => {
                    warn!("Anchor elevation failed: {err}");
                    query.error = Some(err.to_string());
                }
            }
        }
    }
    if let Some(task) = query.profile_task.as_mut() {
        if let Some(result) = block_on(future::poll_once(task)) {
            query.profile_task = None;
            match result {
                Ok(profile) => {
                    query.profile = Some(profile);
                    query.error = None;
                }
                Err(err) => {
                    warn!("Elevation profile failed: {err}");
                    query.error = Some(err.to_string());
                }
            }
        }
    }
}
