//! Planar geometry types shared by the selection machine, the query actors
//! and the export pipeline.
//!
//! Coordinates are stored as `f64` in the units of their spatial reference;
//! the selection rectangle is always reconstructed from its `origin` and
//! `terminal` corners rather than edited as free-form geometry.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_WKID, RECTANGLE_RING_LEN};

/// Spatial reference tag carried by every point and polygon.
/// Geometry produced from a pair of points inherits the origin's reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: i32,
}

impl Default for SpatialReference {
    fn default() -> Self {
        Self { wkid: DEFAULT_WKID }
    }
}

/// A coordinate on the scene, z optional (placement results carry elevation,
/// ring corners do not).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub spatial_reference: SpatialReference,
}

impl ScenePoint {
    pub fn new(x: f64, y: f64, spatial_reference: SpatialReference) -> Self {
        Self {
            x,
            y,
            z: None,
            spatial_reference,
        }
    }

    pub fn with_z(x: f64, y: f64, z: f64, spatial_reference: SpatialReference) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            spatial_reference,
        }
    }

    /// Copy of this point with the horizontal coordinates replaced and
    /// everything else (z, spatial reference) preserved.
    pub fn moved_to(&self, x: f64, y: f64) -> Self {
        Self { x, y, ..*self }
    }
}

/// Axis-aligned envelope of a polygon, handed to the export actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneExtent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub spatial_reference: SpatialReference,
}

impl SceneExtent {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn contains(&self, point: &ScenePoint) -> bool {
        point.x >= self.xmin && point.x <= self.xmax && point.y >= self.ymin && point.y <= self.ymax
    }

    pub fn intersects(&self, other: &SceneExtent) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    /// Envelope grown by `distance` on every side.
    pub fn buffered(&self, distance: f64) -> Self {
        Self {
            xmin: self.xmin - distance,
            ymin: self.ymin - distance,
            xmax: self.xmax + distance,
            ymax: self.ymax + distance,
            ..*self
        }
    }

    /// Smallest envelope covering both extents.
    pub fn union(&self, other: &SceneExtent) -> Self {
        Self {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
            ..*self
        }
    }

    /// Closed ring polygon covering this extent.
    pub fn to_polygon(&self) -> ScenePolygon {
        build_rectangle(
            ScenePoint::new(self.xmin, self.ymin, self.spatial_reference),
            ScenePoint::new(self.xmax, self.ymax, self.spatial_reference),
        )
    }
}

/// A closed ring of points. The selection region is a rectangle whose ring
/// slots are fixed: 0 = origin, 1 = (origin.x, terminal.y), 2 = terminal,
/// 3 = (terminal.x, origin.y), 4 = closing origin. Mid-drag rings coming
/// from the edit gesture may be skewed until re-aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePolygon {
    pub ring: Vec<ScenePoint>,
    pub spatial_reference: SpatialReference,
}

impl ScenePolygon {
    pub fn new(ring: Vec<ScenePoint>, spatial_reference: SpatialReference) -> Self {
        Self {
            ring,
            spatial_reference,
        }
    }

    /// Ring corner by slot index, ignoring the closing vertex.
    pub fn corner(&self, slot: usize) -> Option<&ScenePoint> {
        if slot >= RECTANGLE_RING_LEN - 1 {
            return None;
        }
        self.ring.get(slot)
    }

    pub fn is_closed(&self) -> bool {
        match (self.ring.first(), self.ring.last()) {
            (Some(first), Some(last)) => self.ring.len() >= 4 && first == last,
            _ => false,
        }
    }

    /// Axis-aligned envelope of the ring.
    pub fn extent(&self) -> SceneExtent {
        let mut extent = SceneExtent {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
            spatial_reference: self.spatial_reference,
        };
        for point in &self.ring {
            extent.xmin = extent.xmin.min(point.x);
            extent.ymin = extent.ymin.min(point.y);
            extent.xmax = extent.xmax.max(point.x);
            extent.ymax = extent.ymax.max(point.y);
        }
        extent
    }
}

/// Build the axis-aligned selection rectangle from its two defining corners.
/// Corner order is fixed by contract: origin, (origin.x, terminal.y),
/// terminal, (terminal.x, origin.y), closing origin. Ring corners carry no z;
/// the ring inherits the origin's spatial reference.
pub fn build_rectangle(origin: ScenePoint, terminal: ScenePoint) -> ScenePolygon {
    let spatial_reference = origin.spatial_reference;
    let ring = vec![
        ScenePoint::new(origin.x, origin.y, spatial_reference),
        ScenePoint::new(origin.x, terminal.y, spatial_reference),
        ScenePoint::new(terminal.x, terminal.y, spatial_reference),
        ScenePoint::new(terminal.x, origin.y, spatial_reference),
        ScenePoint::new(origin.x, origin.y, spatial_reference),
    ];
    ScenePolygon::new(ring, spatial_reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sr() -> SpatialReference {
        SpatialReference::default()
    }

    #[test]
    fn rectangle_ring_has_fixed_corner_order() {
        let origin = ScenePoint::with_z(0.0, 0.0, 12.5, sr());
        let terminal = ScenePoint::new(10.0, 10.0, sr());
        let polygon = build_rectangle(origin, terminal);

        let expected: Vec<(f64, f64)> =
            vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)];
        let actual: Vec<(f64, f64)> = polygon.ring.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(actual, expected, "ring corners must follow the contract order");
        assert!(polygon.is_closed());
        assert!(
            polygon.ring.iter().all(|p| p.z.is_none()),
            "ring corners carry no elevation"
        );
    }

    #[test]
    fn rectangle_inherits_origin_spatial_reference() {
        let origin = ScenePoint::new(1.0, 2.0, SpatialReference { wkid: 25884 });
        let terminal = ScenePoint::new(3.0, 4.0, SpatialReference { wkid: 4326 });
        let polygon = build_rectangle(origin, terminal);
        assert_eq!(polygon.spatial_reference.wkid, 25884);
        assert!(polygon.ring.iter().all(|p| p.spatial_reference.wkid == 25884));
    }

    #[test]
    fn extent_covers_skewed_ring() {
        let ring = vec![
            ScenePoint::new(0.0, 0.0, sr()),
            ScenePoint::new(-2.0, 14.0, sr()),
            ScenePoint::new(10.0, 10.0, sr()),
            ScenePoint::new(10.0, 0.0, sr()),
            ScenePoint::new(0.0, 0.0, sr()),
        ];
        let extent = ScenePolygon::new(ring, sr()).extent();
        assert_eq!(extent.xmin, -2.0);
        assert_eq!(extent.ymin, 0.0);
        assert_eq!(extent.xmax, 10.0);
        assert_eq!(extent.ymax, 14.0);
    }

    #[test]
    fn extent_contains_includes_its_boundary() {
        let extent = build_rectangle(
            ScenePoint::new(0.0, 0.0, sr()),
            ScenePoint::new(10.0, 8.0, sr()),
        )
        .extent();
        assert!(extent.contains(&ScenePoint::new(5.0, 4.0, sr())));
        assert!(extent.contains(&ScenePoint::new(0.0, 8.0, sr())));
        assert!(extent.contains(&ScenePoint::new(10.0, 0.0, sr())));
        assert!(!extent.contains(&ScenePoint::new(10.1, 4.0, sr())));
        assert!(!extent.contains(&ScenePoint::new(5.0, -0.1, sr())));
    }

    #[test]
    fn extent_buffer_and_union() {
        let a = build_rectangle(
            ScenePoint::new(0.0, 0.0, sr()),
            ScenePoint::new(4.0, 4.0, sr()),
        )
        .extent();
        let b = build_rectangle(
            ScenePoint::new(6.0, -2.0, sr()),
            ScenePoint::new(8.0, 3.0, sr()),
        )
        .extent();

        let buffered = a.buffered(0.5);
        assert_eq!(buffered.xmin, -0.5);
        assert_eq!(buffered.ymax, 4.5);

        let union = a.union(&b);
        assert_eq!(union.xmin, 0.0);
        assert_eq!(union.ymin, -2.0);
        assert_eq!(union.xmax, 8.0);
        assert_eq!(union.ymax, 4.0);
    }

    #[test]
    fn corner_slot_access_stops_at_closing_vertex() {
        let polygon = build_rectangle(
            ScenePoint::new(0.0, 0.0, sr()),
            ScenePoint::new(10.0, 10.0, sr()),
        );
        assert!(polygon.corner(0).is_some());
        assert!(polygon.corner(3).is_some());
        assert!(polygon.corner(4).is_none(), "closing vertex is not a corner");
    }

    #[test]
    fn moved_to_preserves_z_and_reference() {
        let point = ScenePoint::with_z(1.0, 2.0, 30.0, SpatialReference { wkid: 4326 });
        let moved = point.moved_to(5.0, 6.0);
        assert_eq!(moved.x, 5.0);
        assert_eq!(moved.y, 6.0);
        assert_eq!(moved.z, Some(30.0));
        assert_eq!(moved.spatial_reference.wkid, 4326);
    }
}
