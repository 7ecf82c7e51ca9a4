/// Well-known id of the default spatial reference (Web Mercator)
pub const DEFAULT_WKID: i32 = 3857;

/// Number of vertices in a closed rectangle ring (four corners plus the
/// repeated origin)
pub const RECTANGLE_RING_LEN: usize = 5;

/// Buffer distance applied to combined building footprints (metres).
/// Footprints are often quite sharp directly from the query, so a small
/// buffer smooths them out.
pub const FOOTPRINT_BUFFER: f64 = 0.5;

/// Maximum vertex-grid edge for a single exported terrain mesh
pub const MAX_MESH_GRID: usize = 64;

/// Media type of the serialized export file (binary glTF container)
pub const EXPORT_MEDIA_TYPE: &str = "model/gltf-binary";
