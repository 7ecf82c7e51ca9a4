//! Binary glTF (GLB) serialization for exported terrain meshes.
//!
//! Produces a self-contained two-chunk GLB 2.0 container: a JSON chunk
//! describing one indexed triangle primitive and a binary chunk holding
//! vertex positions followed by indices. Positions are metres relative to
//! the mesh anchor; the anchor itself rides along in glTF `extras` so the
//! file stays georeferenceable without losing f32 precision.

use serde_json::json;

use crate::scene::{SceneError, SceneMesh};

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_F32: u32 = 5126;
const COMPONENT_U32: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Encode a mesh as a GLB 2.0 byte stream.
pub fn encode(mesh: &SceneMesh) -> Result<Vec<u8>, SceneError> {
    if mesh.positions.is_empty() || mesh.indices.is_empty() {
        return Err(SceneError::MeshSerialize(
            "mesh has no geometry to serialize".into(),
        ));
    }
    if mesh.indices.len() % 3 != 0 {
        return Err(SceneError::MeshSerialize(
            "index count is not a multiple of three".into(),
        ));
    }
    if let Some(out_of_range) = mesh
        .indices
        .iter()
        .find(|index| **index as usize >= mesh.positions.len())
    {
        return Err(SceneError::MeshSerialize(format!(
            "index {out_of_range} exceeds vertex count {}",
            mesh.positions.len()
        )));
    }

    let position_bytes: &[u8] = bytemuck::cast_slice(&mesh.positions);
    let index_bytes: &[u8] = bytemuck::cast_slice(&mesh.indices);
    // Both sections are naturally 4-byte aligned, so the binary chunk is
    // simply positions followed by indices.
    let mut bin = Vec::with_capacity(position_bytes.len() + index_bytes.len());
    bin.extend_from_slice(position_bytes);
    bin.extend_from_slice(index_bytes);

    let (min, max) = position_bounds(&mesh.positions);
    let document = json!({
        "asset": { "version": "2.0", "generator": "scene-export-tools" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }]
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": COMPONENT_F32,
                "count": mesh.vertex_count(),
                "type": "VEC3",
                "min": min,
                "max": max
            },
            {
                "bufferView": 1,
                "componentType": COMPONENT_U32,
                "count": mesh.indices.len(),
                "type": "SCALAR"
            }
        ],
        "bufferViews": [
            {
                "buffer": 0,
                "byteOffset": 0,
                "byteLength": position_bytes.len(),
                "target": TARGET_ARRAY_BUFFER
            },
            {
                "buffer": 0,
                "byteOffset": position_bytes.len(),
                "byteLength": index_bytes.len(),
                "target": TARGET_ELEMENT_ARRAY_BUFFER
            }
        ],
        "buffers": [{ "byteLength": bin.len() }],
        "extras": {
            "anchor": {
                "x": mesh.anchor.x,
                "y": mesh.anchor.y,
                "z": mesh.anchor.z,
                "wkid": mesh.anchor.spatial_reference.wkid
            }
        }
    });

    let mut json_chunk =
        serde_json::to_vec(&document).map_err(|err| SceneError::MeshSerialize(err.to_string()))?;
    // Chunks must be 4-byte aligned; the JSON chunk pads with spaces.
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }

    let total = 12 + 8 + json_chunk.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);
    Ok(out)
}

/// Component-wise bounds of all positions, required on POSITION accessors.
fn position_bounds(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for position in positions {
        for axis in 0..3 {
            min[axis] = min[axis].min(position[axis]);
            max[axis] = max[axis].max(position[axis]);
        }
    }
    (min, max)
}
