//! Collision geometry extraction
//!
//! Pull path for the physics collaborator: appends LOD 0 positions and
//! triangles into caller-owned lists so several sections can feed one shared
//! physics mesh. Emitted vertex indices are offset by the position list's
//! length at entry.

use cgmath::Point3;

use super::Section;
use crate::buffer::IndexWidth;

/// One collision triangle, indices into the shared position list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleIndices {
    pub v0: u32,
    pub v1: u32,
    pub v2: u32,
}

impl Section {
    /// Append LOD 0 collision geometry to the caller's lists
    ///
    /// Decodes each successive run of three index entries into one triangle,
    /// with the 16- vs 32-bit branch chosen once from the index stream's fixed
    /// width; a trailing partial run is ignored. When `out_uvs` is supplied
    /// (the physics settings ask for UVs in hit results), one UV per emitted
    /// vertex is appended from the section's UV stream, or zero-filled when
    /// the section carries none, keeping the two lists the same length.
    ///
    /// Returns the number of triangles produced.
    pub fn collect_collision_geometry(
        &self,
        out_positions: &mut Vec<Point3<f32>>,
        out_triangles: &mut Vec<TriangleIndices>,
        mut out_uvs: Option<&mut Vec<[f32; 2]>>,
    ) -> u32 {
        let base_vertex = out_positions.len() as u32;
        let lod = &self.lods[0];

        out_positions.extend(
            lod.positions
                .iter_positions()
                .map(|p| Point3::new(p[0], p[1], p[2])),
        );

        if let Some(uvs) = out_uvs.as_deref_mut() {
            let vertex_count = lod.positions.vertex_count();
            if lod.uvs.vertex_count() == vertex_count && vertex_count > 0 {
                uvs.reserve(vertex_count as usize);
                for index in 0..vertex_count {
                    uvs.push(lod.uvs.uv_at(index));
                }
            } else {
                // No usable UV stream for this section; keep list lengths in sync
                uvs.extend(std::iter::repeat([0.0, 0.0]).take(vertex_count as usize));
            }
        }

        let triangle_count = lod.indices.index_count() / 3;
        out_triangles.reserve(triangle_count as usize);

        match lod.indices.width() {
            IndexWidth::U32 => {
                for tri in lod.indices.data().chunks_exact(12) {
                    out_triangles.push(TriangleIndices {
                        v0: u32::from_le_bytes([tri[0], tri[1], tri[2], tri[3]]) + base_vertex,
                        v1: u32::from_le_bytes([tri[4], tri[5], tri[6], tri[7]]) + base_vertex,
                        v2: u32::from_le_bytes([tri[8], tri[9], tri[10], tri[11]]) + base_vertex,
                    });
                }
            }
            IndexWidth::U16 => {
                for tri in lod.indices.data().chunks_exact(6) {
                    out_triangles.push(TriangleIndices {
                        v0: u16::from_le_bytes([tri[0], tri[1]]) as u32 + base_vertex,
                        v1: u16::from_le_bytes([tri[2], tri[3]]) as u32 + base_vertex,
                        v2: u16::from_le_bytes([tri[4], tri[5]]) as u32 + base_vertex,
                    });
                }
            }
        }

        triangle_count
    }
}
