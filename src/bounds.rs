//! Axis-aligned bounding volumes for mesh sections
//!
//! Pure functions operating on a plain AABB data structure. The bounding box of
//! a section is derived from its LOD 0 position stream unless the producer
//! supplies an explicit override.

use cgmath::Point3;

/// Axis-Aligned Bounding Box - pure data structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    /// Zero-volume box at the origin, the state of a section before any
    /// position data arrives
    pub fn zeroed() -> Self {
        Self {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(0.0, 0.0, 0.0),
        }
    }

    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Compute the bounding box of a position stream
///
/// `positions` is the raw byte store of a position buffer, three packed f32s
/// per vertex. An empty stream yields the zeroed box.
pub fn aabb_from_positions(positions: &[u8]) -> Aabb {
    let mut iter = positions.chunks_exact(12).map(|chunk| {
        [
            f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
            f32::from_le_bytes([chunk[8], chunk[9], chunk[10], chunk[11]]),
        ]
    });

    let first = match iter.next() {
        Some(p) => p,
        None => return Aabb::zeroed(),
    };

    let mut min = first;
    let mut max = first;
    for p in iter {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }

    Aabb {
        min: Point3::new(min[0], min[1], min[2]),
        max: Point3::new(max[0], max[1], max[2]),
    }
}
