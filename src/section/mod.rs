//! Mesh sections: the authoritative, producer-owned mesh data
//!
//! A section is an independently updatable sub-mesh holding up to
//! [`MAX_LODS`](crate::constants::mesh::MAX_LODS) levels of detail, each with
//! its own set of attribute and index streams, plus visibility, shadow and
//! collision flags and a bounding box. Sections are mutated buffer-by-buffer
//! and LOD-by-LOD by a single producer; consumers only ever see immutable
//! packet snapshots extracted from them (see [`crate::packet`]).

pub mod collision;

pub use collision::TriangleIndices;

use crate::bounds::{aabb_from_positions, Aabb};
use crate::buffer::{
    ColorBuffer, IndexBuffer, IndexWidth, PositionBuffer, TangentBuffer, TangentPrecision,
    UvBuffer, UvPrecision,
};
use crate::constants::mesh::MAX_LODS;

/// Result type for section mutations
pub type SectionResult<T> = Result<T, SectionError>;

/// Contract violations surfaced by the mesh-data layer
///
/// Both variants are caller bugs: they are reported immediately and never
/// coerced. Consumer-side stale/partial data is not an error - it degrades the
/// affected LOD to non-renderable instead (see [`crate::proxy`]).
#[derive(Debug, thiserror::Error)]
pub enum SectionError {
    /// A buffer write whose element size disagrees with the stride fixed at
    /// construction
    #[error("buffer element size mismatch: stride is {expected} bytes, got {actual}")]
    SizeMismatch { expected: u32, actual: u32 },

    /// A configuration that disagrees with the one chosen at section creation
    #[error("section configuration mismatch on {field}")]
    ConfigurationMismatch { field: &'static str },
}

/// How often the producer expects to update a section
///
/// A hint only: nothing in this crate couples correctness to it. The consumer
/// reads it once to decide between static and dynamic draw paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFrequency {
    Rare,
    Average,
    Frequent,
}

/// Buffer configuration chosen once at section creation
///
/// Every LOD of a section shares this configuration; lazily created LODs clone
/// it from LOD 0, and incoming data that disagrees with it is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionConfig {
    pub tangent_precision: TangentPrecision,
    pub uv_precision: UvPrecision,
    pub uv_channels: u32,
    pub index_width: IndexWidth,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            tangent_precision: TangentPrecision::Compact,
            uv_precision: UvPrecision::Half,
            uv_channels: 1,
            index_width: IndexWidth::U16,
        }
    }
}

/// One complete geometry representation at a given detail tier
///
/// Elements across the position/tangent/uv/color streams are correlated by
/// index: element `i` of each stream describes vertex `i`. The validity
/// predicate below is the only arbiter of whether that correlation holds.
#[derive(Debug, Clone, PartialEq)]
pub struct LodData {
    pub positions: PositionBuffer,
    pub tangents: TangentBuffer,
    pub uvs: UvBuffer,
    pub colors: ColorBuffer,
    pub indices: IndexBuffer,
    pub adjacency_indices: IndexBuffer,
}

impl LodData {
    pub fn new(config: &SectionConfig) -> Self {
        Self {
            positions: PositionBuffer::new(),
            tangents: TangentBuffer::new(config.tangent_precision),
            uvs: UvBuffer::new(config.uv_precision, config.uv_channels),
            colors: ColorBuffer::new(),
            indices: IndexBuffer::new(config.index_width),
            adjacency_indices: IndexBuffer::new(config.index_width),
        }
    }

    /// The configuration this LOD was built with
    pub fn config(&self) -> SectionConfig {
        SectionConfig {
            tangent_precision: self.tangents.precision(),
            uv_precision: self.uvs.precision(),
            uv_channels: self.uvs.channels(),
            index_width: self.indices.width(),
        }
    }

    /// Whether this LOD's buffers were built under `config`
    pub fn matches_config(&self, config: &SectionConfig) -> bool {
        self.config() == *config
    }

    /// Whether this LOD's buffers describe drawable geometry
    ///
    /// Requires a non-empty index stream, a non-empty position stream, and
    /// every populated attribute stream to match the position stream's
    /// element count.
    pub fn has_valid_mesh_data(&self) -> bool {
        if self.indices.index_count() == 0 {
            return false;
        }
        let vertices = self.positions.vertex_count();
        if vertices == 0 {
            return false;
        }
        if self.tangents.vertex_count() != 0 && self.tangents.vertex_count() != vertices {
            return false;
        }
        if self.uvs.vertex_count() != 0 && self.uvs.vertex_count() != vertices {
            return false;
        }
        if self.colors.vertex_count() != 0 && self.colors.vertex_count() != vertices {
            return false;
        }
        true
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.vertex_count()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.index_count()
    }
}

/// An independently updatable sub-mesh owned by the producer context
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    update_frequency: UpdateFrequency,
    lods: Vec<LodData>,
    bounding_box: Aabb,
    collision_enabled: bool,
    visible: bool,
    casts_shadow: bool,
}

impl Section {
    /// Create a section with LOD 0 emplaced under `config`
    ///
    /// The configuration is fixed for the section's life; later LODs clone it.
    pub fn new(config: SectionConfig, update_frequency: UpdateFrequency) -> Self {
        Self {
            update_frequency,
            lods: vec![LodData::new(&config)],
            bounding_box: Aabb::zeroed(),
            collision_enabled: false,
            visible: true,
            casts_shadow: true,
        }
    }

    pub fn update_frequency(&self) -> UpdateFrequency {
        self.update_frequency
    }

    pub fn config(&self) -> SectionConfig {
        self.lods[0].config()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn casts_shadow(&self) -> bool {
        self.casts_shadow
    }

    pub fn is_collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    pub fn lods(&self) -> &[LodData] {
        &self.lods
    }

    /// Borrow one LOD. The index must already exist.
    pub fn lod(&self, lod_index: usize) -> &LodData {
        assert!(lod_index < self.lods.len(), "LOD index {} out of range", lod_index);
        &self.lods[lod_index]
    }

    pub fn vertex_count(&self, lod_index: usize) -> u32 {
        self.lod(lod_index).vertex_count()
    }

    pub fn index_count(&self, lod_index: usize) -> u32 {
        self.lod(lod_index).index_count()
    }

    /// Whether LOD 0 describes drawable geometry
    pub fn has_valid_mesh_data(&self) -> bool {
        self.lods.first().map_or(false, LodData::has_valid_mesh_data)
    }

    pub fn should_render(&self) -> bool {
        self.visible && self.has_valid_mesh_data()
    }

    /// Verify that `config` agrees with the configuration fixed at creation
    ///
    /// Mesh owners call this before routing new geometry into an existing
    /// section; a mismatch is a caller bug and is never coerced.
    pub fn check_compatibility(&self, config: &SectionConfig) -> SectionResult<()> {
        let own = self.config();
        if own.tangent_precision != config.tangent_precision {
            return Err(SectionError::ConfigurationMismatch {
                field: "tangent precision",
            });
        }
        if own.uv_precision != config.uv_precision {
            return Err(SectionError::ConfigurationMismatch {
                field: "uv precision",
            });
        }
        if own.uv_channels != config.uv_channels {
            return Err(SectionError::ConfigurationMismatch {
                field: "uv channel count",
            });
        }
        if own.index_width != config.index_width {
            return Err(SectionError::ConfigurationMismatch {
                field: "index width",
            });
        }
        Ok(())
    }

    /// Grow the LOD list to cover `lod_index`, cloning LOD 0's configuration
    /// for every newly created level
    pub fn ensure_lod(&mut self, lod_index: usize) {
        assert!(lod_index < MAX_LODS, "LOD index {} exceeds MAX_LODS", lod_index);
        if lod_index >= self.lods.len() {
            let config = self.lods[0].config();
            while self.lods.len() <= lod_index {
                log::debug!("section growing to LOD {}", self.lods.len());
                self.lods.push(LodData::new(&config));
            }
        }
    }

    /// Replace the position stream of one LOD
    ///
    /// Passing an owned `Vec` is the move fast path; the typed variant copies.
    /// On LOD 0 the bounding box is recomputed from the new positions - an
    /// O(n) walk that must not be skipped - unless the caller supplies an
    /// explicit box via [`Section::update_positions_with_bounds`].
    pub fn update_positions(&mut self, lod_index: usize, data: Vec<u8>) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].positions.buffer_mut().set_data(data)?;
        if lod_index == 0 {
            self.update_bounding_box();
        }
        Ok(())
    }

    /// Position replace with a caller-supplied bounding box override
    pub fn update_positions_with_bounds(
        &mut self,
        lod_index: usize,
        data: Vec<u8>,
        bounds: Aabb,
    ) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].positions.buffer_mut().set_data(data)?;
        if lod_index == 0 {
            self.bounding_box = bounds;
        }
        Ok(())
    }

    pub fn update_positions_typed(
        &mut self,
        lod_index: usize,
        positions: &[[f32; 3]],
    ) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].positions.buffer_mut().set_typed(positions)?;
        if lod_index == 0 {
            self.update_bounding_box();
        }
        Ok(())
    }

    /// Replace the tangent stream of one LOD
    pub fn update_tangents(&mut self, lod_index: usize, data: Vec<u8>) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].tangents.buffer_mut().set_data(data)
    }

    pub fn update_tangents_typed<T: bytemuck::Pod>(
        &mut self,
        lod_index: usize,
        tangents: &[T],
    ) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].tangents.buffer_mut().set_typed(tangents)
    }

    /// Replace the UV stream of one LOD
    pub fn update_uvs(&mut self, lod_index: usize, data: Vec<u8>) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].uvs.buffer_mut().set_data(data)
    }

    pub fn update_uvs_typed<T: bytemuck::Pod>(
        &mut self,
        lod_index: usize,
        uvs: &[T],
    ) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].uvs.buffer_mut().set_typed(uvs)
    }

    /// Replace the color stream of one LOD
    pub fn update_colors(&mut self, lod_index: usize, data: Vec<u8>) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].colors.buffer_mut().set_data(data)
    }

    pub fn update_colors_typed(
        &mut self,
        lod_index: usize,
        colors: &[[u8; 4]],
    ) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].colors.buffer_mut().set_typed(colors)
    }

    /// Replace the triangle index stream of one LOD
    pub fn update_indices(&mut self, lod_index: usize, data: Vec<u8>) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].indices.set_data(data)
    }

    pub fn update_indices_typed<T: bytemuck::Pod>(
        &mut self,
        lod_index: usize,
        indices: &[T],
    ) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].indices.set_typed(indices)
    }

    /// Replace the adjacency index stream of one LOD
    pub fn update_adjacency_indices(
        &mut self,
        lod_index: usize,
        data: Vec<u8>,
    ) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].adjacency_indices.set_data(data)
    }

    pub fn update_adjacency_indices_typed<T: bytemuck::Pod>(
        &mut self,
        lod_index: usize,
        indices: &[T],
    ) -> SectionResult<()> {
        self.ensure_lod(lod_index);
        self.lods[lod_index].adjacency_indices.set_typed(indices)
    }

    /// Flag toggles; no side effects beyond the flag itself. Collision
    /// re-baking is the physics collaborator's job, triggered by observing
    /// the flag change.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_casts_shadow(&mut self, casts_shadow: bool) {
        self.casts_shadow = casts_shadow;
    }

    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.collision_enabled = enabled;
    }

    /// Recompute the bounding box from LOD 0's position stream
    pub fn update_bounding_box(&mut self) {
        self.bounding_box = aabb_from_positions(self.lods[0].positions.buffer().data());
    }

    pub fn set_bounding_box(&mut self, bounding_box: Aabb) {
        self.bounding_box = bounding_box;
    }

    /// Drop position, triangle index and adjacency data from every LOD,
    /// keeping flags, bounds and buffer configuration. Codec use only: the
    /// geometry in pre-overhaul archives is unrecoverable under the current
    /// in-memory layout.
    pub(crate) fn zero_legacy_geometry(&mut self) {
        for lod in &mut self.lods {
            lod.positions.buffer_mut().clear();
            lod.indices.clear();
            lod.adjacency_indices.clear();
        }
    }

    /// Reconstruct a section directly from decoded state. Codec use only.
    pub(crate) fn from_parts(
        update_frequency: UpdateFrequency,
        lods: Vec<LodData>,
        bounding_box: Aabb,
        collision_enabled: bool,
        visible: bool,
        casts_shadow: bool,
    ) -> Self {
        assert!(!lods.is_empty(), "a section always has LOD 0");
        Self {
            update_frequency,
            lods,
            bounding_box,
            collision_enabled,
            visible,
            casts_shadow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    fn quad_section() -> Section {
        let mut section = Section::new(SectionConfig::default(), UpdateFrequency::Average);
        section
            .update_positions_typed(
                0,
                &[
                    [0.0, 0.0, 0.0],
                    [1.0, 0.0, 0.0],
                    [1.0, 1.0, 0.0],
                    [0.0, 1.0, 0.0],
                ],
            )
            .unwrap();
        section.update_indices_typed(0, &[0u16, 1, 2, 2, 3, 0]).unwrap();
        section
    }

    #[test]
    fn test_new_section_defaults() {
        let section = Section::new(SectionConfig::default(), UpdateFrequency::Rare);
        assert_eq!(section.lod_count(), 1);
        assert!(section.is_visible());
        assert!(section.casts_shadow());
        assert!(!section.is_collision_enabled());
        assert!(!section.has_valid_mesh_data());
        assert!(!section.should_render());
    }

    #[test]
    fn test_valid_mesh_data_predicate() {
        let mut section = quad_section();
        assert!(section.has_valid_mesh_data());
        assert!(section.should_render());

        // A populated attribute stream with a diverging element count breaks
        // the cross-buffer correlation
        section.update_colors_typed(0, &[[255u8, 0, 0, 255]; 3]).unwrap();
        assert!(!section.has_valid_mesh_data());

        section.update_colors_typed(0, &[[255u8, 0, 0, 255]; 4]).unwrap();
        assert!(section.has_valid_mesh_data());
    }

    #[test]
    fn test_lazy_lod_growth_clones_config() {
        let config = SectionConfig {
            tangent_precision: TangentPrecision::Extended,
            uv_precision: UvPrecision::Full,
            uv_channels: 2,
            index_width: IndexWidth::U32,
        };
        let mut section = Section::new(config, UpdateFrequency::Frequent);
        section.update_indices_typed(3, &[0u32, 1, 2]).unwrap();

        assert_eq!(section.lod_count(), 4);
        for lod in section.lods() {
            assert_eq!(lod.config(), config);
        }
    }

    #[test]
    fn test_lod0_position_update_recomputes_bounds() {
        let section = quad_section();
        let bounds = section.bounding_box();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_explicit_bounds_override_skips_recompute() {
        let mut section = quad_section();
        let custom = Aabb::new(Point3::new(-5.0, -5.0, -5.0), Point3::new(5.0, 5.0, 5.0));
        let data: Vec<u8> = bytemuck::cast_slice(&[[2.0f32, 2.0, 2.0]]).to_vec();
        section.update_positions_with_bounds(0, data, custom).unwrap();
        assert_eq!(section.bounding_box(), custom);
    }

    #[test]
    fn test_non_lod0_positions_leave_bounds_alone() {
        let mut section = quad_section();
        let before = section.bounding_box();
        section
            .update_positions_typed(1, &[[100.0, 100.0, 100.0]])
            .unwrap();
        assert_eq!(section.bounding_box(), before);
    }

    #[test]
    fn test_configuration_mismatch_surfaced() {
        let section = Section::new(SectionConfig::default(), UpdateFrequency::Average);
        let other = SectionConfig {
            index_width: IndexWidth::U32,
            ..SectionConfig::default()
        };
        assert!(matches!(
            section.check_compatibility(&other),
            Err(SectionError::ConfigurationMismatch { field: "index width" })
        ));
        assert!(section.check_compatibility(&section.config()).is_ok());
    }

    #[test]
    fn test_flag_toggles_have_no_side_effects() {
        let mut section = quad_section();
        let bounds = section.bounding_box();
        section.set_visible(false);
        section.set_casts_shadow(false);
        section.set_collision_enabled(true);
        assert!(!section.is_visible());
        assert!(!section.should_render());
        assert!(!section.casts_shadow());
        assert!(section.is_collision_enabled());
        assert_eq!(section.bounding_box(), bounds);
        assert!(section.has_valid_mesh_data());
    }

    #[test]
    #[should_panic(expected = "exceeds MAX_LODS")]
    fn test_lod_index_past_maximum_panics() {
        let mut section = quad_section();
        section.ensure_lod(MAX_LODS);
    }
}
