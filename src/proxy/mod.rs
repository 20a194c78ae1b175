//! Consumer-side section mirror
//!
//! The rendering collaborator owns one [`SectionProxy`] per section. Proxies
//! are built and mutated only inside the consumer context, and only by
//! ingesting packets; they never see the producer's `Section`. Each LOD slot
//! moves `Absent -> Materialized(non-renderable) -> Materialized(renderable)`
//! and never backward, except when a later creation packet replaces the whole
//! proxy.
//!
//! A non-renderable LOD is a normal steady state, not a failure: it simply
//! contributes nothing to draw submission until a later packet completes it.

use std::thread::{self, ThreadId};

use crate::buffer::{
    ColorBuffer, IndexBuffer, PositionBuffer, TangentBuffer, TangentPrecision, UvBuffer,
    UvPrecision, VertexBuffer,
};
use crate::constants::mesh::{INDICES_PER_ADJACENCY_PATCH, INDICES_PER_TRIANGLE, MAX_LODS};
use crate::packet::{
    BufferSet, CreationPacket, IndexBufferParams, LodBufferParams, PropertyPacket, UpdatePacket,
    VertexBufferParams,
};
use crate::section::{SectionConfig, UpdateFrequency};

/// Consumer capability tier, fixed when the proxy is created
///
/// `Mobile` consumers cannot draw adjacency patch lists; batch construction
/// falls back to `None` when a material demands adjacency there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureLevel {
    Mobile,
    Desktop,
}

/// Meaning of one attribute stream in the derived layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSemantic {
    Position,
    Tangents,
    TexCoords,
    Color,
}

/// Memory format of one attribute stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    Float3,
    PackedNormalPair,
    WideNormalPair,
    HalfUvPair,
    FloatUvPair,
    Rgba8,
}

/// One entry of the derived vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: AttributeSemantic,
    pub format: AttributeFormat,
    pub stride: u32,
    /// Consecutive channels sharing this stream (UVs only; 1 elsewhere)
    pub channels: u32,
}

/// Derived vertex-layout description for one LOD
///
/// Depends only on which attribute streams are populated and their formats,
/// never on index data. This is the render backend's input for building its
/// actual pipeline vertex state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBinding {
    pub attributes: Vec<VertexAttribute>,
}

/// Draw-batch descriptor for one LOD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBatch {
    pub uses_adjacency: bool,
    pub primitive_count: u32,
    pub first_index: u32,
    pub min_vertex_index: u32,
    pub max_vertex_index: u32,
    pub casts_shadow: bool,
}

/// Consumer-side mirror of one LOD
#[derive(Debug, Clone, PartialEq)]
pub struct LodProxy {
    pub positions: PositionBuffer,
    pub tangents: TangentBuffer,
    pub uvs: UvBuffer,
    pub colors: ColorBuffer,
    pub indices: IndexBuffer,
    pub adjacency_indices: IndexBuffer,
    binding: Option<VertexBinding>,
}

impl LodProxy {
    fn new(config: &SectionConfig) -> Self {
        Self {
            positions: PositionBuffer::new(),
            tangents: TangentBuffer::new(config.tangent_precision),
            uvs: UvBuffer::new(config.uv_precision, config.uv_channels),
            colors: ColorBuffer::new(),
            indices: IndexBuffer::new(config.index_width),
            adjacency_indices: IndexBuffer::new(config.index_width),
            binding: None,
        }
    }

    fn config(&self) -> SectionConfig {
        SectionConfig {
            tangent_precision: self.tangents.precision(),
            uv_precision: self.uvs.precision(),
            uv_channels: self.uvs.channels(),
            index_width: self.indices.width(),
        }
    }

    /// Consumer-side renderability check
    ///
    /// Re-evaluated independently here because packets may arrive with stale
    /// or partial data relative to what this proxy already holds.
    pub fn can_render(&self) -> bool {
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

    pub fn binding(&self) -> Option<&VertexBinding> {
        self.binding.as_ref()
    }

    /// Derive the vertex layout from the populated attribute streams
    fn derive_binding(&self) -> VertexBinding {
        let mut attributes = vec![VertexAttribute {
            semantic: AttributeSemantic::Position,
            format: AttributeFormat::Float3,
            stride: PositionBuffer::STRIDE,
            channels: 1,
        }];
        if self.tangents.vertex_count() > 0 {
            attributes.push(VertexAttribute {
                semantic: AttributeSemantic::Tangents,
                format: match self.tangents.precision() {
                    TangentPrecision::Compact => AttributeFormat::PackedNormalPair,
                    TangentPrecision::Extended => AttributeFormat::WideNormalPair,
                },
                stride: self.tangents.buffer().stride(),
                channels: 1,
            });
        }
        if self.uvs.vertex_count() > 0 {
            attributes.push(VertexAttribute {
                semantic: AttributeSemantic::TexCoords,
                format: match self.uvs.precision() {
                    UvPrecision::Half => AttributeFormat::HalfUvPair,
                    UvPrecision::Full => AttributeFormat::FloatUvPair,
                },
                stride: self.uvs.buffer().stride(),
                channels: self.uvs.channels(),
            });
        }
        if self.colors.vertex_count() > 0 {
            attributes.push(VertexAttribute {
                semantic: AttributeSemantic::Color,
                format: AttributeFormat::Rgba8,
                stride: ColorBuffer::STRIDE,
                channels: 1,
            });
        }
        VertexBinding { attributes }
    }

    fn refresh_binding(&mut self) {
        self.binding = self.can_render().then(|| self.derive_binding());
    }

    fn holds_resources(&self) -> bool {
        self.binding.is_some()
            || !self.positions.buffer().is_empty()
            || !self.tangents.buffer().is_empty()
            || !self.uvs.buffer().is_empty()
            || !self.colors.buffer().is_empty()
            || !self.indices.is_empty()
            || !self.adjacency_indices.is_empty()
    }

    fn release(&mut self) {
        self.positions.buffer_mut().clear();
        self.tangents.buffer_mut().clear();
        self.uvs.buffer_mut().clear();
        self.colors.buffer_mut().clear();
        self.indices.clear();
        self.adjacency_indices.clear();
        self.binding = None;
    }
}

/// Consumer-side mirror of one section
#[derive(Debug)]
pub struct SectionProxy {
    feature_level: FeatureLevel,
    update_frequency: UpdateFrequency,
    lods: Vec<LodProxy>,
    visible: bool,
    casts_shadow: bool,
    home_thread: ThreadId,
}

impl SectionProxy {
    /// Materialize a proxy from a creation packet
    ///
    /// Every LOD in the packet is materialized and all six buffers copied in.
    /// LODs whose data fails the renderability check still exist; they just
    /// report `can_render() == false` until a later packet completes them.
    pub fn new(feature_level: FeatureLevel, packet: CreationPacket) -> Self {
        let mut lods = Vec::with_capacity(packet.lods.len());
        for (lod_index, lod_params) in packet.lods.into_iter().enumerate() {
            let config = SectionConfig {
                tangent_precision: lod_params.tangents.precision,
                uv_precision: lod_params.uvs.precision,
                uv_channels: lod_params.uvs.channels,
                index_width: lod_params.indices.width,
            };
            let mut lod = LodProxy::new(&config);
            ingest_lod(&mut lod, lod_params);
            lod.refresh_binding();
            if lod.binding.is_none() {
                log::debug!("LOD {} materialized without renderable data", lod_index);
            }
            lods.push(lod);
        }
        assert!(!lods.is_empty(), "a creation packet always carries LOD 0");

        Self {
            feature_level,
            update_frequency: packet.update_frequency,
            lods,
            visible: packet.visible,
            casts_shadow: packet.casts_shadow,
            home_thread: thread::current().id(),
        }
    }

    pub fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    pub fn lod(&self, lod_index: usize) -> &LodProxy {
        &self.lods[lod_index]
    }

    pub fn lods(&self) -> &[LodProxy] {
        &self.lods
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn casts_shadow(&self) -> bool {
        self.casts_shadow
    }

    /// Whether any LOD holds renderable data
    pub fn can_render(&self) -> bool {
        self.lods.iter().any(LodProxy::can_render)
    }

    pub fn should_render(&self) -> bool {
        self.visible && self.can_render()
    }

    /// Rarely updated sections prefer the consumer's static submission path
    pub fn prefers_static_path(&self) -> bool {
        self.update_frequency == UpdateFrequency::Rare
    }

    /// Grow the LOD list to cover `lod_index`
    ///
    /// Mirrors the producer-side lazy-growth rule - new slots clone LOD 0's
    /// configuration - so LOD indices stay consistent across the boundary.
    pub fn ensure_lod(&mut self, lod_index: usize) {
        assert!(lod_index < MAX_LODS, "LOD index {} exceeds MAX_LODS", lod_index);
        if lod_index >= self.lods.len() {
            let config = self.lods[0].config();
            while self.lods.len() <= lod_index {
                log::debug!("proxy synthesizing LOD {}", self.lods.len());
                self.lods.push(LodProxy::new(&config));
            }
        }
    }

    /// Ingest a partial update for one LOD
    ///
    /// Only buffers named by the packet's mask are replaced; everything else,
    /// including the derived binding when no attribute stream changed, is left
    /// untouched. A cross-buffer count mismatch after ingestion degrades the
    /// LOD to non-renderable and is logged; other LODs are unaffected.
    pub fn apply_update(&mut self, packet: UpdatePacket) {
        self.ensure_lod(packet.lod_index);
        let lod = &mut self.lods[packet.lod_index];
        let buffers = packet.buffers;

        if buffers.contains(BufferSet::POSITIONS) {
            ingest_vertex_params(lod.positions.buffer_mut(), packet.positions, "positions");
        }
        if buffers.contains(BufferSet::TANGENTS) {
            ingest_vertex_params(lod.tangents.buffer_mut(), packet.tangents.inner, "tangents");
        }
        if buffers.contains(BufferSet::UVS) {
            ingest_vertex_params(lod.uvs.buffer_mut(), packet.uvs.inner, "uvs");
        }
        if buffers.contains(BufferSet::COLORS) {
            ingest_vertex_params(lod.colors.buffer_mut(), packet.colors, "colors");
        }
        if buffers.contains(BufferSet::INDICES) {
            ingest_index_params(&mut lod.indices, packet.indices, "indices");
        }
        if buffers.contains(BufferSet::ADJACENCY_INDICES) {
            ingest_index_params(
                &mut lod.adjacency_indices,
                packet.adjacency_indices,
                "adjacency indices",
            );
        }

        // The binding depends on attribute memory layout, not index content
        if buffers.intersects(BufferSet::ATTRIBUTES) {
            lod.refresh_binding();
        }

        if !lod.can_render() {
            log::warn!(
                "LOD {} degraded to non-renderable after update of {:?}",
                packet.lod_index,
                buffers
            );
        }
    }

    /// Ingest a flags-only update
    pub fn apply_properties(&mut self, packet: PropertyPacket) {
        self.visible = packet.visible;
        self.casts_shadow = packet.casts_shadow;
    }

    /// Draw-batch descriptor for one LOD, or `None` when the LOD must not be
    /// submitted
    ///
    /// `wants_adjacency` selects the adjacency stream (12 indices per patch)
    /// over the triangle list; an empty adjacency stream, a non-renderable
    /// LOD, or a `Mobile` consumer suppresses submission rather than erroring.
    pub fn mesh_batch(&self, lod_index: usize, wants_adjacency: bool) -> Option<MeshBatch> {
        let lod = self.lods.get(lod_index)?;
        if !lod.can_render() {
            return None;
        }

        let (index_count, indices_per_primitive) = if wants_adjacency {
            if self.feature_level == FeatureLevel::Mobile {
                return None;
            }
            if lod.adjacency_indices.index_count() == 0 {
                return None;
            }
            (lod.adjacency_indices.index_count(), INDICES_PER_ADJACENCY_PATCH)
        } else {
            (lod.indices.index_count(), INDICES_PER_TRIANGLE)
        };

        Some(MeshBatch {
            uses_adjacency: wants_adjacency,
            primitive_count: index_count / indices_per_primitive,
            first_index: 0,
            min_vertex_index: 0,
            max_vertex_index: lod.positions.vertex_count() - 1,
            casts_shadow: self.casts_shadow,
        })
    }

    /// Release all derived state and buffer storage
    ///
    /// Must run inside the consumer context that created this proxy, before
    /// the proxy is dropped; asserted rather than dispatched automatically.
    pub fn release_resources(&mut self) {
        assert_eq!(
            thread::current().id(),
            self.home_thread,
            "proxy resources must be released on the consumer thread that created them"
        );
        for lod in &mut self.lods {
            lod.release();
        }
    }
}

impl Drop for SectionProxy {
    /// Teardown belongs on the consumer thread via
    /// [`SectionProxy::release_resources`]. A proxy dropped elsewhere with
    /// resources still held is a missed release; warned rather than asserted
    /// because the buffers are plain owned memory and unwinding here could
    /// already be in progress.
    fn drop(&mut self) {
        if thread::current().id() != self.home_thread
            && self.lods.iter().any(LodProxy::holds_resources)
        {
            log::warn!("section proxy dropped off its consumer thread without releasing resources");
        }
    }
}

fn ingest_lod(lod: &mut LodProxy, params: LodBufferParams) {
    ingest_vertex_params(lod.positions.buffer_mut(), params.positions, "positions");
    ingest_vertex_params(lod.tangents.buffer_mut(), params.tangents.inner, "tangents");
    ingest_vertex_params(lod.uvs.buffer_mut(), params.uvs.inner, "uvs");
    ingest_vertex_params(lod.colors.buffer_mut(), params.colors, "colors");
    ingest_index_params(&mut lod.indices, params.indices, "indices");
    ingest_index_params(&mut lod.adjacency_indices, params.adjacency_indices, "adjacency indices");
}

/// Move one packet payload into a consumer buffer
///
/// A payload whose length disagrees with the buffer's stride is stale or
/// corrupt; the buffer is left empty so the LOD degrades instead of erroring.
fn ingest_vertex_params(buffer: &mut VertexBuffer, params: VertexBufferParams, label: &str) {
    if let Err(err) = buffer.set_data(params.data) {
        log::warn!("discarding stale {} payload: {}", label, err);
        buffer.clear();
    }
}

fn ingest_index_params(buffer: &mut IndexBuffer, params: IndexBufferParams, label: &str) {
    if params.width != buffer.width() {
        log::warn!(
            "discarding {} payload with mismatched index width {:?}",
            label,
            params.width
        );
        buffer.clear();
        return;
    }
    if let Err(err) = buffer.set_data(params.data) {
        log::warn!("discarding stale {} payload: {}", label, err);
        buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::IndexWidth;
    use crate::section::{Section, SectionConfig};

    fn populated_section() -> Section {
        let mut section = Section::new(SectionConfig::default(), UpdateFrequency::Average);
        section
            .update_positions_typed(0, &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
            .unwrap();
        section.update_indices_typed(0, &[0u16, 1, 2]).unwrap();
        section.update_colors_typed(0, &[[10u8, 20, 30, 255]; 3]).unwrap();
        section
    }

    fn proxy_for(section: &Section) -> SectionProxy {
        SectionProxy::new(FeatureLevel::Desktop, section.to_creation_packet())
    }

    #[test]
    fn test_creation_materializes_renderable_lod() {
        let section = populated_section();
        let proxy = proxy_for(&section);

        assert_eq!(proxy.lod_count(), 1);
        assert!(proxy.lod(0).can_render());
        assert!(proxy.can_render());
        assert!(proxy.should_render());

        let binding = proxy.lod(0).binding().expect("renderable LOD has a binding");
        let semantics: Vec<_> = binding.attributes.iter().map(|a| a.semantic).collect();
        assert_eq!(
            semantics,
            vec![AttributeSemantic::Position, AttributeSemantic::Color]
        );
    }

    #[test]
    fn test_invalid_lod_is_normal_not_error() {
        let section = Section::new(SectionConfig::default(), UpdateFrequency::Average);
        let proxy = proxy_for(&section);

        assert_eq!(proxy.lod_count(), 1);
        assert!(!proxy.lod(0).can_render());
        assert!(!proxy.can_render());
        assert!(proxy.lod(0).binding().is_none());
    }

    #[test]
    fn test_update_lazy_growth_synthesizes_lods_with_lod0_config() {
        let config = SectionConfig {
            tangent_precision: TangentPrecision::Extended,
            uv_precision: UvPrecision::Full,
            uv_channels: 3,
            index_width: IndexWidth::U32,
        };
        let mut section = Section::new(config, UpdateFrequency::Average);
        section
            .update_positions_typed(0, &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
            .unwrap();
        section.update_indices_typed(0, &[0u32, 1, 2]).unwrap();

        let mut proxy = proxy_for(&section);
        assert_eq!(proxy.lod_count(), 1);

        section.update_indices_typed(4, &[0u32, 2, 1]).unwrap();
        proxy.apply_update(section.to_update_packet(4, BufferSet::INDICES));

        // Slots 0..=4 all exist and share LOD 0's configuration
        assert_eq!(proxy.lod_count(), 5);
        for lod in proxy.lods() {
            assert_eq!(lod.config(), config);
        }
    }

    #[test]
    fn test_masked_color_update_isolated() {
        let mut section = populated_section();
        let mut proxy = proxy_for(&section);

        let positions_before = proxy.lod(0).positions.clone();
        let indices_before = proxy.lod(0).indices.clone();
        let binding_before = proxy.lod(0).binding().cloned();

        section.update_colors_typed(0, &[[1u8, 1, 1, 1]; 3]).unwrap();
        proxy.apply_update(section.to_update_packet(0, BufferSet::COLORS));

        assert_eq!(proxy.lod(0).colors.buffer().data(), [1u8, 1, 1, 1].repeat(3).as_slice());
        assert_eq!(proxy.lod(0).positions, positions_before);
        assert_eq!(proxy.lod(0).indices, indices_before);
        // Colors stayed populated with the same count, so the re-derived
        // binding is value-identical
        assert_eq!(proxy.lod(0).binding().cloned(), binding_before);
    }

    #[test]
    fn test_index_only_update_leaves_binding_untouched() {
        let mut section = populated_section();
        let mut proxy = proxy_for(&section);
        let binding_before = proxy.lod(0).binding().cloned();

        section.update_indices_typed(0, &[2u16, 1, 0]).unwrap();
        proxy.apply_update(section.to_update_packet(0, BufferSet::INDICES));

        assert_eq!(proxy.lod(0).binding().cloned(), binding_before);
        assert_eq!(proxy.lod(0).indices.index_at(0), 2);
    }

    #[test]
    fn test_stale_partial_data_degrades_lod() {
        let mut section = populated_section();
        let mut proxy = proxy_for(&section);
        assert!(proxy.lod(0).can_render());

        // Shrink only the position stream; colors still carry three elements
        section.update_positions_typed(0, &[[0.0, 0.0, 0.0]]).unwrap();
        proxy.apply_update(section.to_update_packet(0, BufferSet::POSITIONS));

        assert!(!proxy.lod(0).can_render());
        assert!(!proxy.can_render());
    }

    #[test]
    fn test_property_packet_touches_flags_only() {
        let mut section = populated_section();
        let mut proxy = proxy_for(&section);

        section.set_visible(false);
        section.set_casts_shadow(false);
        proxy.apply_properties(section.to_property_packet());

        assert!(!proxy.is_visible());
        assert!(!proxy.casts_shadow());
        assert!(!proxy.should_render());
        // Geometry untouched
        assert!(proxy.lod(0).can_render());
    }

    #[test]
    fn test_mesh_batch_triangle_list() {
        let section = populated_section();
        let proxy = proxy_for(&section);
        let batch = proxy.mesh_batch(0, false).expect("renderable LOD");
        assert!(!batch.uses_adjacency);
        assert_eq!(batch.primitive_count, 1);
        assert_eq!(batch.min_vertex_index, 0);
        assert_eq!(batch.max_vertex_index, 2);
        assert!(batch.casts_shadow);
    }

    #[test]
    fn test_mesh_batch_adjacency_selection() {
        let mut section = populated_section();
        section
            .update_adjacency_indices_typed(0, &[0u16, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2])
            .unwrap();
        let proxy = proxy_for(&section);

        let batch = proxy.mesh_batch(0, true).expect("adjacency data is present");
        assert!(batch.uses_adjacency);
        assert_eq!(batch.primitive_count, 1);
    }

    #[test]
    fn test_mesh_batch_suppressed_not_errored() {
        let section = populated_section();
        let proxy = proxy_for(&section);
        // Adjacency demanded but the stream is empty
        assert!(proxy.mesh_batch(0, true).is_none());
        // Out-of-range LOD
        assert!(proxy.mesh_batch(3, false).is_none());

        // Mobile consumers never get adjacency batches
        let mut section = populated_section();
        section
            .update_adjacency_indices_typed(0, &[0u16, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2])
            .unwrap();
        let mobile = SectionProxy::new(FeatureLevel::Mobile, section.to_creation_packet());
        assert!(mobile.mesh_batch(0, true).is_none());
        assert!(mobile.mesh_batch(0, false).is_some());
    }

    #[test]
    fn test_drop_off_home_thread_warns_not_panics() {
        let section = populated_section();
        let proxy = proxy_for(&section);
        // The missed-release path degrades to a warning; nothing may panic
        std::thread::spawn(move || drop(proxy))
            .join()
            .expect("drop thread");

        let mut released = proxy_for(&section);
        released.release_resources();
        std::thread::spawn(move || drop(released))
            .join()
            .expect("drop thread");
    }

    #[test]
    fn test_release_resources_on_home_thread() {
        let section = populated_section();
        let mut proxy = proxy_for(&section);
        proxy.release_resources();
        assert!(!proxy.can_render());
        assert!(proxy.lod(0).binding().is_none());
    }
}
