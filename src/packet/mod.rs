//! Update packets: immutable snapshots crossing the producer/consumer boundary
//!
//! A packet is a flat, owned copy of section state with no reference back to
//! the section it came from. That is the whole concurrency story: the producer
//! context extracts a packet, sends it by value, and the consumer context
//! ingests it - no shared mutable state ever crosses the boundary.
//!
//! For partial updates the [`BufferSet`] mask, not field presence, is
//! authoritative: unmasked payload fields are left default-empty and must be
//! ignored by the consumer.

use bitflags::bitflags;

use crate::buffer::{IndexWidth, TangentPrecision, UvPrecision};
use crate::section::{LodData, Section, UpdateFrequency};

bitflags! {
    /// Which buffers of one LOD an update packet carries
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferSet: u8 {
        const POSITIONS = 1 << 0;
        const TANGENTS = 1 << 1;
        const UVS = 1 << 2;
        const COLORS = 1 << 3;
        const INDICES = 1 << 4;
        const ADJACENCY_INDICES = 1 << 5;

        /// The attribute streams; the vertex-layout binding depends on these
        /// and not on the two index streams
        const ATTRIBUTES = Self::POSITIONS.bits()
            | Self::TANGENTS.bits()
            | Self::UVS.bits()
            | Self::COLORS.bits();
    }
}

/// Snapshot of one attribute stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBufferParams {
    pub data: Vec<u8>,
    pub vertex_count: u32,
}

/// Snapshot of the tangent stream with its precision tag
#[derive(Debug, Clone, PartialEq)]
pub struct TangentBufferParams {
    pub precision: TangentPrecision,
    pub inner: VertexBufferParams,
}

impl Default for TangentBufferParams {
    fn default() -> Self {
        Self {
            precision: TangentPrecision::Compact,
            inner: VertexBufferParams::default(),
        }
    }
}

/// Snapshot of the UV stream with its precision and channel count
#[derive(Debug, Clone, PartialEq)]
pub struct UvBufferParams {
    pub precision: UvPrecision,
    pub channels: u32,
    pub inner: VertexBufferParams,
}

impl Default for UvBufferParams {
    fn default() -> Self {
        Self {
            precision: UvPrecision::Half,
            channels: 1,
            inner: VertexBufferParams::default(),
        }
    }
}

/// Snapshot of an index stream with its width tag
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBufferParams {
    pub width: IndexWidth,
    pub data: Vec<u8>,
    pub index_count: u32,
}

impl Default for IndexBufferParams {
    fn default() -> Self {
        Self {
            width: IndexWidth::U16,
            data: Vec::new(),
            index_count: 0,
        }
    }
}

/// Snapshot of all six buffers of one LOD
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LodBufferParams {
    pub positions: VertexBufferParams,
    pub tangents: TangentBufferParams,
    pub uvs: UvBufferParams,
    pub colors: VertexBufferParams,
    pub indices: IndexBufferParams,
    pub adjacency_indices: IndexBufferParams,
}

/// Full snapshot of a section, used exactly once at section birth
#[derive(Debug, Clone, PartialEq)]
pub struct CreationPacket {
    pub update_frequency: UpdateFrequency,
    pub lods: Vec<LodBufferParams>,
    pub visible: bool,
    pub casts_shadow: bool,
}

/// Partial snapshot: one LOD, only the masked buffers populated
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePacket {
    pub lod_index: usize,
    pub buffers: BufferSet,
    pub positions: VertexBufferParams,
    pub tangents: TangentBufferParams,
    pub uvs: UvBufferParams,
    pub colors: VertexBufferParams,
    pub indices: IndexBufferParams,
    pub adjacency_indices: IndexBufferParams,
}

/// Flags-only snapshot, no geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyPacket {
    pub visible: bool,
    pub casts_shadow: bool,
}

fn snapshot_lod(lod: &LodData) -> LodBufferParams {
    LodBufferParams {
        positions: VertexBufferParams {
            data: lod.positions.buffer().data().to_vec(),
            vertex_count: lod.positions.vertex_count(),
        },
        tangents: snapshot_tangents(lod),
        uvs: snapshot_uvs(lod),
        colors: VertexBufferParams {
            data: lod.colors.buffer().data().to_vec(),
            vertex_count: lod.colors.vertex_count(),
        },
        indices: snapshot_indices(lod),
        adjacency_indices: IndexBufferParams {
            width: lod.adjacency_indices.width(),
            data: lod.adjacency_indices.data().to_vec(),
            index_count: lod.adjacency_indices.index_count(),
        },
    }
}

fn snapshot_tangents(lod: &LodData) -> TangentBufferParams {
    TangentBufferParams {
        precision: lod.tangents.precision(),
        inner: VertexBufferParams {
            data: lod.tangents.buffer().data().to_vec(),
            vertex_count: lod.tangents.vertex_count(),
        },
    }
}

fn snapshot_uvs(lod: &LodData) -> UvBufferParams {
    UvBufferParams {
        precision: lod.uvs.precision(),
        channels: lod.uvs.channels(),
        inner: VertexBufferParams {
            data: lod.uvs.buffer().data().to_vec(),
            vertex_count: lod.uvs.vertex_count(),
        },
    }
}

fn snapshot_indices(lod: &LodData) -> IndexBufferParams {
    IndexBufferParams {
        width: lod.indices.width(),
        data: lod.indices.data().to_vec(),
        index_count: lod.indices.index_count(),
    }
}

impl Section {
    /// Snapshot every present LOD plus the visibility/shadow flags
    ///
    /// Pure read; the section is unchanged. The producer sends the result to
    /// the consumer context exactly once, before any mirror exists there.
    pub fn to_creation_packet(&self) -> CreationPacket {
        CreationPacket {
            update_frequency: self.update_frequency(),
            lods: self.lods().iter().map(snapshot_lod).collect(),
            visible: self.is_visible(),
            casts_shadow: self.casts_shadow(),
        }
    }

    /// Snapshot one LOD's buffers selected by `buffers`
    ///
    /// Unselected payload fields stay default-empty; the mask is what the
    /// consumer trusts. The LOD must already exist.
    pub fn to_update_packet(&self, lod_index: usize, buffers: BufferSet) -> UpdatePacket {
        let lod = self.lod(lod_index);

        let mut packet = UpdatePacket {
            lod_index,
            buffers,
            positions: VertexBufferParams::default(),
            // Unmasked metadata still mirrors the section configuration so a
            // consumer synthesizing missing LODs agrees with the producer
            tangents: TangentBufferParams {
                precision: lod.tangents.precision(),
                inner: VertexBufferParams::default(),
            },
            uvs: UvBufferParams {
                precision: lod.uvs.precision(),
                channels: lod.uvs.channels(),
                inner: VertexBufferParams::default(),
            },
            colors: VertexBufferParams::default(),
            indices: IndexBufferParams {
                width: lod.indices.width(),
                ..IndexBufferParams::default()
            },
            adjacency_indices: IndexBufferParams {
                width: lod.adjacency_indices.width(),
                ..IndexBufferParams::default()
            },
        };

        if buffers.contains(BufferSet::POSITIONS) {
            packet.positions = VertexBufferParams {
                data: lod.positions.buffer().data().to_vec(),
                vertex_count: lod.positions.vertex_count(),
            };
        }
        if buffers.contains(BufferSet::TANGENTS) {
            packet.tangents = snapshot_tangents(lod);
        }
        if buffers.contains(BufferSet::UVS) {
            packet.uvs = snapshot_uvs(lod);
        }
        if buffers.contains(BufferSet::COLORS) {
            packet.colors = VertexBufferParams {
                data: lod.colors.buffer().data().to_vec(),
                vertex_count: lod.colors.vertex_count(),
            };
        }
        if buffers.contains(BufferSet::INDICES) {
            packet.indices = snapshot_indices(lod);
        }
        if buffers.contains(BufferSet::ADJACENCY_INDICES) {
            packet.adjacency_indices = IndexBufferParams {
                width: lod.adjacency_indices.width(),
                data: lod.adjacency_indices.data().to_vec(),
                index_count: lod.adjacency_indices.index_count(),
            };
        }

        packet
    }

    /// Snapshot the visibility/shadow flags only
    pub fn to_property_packet(&self) -> PropertyPacket {
        PropertyPacket {
            visible: self.is_visible(),
            casts_shadow: self.casts_shadow(),
        }
    }
}
