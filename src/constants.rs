//! Crate-wide constants shared by the section, proxy and codec layers.

/// Mesh layout constants
pub mod mesh {
    /// Maximum number of LOD levels a section may carry
    pub const MAX_LODS: usize = 8;

    /// Maximum UV channels a vertex stream may carry
    pub const MAX_UV_CHANNELS: u32 = 8;

    /// Indices consumed per primitive in triangle-list mode
    pub const INDICES_PER_TRIANGLE: u32 = 3;

    /// Indices consumed per primitive when adjacency data is active
    /// (12-control-point patch list)
    pub const INDICES_PER_ADJACENCY_PATCH: u32 = 12;
}

/// Archive format constants
pub mod archive {
    /// Magic bytes identifying a serialized mesh section
    pub const SECTION_MAGIC: [u8; 4] = *b"RMSH";

    /// Legacy format: interleaved stream-structure descriptors, no precision
    /// metadata, triple-encoded position slot, geometry zeroed post-load
    pub const VERSION_LEGACY: u32 = 1;

    /// Buffer overhaul: stride-typed buffers with precision/channel metadata,
    /// payload checksum, still a single inline LOD
    pub const VERSION_BUFFER_OVERHAUL: u32 = 2;

    /// LOD support: explicit LOD count followed by a LOD sequence
    pub const VERSION_LOD_SUPPORT: u32 = 3;

    /// Version written by the current encoder
    pub const CURRENT_VERSION: u32 = VERSION_LOD_SUPPORT;
}
