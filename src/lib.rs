//! Runtime-generated mesh sections with LODs, update packets and a
//! versioned binary archive format.
//!
//! The crate is split along the producer/consumer boundary. The producer
//! side owns [`Section`]: authoritative mesh data mutated in place, one
//! whole buffer at a time. The consumer side owns [`SectionProxy`]: derived
//! render state that is only ever touched through immutable packet
//! snapshots, normally delivered over the channel in [`transfer`]. The
//! [`codec`] module persists sections to a checksummed binary archive and
//! migrates older archive revisions on load.

pub mod bounds;
pub mod buffer;
pub mod codec;
pub mod constants;
pub mod packet;
pub mod proxy;
pub mod section;
pub mod transfer;

pub use bounds::Aabb;
pub use buffer::{IndexWidth, TangentPrecision, UvPrecision};
pub use codec::{load_from_file, read_section, save_to_file, write_section, CodecError};
pub use packet::{BufferSet, CreationPacket, PropertyPacket, UpdatePacket};
pub use proxy::{FeatureLevel, MeshBatch, SectionProxy};
pub use section::{
    Section, SectionConfig, SectionError, SectionResult, TriangleIndices, UpdateFrequency,
};
pub use transfer::{section_channel, SectionCommand, SectionCommandReceiver, SectionCommandSender};
