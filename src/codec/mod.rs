//! Versioned binary serialization of mesh sections
//!
//! An archive is a bincode header (magic + format version), a crc32 checksum
//! of the payload (format 2 onward), and a little-endian payload:
//!
//! `[update_frequency][lod_count][per-LOD: position, tangents, uvs, colors,
//! indices, adjacency][bounding_box][collision][visible][casts_shadow]`
//!
//! Each vertex buffer is `[stride: i32][byte_len: u32][bytes]` with
//! precision/channel metadata ahead of it from format 2 on; index buffers
//! always carry their width tag. Decoding branches on the archive version -
//! see the version constants in [`crate::constants::archive`] for what each
//! revision changed. Encoding always writes the current version and layout.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;
use crate::buffer::{IndexWidth, TangentPrecision, UvPrecision};
use crate::constants::archive::{
    CURRENT_VERSION, SECTION_MAGIC, VERSION_BUFFER_OVERHAUL, VERSION_LEGACY, VERSION_LOD_SUPPORT,
};
use crate::constants::mesh::{MAX_LODS, MAX_UV_CHANNELS};
use crate::section::{LodData, Section, SectionConfig, UpdateFrequency};
use cgmath::Point3;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive header error: {0}")]
    Header(#[from] bincode::Error),
    #[error("not a mesh section archive (bad magic)")]
    BadMagic,
    #[error("unsupported archive version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("corrupted archive: {0}")]
    CorruptedData(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveHeader {
    magic: [u8; 4],
    version: u32,
}

/// Encode a section at the current format version
pub fn write_section<W: Write>(writer: &mut W, section: &Section) -> CodecResult<()> {
    let header = ArchiveHeader {
        magic: SECTION_MAGIC,
        version: CURRENT_VERSION,
    };
    bincode::serialize_into(&mut *writer, &header)?;

    let payload = encode_payload(section);
    let checksum = crc32fast::hash(&payload);
    writer.write_all(&checksum.to_le_bytes())?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Decode a section, branching on the archive's format version
pub fn read_section<R: Read>(reader: &mut R) -> CodecResult<Section> {
    let header: ArchiveHeader = bincode::deserialize_from(&mut *reader)?;
    if header.magic != SECTION_MAGIC {
        return Err(CodecError::BadMagic);
    }
    if header.version > CURRENT_VERSION || header.version < VERSION_LEGACY {
        return Err(CodecError::UnsupportedVersion {
            found: header.version,
        });
    }
    log::debug!("decoding mesh section archive at format {}", header.version);

    // The checksum arrived with the buffer overhaul; legacy archives predate it
    if header.version >= VERSION_BUFFER_OVERHAUL {
        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let expected = u32::from_le_bytes(checksum_bytes);

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        if crc32fast::hash(&payload) != expected {
            return Err(CodecError::CorruptedData("checksum mismatch".into()));
        }
        decode_payload(&payload, header.version)
    } else {
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        decode_payload(&payload, header.version)
    }
}

/// Encode a section to a file
pub fn save_to_file<P: AsRef<Path>>(path: P, section: &Section) -> CodecResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_section(&mut writer, section)?;
    writer.flush()?;
    Ok(())
}

/// Decode a section from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> CodecResult<Section> {
    let mut reader = BufReader::new(File::open(path)?);
    read_section(&mut reader)
}

// ---- encoding ----

fn encode_payload(section: &Section) -> Vec<u8> {
    let mut out = Vec::new();

    out.push(frequency_tag(section.update_frequency()));
    out.extend_from_slice(&(section.lod_count() as u32).to_le_bytes());

    for lod in section.lods() {
        write_plain_buffer(&mut out, lod.positions.buffer().stride(), lod.positions.buffer().data());

        out.push(tangent_tag(lod.tangents.precision()));
        write_plain_buffer(&mut out, lod.tangents.buffer().stride(), lod.tangents.buffer().data());

        out.push(uv_tag(lod.uvs.precision()));
        out.extend_from_slice(&lod.uvs.channels().to_le_bytes());
        write_plain_buffer(&mut out, lod.uvs.buffer().stride(), lod.uvs.buffer().data());

        write_plain_buffer(&mut out, lod.colors.buffer().stride(), lod.colors.buffer().data());

        write_index_buffer(&mut out, lod.indices.width(), lod.indices.data());
        write_index_buffer(&mut out, lod.adjacency_indices.width(), lod.adjacency_indices.data());
    }

    write_aabb(&mut out, &section.bounding_box());
    out.push(section.is_collision_enabled() as u8);
    out.push(section.is_visible() as u8);
    out.push(section.casts_shadow() as u8);

    out
}

fn write_plain_buffer(out: &mut Vec<u8>, stride: u32, data: &[u8]) {
    out.extend_from_slice(&(stride as i32).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
}

fn write_index_buffer(out: &mut Vec<u8>, width: IndexWidth, data: &[u8]) {
    out.push(index_width_tag(width));
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
}

fn write_aabb(out: &mut Vec<u8>, aabb: &Aabb) {
    for value in [
        aabb.min.x, aabb.min.y, aabb.min.z, aabb.max.x, aabb.max.y, aabb.max.z,
    ] {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn frequency_tag(frequency: UpdateFrequency) -> u8 {
    match frequency {
        UpdateFrequency::Rare => 0,
        UpdateFrequency::Average => 1,
        UpdateFrequency::Frequent => 2,
    }
}

fn tangent_tag(precision: TangentPrecision) -> u8 {
    match precision {
        TangentPrecision::Compact => 0,
        TangentPrecision::Extended => 1,
    }
}

fn uv_tag(precision: UvPrecision) -> u8 {
    match precision {
        UvPrecision::Half => 0,
        UvPrecision::Full => 1,
    }
}

fn index_width_tag(width: IndexWidth) -> u8 {
    match width {
        IndexWidth::U16 => 0,
        IndexWidth::U32 => 1,
    }
}

// ---- decoding ----

struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return Err(CodecError::CorruptedData("truncated payload".into()));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> CodecResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&mut self) -> CodecResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_f32(&mut self) -> CodecResult<f32> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

fn decode_payload(payload: &[u8], version: u32) -> CodecResult<Section> {
    let mut reader = PayloadReader::new(payload);

    let update_frequency = parse_frequency(reader.read_u8()?)?;

    let lods = if version >= VERSION_LOD_SUPPORT {
        let lod_count = reader.read_u32()? as usize;
        if lod_count == 0 || lod_count > MAX_LODS {
            return Err(CodecError::CorruptedData(format!(
                "archive carries {} LODs",
                lod_count
            )));
        }
        let mut lods = Vec::with_capacity(lod_count);
        for _ in 0..lod_count {
            lods.push(decode_lod(&mut reader, version)?);
        }
        lods
    } else {
        // Pre-LOD archives store exactly one LOD's buffers inline
        vec![decode_lod(&mut reader, version)?]
    };

    let bounding_box = Aabb::new(
        Point3::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?),
        Point3::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?),
    );
    let collision_enabled = reader.read_u8()? != 0;
    let visible = reader.read_u8()? != 0;
    let casts_shadow = reader.read_u8()? != 0;

    let mut section = Section::from_parts(
        update_frequency,
        lods,
        bounding_box,
        collision_enabled,
        visible,
        casts_shadow,
    );

    if version < VERSION_BUFFER_OVERHAUL {
        // Migration policy for pre-overhaul archives: the geometry they carry
        // is unrecoverable under the current in-memory layout, so position,
        // index and adjacency data are dropped on the floor. Flags and bounds
        // survive.
        section.zero_legacy_geometry();
        log::debug!("legacy archive decoded; geometry zeroed by migration policy");
    }

    Ok(section)
}

fn decode_lod(reader: &mut PayloadReader, version: u32) -> CodecResult<LodData> {
    let has_metadata = version >= VERSION_BUFFER_OVERHAUL;

    let position_data = if has_metadata {
        read_plain_buffer(reader, 12)?
    } else {
        // The pre-overhaul layout wrote the position slot three times in a
        // row; the last read wins
        let _ = read_legacy_buffer(reader)?;
        let _ = read_legacy_buffer(reader)?;
        read_legacy_buffer(reader)?
    };

    let (tangent_precision, tangent_data) = if has_metadata {
        let precision = parse_tangent(reader.read_u8()?)?;
        (precision, read_plain_buffer(reader, precision.stride())?)
    } else {
        // No precision field in legacy archives; default to compact
        (TangentPrecision::Compact, Vec::new())
    };

    let (uv_precision, uv_channels, uv_data) = if has_metadata {
        let precision = parse_uv(reader.read_u8()?)?;
        let channels = reader.read_u32()?;
        // Bound before the stride multiply; the checksum only proves the
        // archive is intact, not that its counts are sane
        if channels == 0 || channels > MAX_UV_CHANNELS {
            return Err(CodecError::CorruptedData(format!(
                "uv channel count {}",
                channels
            )));
        }
        let stride = precision.channel_size() * channels;
        (precision, channels, read_plain_buffer(reader, stride)?)
    } else {
        // No channel count in legacy archives; default to one half-precision channel
        (UvPrecision::Half, 1, Vec::new())
    };

    let color_data = if has_metadata {
        read_plain_buffer(reader, 4)?
    } else {
        Vec::new()
    };

    let (index_width, index_data) = read_index_buffer(reader)?;
    let (adjacency_width, adjacency_data) = read_index_buffer(reader)?;
    if adjacency_width != index_width {
        return Err(CodecError::CorruptedData(
            "adjacency index width disagrees with triangle index width".into(),
        ));
    }

    let config = SectionConfig {
        tangent_precision,
        uv_precision,
        uv_channels,
        index_width,
    };
    let mut lod = LodData::new(&config);
    set_buffer(lod.positions.buffer_mut(), position_data, "positions")?;
    set_buffer(lod.tangents.buffer_mut(), tangent_data, "tangents")?;
    set_buffer(lod.uvs.buffer_mut(), uv_data, "uvs")?;
    set_buffer(lod.colors.buffer_mut(), color_data, "colors")?;
    lod.indices
        .set_data(index_data)
        .map_err(|err| CodecError::CorruptedData(format!("indices: {}", err)))?;
    lod.adjacency_indices
        .set_data(adjacency_data)
        .map_err(|err| CodecError::CorruptedData(format!("adjacency indices: {}", err)))?;
    Ok(lod)
}

fn set_buffer(
    buffer: &mut crate::buffer::VertexBuffer,
    data: Vec<u8>,
    label: &str,
) -> CodecResult<()> {
    buffer
        .set_data(data)
        .map_err(|err| CodecError::CorruptedData(format!("{}: {}", label, err)))
}

/// Read `[stride][byte_len][bytes]`, validating the stride against what the
/// surrounding metadata implies
fn read_plain_buffer(reader: &mut PayloadReader, expected_stride: u32) -> CodecResult<Vec<u8>> {
    let stride = reader.read_i32()?;
    if stride != expected_stride as i32 {
        return Err(CodecError::CorruptedData(format!(
            "stride {} disagrees with expected {}",
            stride, expected_stride
        )));
    }
    let byte_len = reader.read_u32()? as usize;
    Ok(reader.take(byte_len)?.to_vec())
}

/// Read a pre-overhaul vertex buffer: an obsolete stream-structure descriptor
/// followed by the stride/data pair. The descriptor is consumed and discarded.
fn read_legacy_buffer(reader: &mut PayloadReader) -> CodecResult<Vec<u8>> {
    let element_count = reader.read_u32()?;
    for _ in 0..element_count {
        let _semantic = reader.read_u8()?;
        let _format = reader.read_u8()?;
        let _offset = reader.read_u32()?;
        let _stride = reader.read_u32()?;
    }

    let stride = reader.read_i32()?;
    if stride <= 0 {
        return Err(CodecError::CorruptedData("non-positive legacy stride".into()));
    }
    let byte_len = reader.read_u32()? as usize;
    if byte_len % stride as usize != 0 {
        return Err(CodecError::CorruptedData(
            "legacy buffer length is not a stride multiple".into(),
        ));
    }
    Ok(reader.take(byte_len)?.to_vec())
}

fn read_index_buffer(reader: &mut PayloadReader) -> CodecResult<(IndexWidth, Vec<u8>)> {
    let width = parse_index_width(reader.read_u8()?)?;
    let byte_len = reader.read_u32()? as usize;
    Ok((width, reader.take(byte_len)?.to_vec()))
}

fn parse_frequency(tag: u8) -> CodecResult<UpdateFrequency> {
    match tag {
        0 => Ok(UpdateFrequency::Rare),
        1 => Ok(UpdateFrequency::Average),
        2 => Ok(UpdateFrequency::Frequent),
        other => Err(CodecError::CorruptedData(format!(
            "unknown update frequency {}",
            other
        ))),
    }
}

fn parse_tangent(tag: u8) -> CodecResult<TangentPrecision> {
    match tag {
        0 => Ok(TangentPrecision::Compact),
        1 => Ok(TangentPrecision::Extended),
        other => Err(CodecError::CorruptedData(format!(
            "unknown tangent precision {}",
            other
        ))),
    }
}

fn parse_uv(tag: u8) -> CodecResult<UvPrecision> {
    match tag {
        0 => Ok(UvPrecision::Half),
        1 => Ok(UvPrecision::Full),
        other => Err(CodecError::CorruptedData(format!(
            "unknown uv precision {}",
            other
        ))),
    }
}

fn parse_index_width(tag: u8) -> CodecResult<IndexWidth> {
    match tag {
        0 => Ok(IndexWidth::U16),
        1 => Ok(IndexWidth::U32),
        other => Err(CodecError::CorruptedData(format!(
            "unknown index width {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::IndexWidth;

    fn populated_section() -> Section {
        let config = SectionConfig {
            tangent_precision: TangentPrecision::Extended,
            uv_precision: UvPrecision::Full,
            uv_channels: 2,
            index_width: IndexWidth::U32,
        };
        let mut section = Section::new(config, UpdateFrequency::Frequent);
        section
            .update_positions_typed(0, &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 3.0, 0.0]])
            .unwrap();
        section.update_indices_typed(0, &[0u32, 1, 2]).unwrap();
        section
            .update_uvs_typed(0, &[[0.0f32, 0.0, 0.5, 0.5], [1.0, 0.0, 0.5, 0.5], [0.0, 1.0, 0.5, 0.5]])
            .unwrap();
        section.update_indices_typed(2, &[0u32, 2, 1]).unwrap();
        section.set_collision_enabled(true);
        section.set_casts_shadow(false);
        section
    }

    #[test]
    fn test_current_version_round_trip() {
        let section = populated_section();

        let mut bytes = Vec::new();
        write_section(&mut bytes, &section).unwrap();
        let decoded = read_section(&mut bytes.as_slice()).unwrap();

        assert_eq!(decoded, section);
    }

    #[test]
    fn test_round_trip_preserves_lod_count_and_flags() {
        let section = populated_section();
        let mut bytes = Vec::new();
        write_section(&mut bytes, &section).unwrap();
        let decoded = read_section(&mut bytes.as_slice()).unwrap();

        assert_eq!(decoded.lod_count(), 3);
        assert!(decoded.is_collision_enabled());
        assert!(!decoded.casts_shadow());
        assert!(decoded.is_visible());
        assert_eq!(decoded.bounding_box(), section.bounding_box());
        assert_eq!(
            decoded.lod(0).uvs.buffer().data(),
            section.lod(0).uvs.buffer().data()
        );
    }

    #[test]
    fn test_bad_magic_rejected() {
        let section = populated_section();
        let mut bytes = Vec::new();
        write_section(&mut bytes, &section).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            read_section(&mut bytes.as_slice()),
            Err(CodecError::BadMagic)
        ));
    }

    #[test]
    fn test_future_version_rejected() {
        let header = ArchiveHeader {
            magic: SECTION_MAGIC,
            version: CURRENT_VERSION + 1,
        };
        let bytes = bincode::serialize(&header).unwrap();
        assert!(matches!(
            read_section(&mut bytes.as_slice()),
            Err(CodecError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let section = populated_section();
        let mut bytes = Vec::new();
        write_section(&mut bytes, &section).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            read_section(&mut bytes.as_slice()),
            Err(CodecError::CorruptedData(_))
        ));
    }

    /// A checksummed archive whose UV channel count is absurd must come back
    /// as corrupted data, not overflow the stride computation.
    #[test]
    fn test_oversized_uv_channel_count_rejected() {
        let mut payload = Vec::new();
        payload.push(0); // Rare
        payload.extend_from_slice(&1u32.to_le_bytes()); // one LOD
        write_plain_buffer(&mut payload, 12, &[]); // positions
        payload.push(0); // compact tangents
        write_plain_buffer(&mut payload, 8, &[]);
        payload.push(0); // half uvs
        payload.extend_from_slice(&0x4000_0000u32.to_le_bytes());

        let mut bytes = bincode::serialize(&ArchiveHeader {
            magic: SECTION_MAGIC,
            version: CURRENT_VERSION,
        })
        .unwrap();
        bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        bytes.extend_from_slice(&payload);

        assert!(matches!(
            read_section(&mut bytes.as_slice()),
            Err(CodecError::CorruptedData(_))
        ));
    }

    /// Assemble a synthetic version-2 archive by hand: single inline LOD,
    /// precision metadata, checksum, no LOD count.
    #[test]
    fn test_pre_lod_archive_decodes_as_single_lod() {
        let mut payload = Vec::new();
        payload.push(1); // Average frequency

        // position: one vertex at (1, 2, 3)
        write_plain_buffer(&mut payload, 12, bytemuck::cast_slice(&[[1.0f32, 2.0, 3.0]]));
        // tangents: compact, empty
        payload.push(0);
        write_plain_buffer(&mut payload, 8, &[]);
        // uvs: half, 1 channel, empty
        payload.push(0);
        payload.extend_from_slice(&1u32.to_le_bytes());
        write_plain_buffer(&mut payload, 4, &[]);
        // colors: empty
        write_plain_buffer(&mut payload, 4, &[]);
        // indices + adjacency: u16, empty
        write_index_buffer(&mut payload, IndexWidth::U16, &[]);
        write_index_buffer(&mut payload, IndexWidth::U16, &[]);

        write_aabb(&mut payload, &Aabb::new(Point3::new(1.0, 2.0, 3.0), Point3::new(1.0, 2.0, 3.0)));
        payload.extend_from_slice(&[0, 1, 1]);

        let mut bytes = bincode::serialize(&ArchiveHeader {
            magic: SECTION_MAGIC,
            version: VERSION_BUFFER_OVERHAUL,
        })
        .unwrap();
        bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        bytes.extend_from_slice(&payload);

        let decoded = read_section(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded.lod_count(), 1);
        assert_eq!(decoded.vertex_count(0), 1);
        assert_eq!(decoded.bounding_box().min, Point3::new(1.0, 2.0, 3.0));
    }

    fn write_legacy_vertex_buffer(payload: &mut Vec<u8>, stride: i32, data: &[u8]) {
        // Obsolete stream-structure descriptor: two dummy elements
        payload.extend_from_slice(&2u32.to_le_bytes());
        for semantic in [0u8, 1u8] {
            payload.push(semantic);
            payload.push(3); // format
            payload.extend_from_slice(&0u32.to_le_bytes()); // offset
            payload.extend_from_slice(&(stride as u32).to_le_bytes());
        }
        payload.extend_from_slice(&stride.to_le_bytes());
        payload.extend_from_slice(&(data.len() as u32).to_le_bytes());
        payload.extend_from_slice(data);
    }

    /// Assemble a synthetic version-1 archive: stream-structure descriptors,
    /// the position slot written three times, no precision metadata, no
    /// checksum. Decoding must zero the geometry but keep flags and bounds.
    #[test]
    fn test_legacy_archive_geometry_zeroed_by_policy() {
        let mut payload = Vec::new();
        payload.push(2); // Frequent

        let positions_a: &[[f32; 3]] = &[[9.0, 9.0, 9.0]];
        let positions_b: &[[f32; 3]] = &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        write_legacy_vertex_buffer(&mut payload, 12, bytemuck::cast_slice(positions_a));
        write_legacy_vertex_buffer(&mut payload, 12, bytemuck::cast_slice(positions_a));
        write_legacy_vertex_buffer(&mut payload, 12, bytemuck::cast_slice(positions_b));

        let indices: &[u16] = &[0, 1, 0];
        write_index_buffer(&mut payload, IndexWidth::U16, bytemuck::cast_slice(indices));
        write_index_buffer(&mut payload, IndexWidth::U16, bytemuck::cast_slice(indices));

        write_aabb(
            &mut payload,
            &Aabb::new(Point3::new(-1.0, -2.0, -3.0), Point3::new(4.0, 5.0, 6.0)),
        );
        payload.extend_from_slice(&[1, 1, 0]); // collision, visible, no shadow

        let mut bytes = bincode::serialize(&ArchiveHeader {
            magic: SECTION_MAGIC,
            version: VERSION_LEGACY,
        })
        .unwrap();
        bytes.extend_from_slice(&payload);

        let decoded = read_section(&mut bytes.as_slice()).unwrap();

        // Data-loss policy: geometry gone
        assert_eq!(decoded.lod_count(), 1);
        assert_eq!(decoded.vertex_count(0), 0);
        assert_eq!(decoded.index_count(0), 0);
        assert_eq!(decoded.lod(0).adjacency_indices.index_count(), 0);

        // Flags and bounds survive
        assert!(decoded.is_collision_enabled());
        assert!(decoded.is_visible());
        assert!(!decoded.casts_shadow());
        assert_eq!(decoded.bounding_box().min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(decoded.bounding_box().max, Point3::new(4.0, 5.0, 6.0));
        assert_eq!(decoded.update_frequency(), UpdateFrequency::Frequent);

        // The width tag read from the archive is retained
        assert_eq!(decoded.config().index_width, IndexWidth::U16);
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let section = populated_section();
        let mut bytes = Vec::new();
        write_section(&mut bytes, &section).unwrap();
        bytes.truncate(bytes.len() - 8);
        assert!(read_section(&mut bytes.as_slice()).is_err());
    }
}
