//! Stride-typed geometry buffers
//!
//! Every attribute and index stream of a section is a byte-backed buffer whose
//! stride is fixed at construction. Updates always replace the whole store -
//! there are no partial in-place edits, so a buffer is never observable in a
//! torn state. Precision and index-width variants are carried as tags on the
//! buffer rather than as separate accessor types, so decode logic dispatches
//! on a plain enum.

use bytemuck::Pod;

use crate::section::{SectionError, SectionResult};

/// Packed-normal pair size for a compact tangent element (normal + tangent)
const TANGENT_STRIDE_COMPACT: u32 = 8;
/// Wide-normal pair size for an extended tangent element
const TANGENT_STRIDE_EXTENDED: u32 = 16;

/// Encoding of the tangent stream, fixed when a section is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TangentPrecision {
    /// Two packed 4-byte normals per vertex
    Compact,
    /// Two 8-byte wide normals per vertex
    Extended,
}

impl TangentPrecision {
    pub fn stride(self) -> u32 {
        match self {
            TangentPrecision::Compact => TANGENT_STRIDE_COMPACT,
            TangentPrecision::Extended => TANGENT_STRIDE_EXTENDED,
        }
    }
}

/// Encoding of one UV channel, fixed when a section is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvPrecision {
    /// Two half-floats per channel
    Half,
    /// Two f32s per channel
    Full,
}

impl UvPrecision {
    pub fn channel_size(self) -> u32 {
        match self {
            UvPrecision::Half => 4,
            UvPrecision::Full => 8,
        }
    }
}

/// Width of one index entry, fixed when a section is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    pub fn stride(self) -> u32 {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// Byte-backed buffer for one vertex attribute stream
///
/// Invariant: `data.len()` is always a multiple of `stride`.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    stride: u32,
    data: Vec<u8>,
}

impl VertexBuffer {
    pub fn new(stride: u32) -> Self {
        assert!(stride > 0, "vertex buffer stride must be non-zero");
        Self {
            stride,
            data: Vec::new(),
        }
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn element_count(&self) -> u32 {
        (self.data.len() / self.stride as usize) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the store, taking ownership of the caller's allocation
    pub fn set_data(&mut self, data: Vec<u8>) -> SectionResult<()> {
        self.check_byte_len(data.len())?;
        self.data = data;
        Ok(())
    }

    /// Replace the store with a copy of the caller's bytes
    pub fn set_data_from_slice(&mut self, data: &[u8]) -> SectionResult<()> {
        self.check_byte_len(data.len())?;
        self.data.clear();
        self.data.extend_from_slice(data);
        Ok(())
    }

    /// Replace the store from typed elements
    ///
    /// Fails with `SizeMismatch` when the element size disagrees with the
    /// stride fixed at construction. An empty slice clears the buffer.
    pub fn set_typed<T: Pod>(&mut self, elements: &[T]) -> SectionResult<()> {
        if elements.is_empty() {
            self.data.clear();
            return Ok(());
        }
        let element_size = std::mem::size_of::<T>() as u32;
        if element_size != self.stride {
            return Err(SectionError::SizeMismatch {
                expected: self.stride,
                actual: element_size,
            });
        }
        self.data.clear();
        self.data.extend_from_slice(bytemuck::cast_slice(elements));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Take the store out, leaving the buffer empty
    pub fn take_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    fn check_byte_len(&self, len: usize) -> SectionResult<()> {
        if len % self.stride as usize != 0 {
            return Err(SectionError::SizeMismatch {
                expected: self.stride,
                actual: (len % self.stride as usize) as u32,
            });
        }
        Ok(())
    }
}

/// Position stream: three packed f32s per vertex
#[derive(Debug, Clone, PartialEq)]
pub struct PositionBuffer {
    buffer: VertexBuffer,
}

impl PositionBuffer {
    pub const STRIDE: u32 = 12;

    pub fn new() -> Self {
        Self {
            buffer: VertexBuffer::new(Self::STRIDE),
        }
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut VertexBuffer {
        &mut self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.buffer.element_count()
    }

    /// Decode the stored positions
    ///
    /// The byte store has no alignment guarantee, so elements are re-read
    /// rather than reinterpreted in place.
    pub fn iter_positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.buffer.data().chunks_exact(Self::STRIDE as usize).map(|chunk| {
            [
                f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
                f32::from_le_bytes([chunk[8], chunk[9], chunk[10], chunk[11]]),
            ]
        })
    }
}

impl Default for PositionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tangent stream: paired normal + tangent per vertex, compact or extended
#[derive(Debug, Clone, PartialEq)]
pub struct TangentBuffer {
    precision: TangentPrecision,
    buffer: VertexBuffer,
}

impl TangentBuffer {
    pub fn new(precision: TangentPrecision) -> Self {
        Self {
            precision,
            buffer: VertexBuffer::new(precision.stride()),
        }
    }

    pub fn precision(&self) -> TangentPrecision {
        self.precision
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut VertexBuffer {
        &mut self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.buffer.element_count()
    }
}

/// UV stream: `channels` consecutive UV pairs per vertex
#[derive(Debug, Clone, PartialEq)]
pub struct UvBuffer {
    precision: UvPrecision,
    channels: u32,
    buffer: VertexBuffer,
}

impl UvBuffer {
    pub fn new(precision: UvPrecision, channels: u32) -> Self {
        assert!(channels >= 1, "a UV buffer carries at least one channel");
        Self {
            precision,
            channels,
            buffer: VertexBuffer::new(precision.channel_size() * channels),
        }
    }

    pub fn precision(&self) -> UvPrecision {
        self.precision
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut VertexBuffer {
        &mut self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.buffer.element_count()
    }

    /// Decode channel 0 of vertex `index` to full precision
    ///
    /// Dispatches on the precision tag; half-float channels are widened.
    pub fn uv_at(&self, index: u32) -> [f32; 2] {
        let start = (index * self.buffer.stride()) as usize;
        let data = self.buffer.data();
        match self.precision {
            UvPrecision::Full => {
                let u = f32::from_le_bytes([
                    data[start],
                    data[start + 1],
                    data[start + 2],
                    data[start + 3],
                ]);
                let v = f32::from_le_bytes([
                    data[start + 4],
                    data[start + 5],
                    data[start + 6],
                    data[start + 7],
                ]);
                [u, v]
            }
            UvPrecision::Half => {
                let u = half_to_f32(u16::from_le_bytes([data[start], data[start + 1]]));
                let v = half_to_f32(u16::from_le_bytes([data[start + 2], data[start + 3]]));
                [u, v]
            }
        }
    }
}

/// Color stream: RGBA8 per vertex
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    buffer: VertexBuffer,
}

impl ColorBuffer {
    pub const STRIDE: u32 = 4;

    pub fn new() -> Self {
        Self {
            buffer: VertexBuffer::new(Self::STRIDE),
        }
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut VertexBuffer {
        &mut self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.buffer.element_count()
    }
}

impl Default for ColorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Index stream with a fixed 16- or 32-bit entry width
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBuffer {
    width: IndexWidth,
    data: Vec<u8>,
}

impl IndexBuffer {
    pub fn new(width: IndexWidth) -> Self {
        Self {
            width,
            data: Vec::new(),
        }
    }

    pub fn width(&self) -> IndexWidth {
        self.width
    }

    pub fn stride(&self) -> u32 {
        self.width.stride()
    }

    pub fn index_count(&self) -> u32 {
        (self.data.len() / self.width.stride() as usize) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) -> SectionResult<()> {
        self.check_byte_len(data.len())?;
        self.data = data;
        Ok(())
    }

    pub fn set_data_from_slice(&mut self, data: &[u8]) -> SectionResult<()> {
        self.check_byte_len(data.len())?;
        self.data.clear();
        self.data.extend_from_slice(data);
        Ok(())
    }

    /// Replace the store from typed indices; `SizeMismatch` on width disagreement
    pub fn set_typed<T: Pod>(&mut self, indices: &[T]) -> SectionResult<()> {
        if indices.is_empty() {
            self.data.clear();
            return Ok(());
        }
        let element_size = std::mem::size_of::<T>() as u32;
        if element_size != self.width.stride() {
            return Err(SectionError::SizeMismatch {
                expected: self.width.stride(),
                actual: element_size,
            });
        }
        self.data.clear();
        self.data.extend_from_slice(bytemuck::cast_slice(indices));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Decode entry `index` to u32, dispatching on the width tag
    pub fn index_at(&self, index: u32) -> u32 {
        let stride = self.width.stride() as usize;
        let start = index as usize * stride;
        match self.width {
            IndexWidth::U16 => {
                u16::from_le_bytes([self.data[start], self.data[start + 1]]) as u32
            }
            IndexWidth::U32 => u32::from_le_bytes([
                self.data[start],
                self.data[start + 1],
                self.data[start + 2],
                self.data[start + 3],
            ]),
        }
    }

    fn check_byte_len(&self, len: usize) -> SectionResult<()> {
        if len % self.width.stride() as usize != 0 {
            return Err(SectionError::SizeMismatch {
                expected: self.width.stride(),
                actual: (len % self.width.stride() as usize) as u32,
            });
        }
        Ok(())
    }
}

/// Widen an IEEE 754 half-float to f32
fn half_to_f32(bits: u16) -> f32 {
    let sign = (bits >> 15) as u32;
    let exponent = ((bits >> 10) & 0x1f) as u32;
    let mantissa = (bits & 0x3ff) as u32;

    let out = if exponent == 0 {
        if mantissa == 0 {
            sign << 31
        } else {
            // Subnormal: renormalize
            let mut exponent = 127 - 15 + 1;
            let mut mantissa = mantissa;
            while mantissa & 0x400 == 0 {
                mantissa <<= 1;
                exponent -= 1;
            }
            (sign << 31) | ((exponent as u32) << 23) | ((mantissa & 0x3ff) << 13)
        }
    } else if exponent == 0x1f {
        // Inf / NaN
        (sign << 31) | (0xff << 23) | (mantissa << 13)
    } else {
        (sign << 31) | ((exponent + 127 - 15) << 23) | (mantissa << 13)
    };
    f32::from_bits(out)
}

/// Narrow an f32 to an IEEE 754 half-float (round to nearest even)
pub(crate) fn f32_to_half(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x7f_ffff;

    if exponent == 0xff {
        // Inf / NaN
        let payload = if mantissa != 0 { 0x200 } else { 0 };
        return sign | 0x7c00 | payload as u16;
    }

    let half_exp = exponent - 127 + 15;
    if half_exp >= 0x1f {
        return sign | 0x7c00; // Overflow to infinity
    }
    if half_exp <= 0 {
        if half_exp < -10 {
            return sign; // Underflow to zero
        }
        let mantissa = mantissa | 0x80_0000;
        let shift = 14 - half_exp;
        let half_mant = (mantissa >> shift) as u16;
        let round = (mantissa >> (shift - 1)) & 1;
        return sign | (half_mant + round as u16);
    }

    let half_mant = (mantissa >> 13) as u16;
    let mut result = sign | ((half_exp as u16) << 10) | half_mant;
    if (mantissa >> 12) & 1 != 0 {
        // Round up; a carry into the exponent is still well-formed
        result += 1;
    }
    result
}
