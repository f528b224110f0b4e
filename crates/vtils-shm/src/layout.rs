// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Region header layout and element types.
//!
//! Every region starts with a fixed 64-byte little-endian header so an opener
//! can prove it agrees with the creator on element type and shape before
//! touching the payload:
//!
//! ```text
//! Header (64 bytes):
//!   [0:8]    Magic number "VTLSSHM1"
//!   [8:12]   Layout version (u32)
//!   [12:16]  Element type code (u32, see DType)
//!   [16:20]  Rank (u32, 1..=4)
//!   [20:24]  Reserved (zero)
//!   [24:56]  Dimensions (4 x u64, unused dims are zero)
//!   [56:64]  Generation counter (u64, odd while a write is in progress)
//! Data:
//!   [64:...] count x element size bytes, row-major
//! ```

use std::fmt;

use serde::Serialize;

use crate::error::{ShmError, ShmResult};

pub const REGION_MAGIC: &[u8; 8] = b"VTLSSHM1";
pub const LAYOUT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 64;
pub const MAX_RANK: usize = 4;
pub(crate) const GENERATION_OFFSET: usize = 56;

/// Element type stored in a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum DType {
    F32 = 1,
    F64 = 2,
    I32 = 3,
    I64 = 4,
    U8 = 5,
    U32 = 6,
    U64 = 7,
}

impl DType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::F32),
            2 => Some(Self::F64),
            3 => Some(Self::I32),
            4 => Some(Self::I64),
            5 => Some(Self::U8),
            6 => Some(Self::U32),
            7 => Some(Self::U64),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F64 | Self::I64 | Self::U64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U32 => "u32",
            Self::U64 => "u64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Plain numeric types that can live in a region.
///
/// Every bit pattern must be a valid value, which `bytemuck::Pod` guarantees.
pub trait Element: bytemuck::Pod + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
}
impl Element for f64 {
    const DTYPE: DType = DType::F64;
}
impl Element for i32 {
    const DTYPE: DType = DType::I32;
}
impl Element for i64 {
    const DTYPE: DType = DType::I64;
}
impl Element for u8 {
    const DTYPE: DType = DType::U8;
}
impl Element for u32 {
    const DTYPE: DType = DType::U32;
}
impl Element for u64 {
    const DTYPE: DType = DType::U64;
}

/// Element count of `shape`, validating rank and dimensions.
pub fn element_count(shape: &[usize]) -> ShmResult<usize> {
    let invalid = |reason| ShmError::InvalidShape {
        shape: shape.to_vec(),
        reason,
    };
    if shape.is_empty() {
        return Err(invalid("rank must be at least 1"));
    }
    if shape.len() > MAX_RANK {
        return Err(invalid("rank must be at most 4"));
    }
    if shape.contains(&0) {
        return Err(invalid("dimensions must be non-zero"));
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| invalid("element count overflows"))
}

/// Total byte size of a region (header + payload).
pub fn region_size(dtype: DType, shape: &[usize]) -> ShmResult<usize> {
    let count = element_count(shape)?;
    count
        .checked_mul(dtype.size())
        .and_then(|payload| payload.checked_add(HEADER_SIZE))
        .ok_or_else(|| ShmError::InvalidShape {
            shape: shape.to_vec(),
            reason: "byte size overflows",
        })
}

/// Human-readable `f64[3, 4]` form used in mismatch errors.
pub(crate) fn describe(dtype: DType, shape: &[usize]) -> String {
    let dims = shape
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}[{}]", dtype, dims)
}

/// Write a fresh header (generation 0). `shape` must already be validated.
pub(crate) fn encode_header(buf: &mut [u8], dtype: DType, shape: &[usize]) {
    debug_assert!(buf.len() >= HEADER_SIZE);
    debug_assert!(!shape.is_empty() && shape.len() <= MAX_RANK);

    buf[0..8].copy_from_slice(REGION_MAGIC);
    buf[8..12].copy_from_slice(&LAYOUT_VERSION.to_le_bytes());
    buf[12..16].copy_from_slice(&dtype.code().to_le_bytes());
    buf[16..20].copy_from_slice(&(shape.len() as u32).to_le_bytes());
    buf[20..24].fill(0);
    for i in 0..MAX_RANK {
        let dim = shape.get(i).copied().unwrap_or(0) as u64;
        let at = 24 + i * 8;
        buf[at..at + 8].copy_from_slice(&dim.to_le_bytes());
    }
    buf[GENERATION_OFFSET..HEADER_SIZE].copy_from_slice(&0u64.to_le_bytes());
}

/// Decoded header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodedHeader {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub generation: u64,
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

/// Parse and validate a header; `name` is only used for error messages.
pub(crate) fn decode_header(name: &str, buf: &[u8]) -> ShmResult<DecodedHeader> {
    let invalid = |reason: String| ShmError::InvalidHeader {
        name: name.to_string(),
        reason,
    };

    if buf.len() < HEADER_SIZE {
        return Err(invalid(format!(
            "{} bytes, need at least {}",
            buf.len(),
            HEADER_SIZE
        )));
    }
    if &buf[0..8] != REGION_MAGIC {
        return Err(invalid(format!("bad magic {:?}", &buf[0..8])));
    }
    let version = read_u32(buf, 8);
    if version != LAYOUT_VERSION {
        return Err(invalid(format!(
            "layout version {} (expected {})",
            version, LAYOUT_VERSION
        )));
    }
    let code = read_u32(buf, 12);
    let dtype = DType::from_code(code).ok_or_else(|| invalid(format!("unknown element type code {}", code)))?;
    let rank = read_u32(buf, 16) as usize;
    if rank == 0 || rank > MAX_RANK {
        return Err(invalid(format!("rank {}", rank)));
    }

    let mut shape = Vec::with_capacity(rank);
    for i in 0..rank {
        let dim = read_u64(buf, 24 + i * 8);
        let dim = usize::try_from(dim).map_err(|_| invalid(format!("dimension {} too large", dim)))?;
        shape.push(dim);
    }
    element_count(&shape).map_err(|e| invalid(e.to_string()))?;

    Ok(DecodedHeader {
        dtype,
        shape,
        generation: read_u64(buf, GENERATION_OFFSET),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip_preserves_shape() {
        let mut buf = [0u8; HEADER_SIZE];
        encode_header(&mut buf, DType::F64, &[3, 4]);
        let header = decode_header("r", &buf).unwrap();
        assert_eq!(header.dtype, DType::F64);
        assert_eq!(header.shape, vec![3, 4]);
        assert_eq!(header.generation, 0);
    }

    #[test]
    fn test_zeroed_header_is_invalid() {
        let buf = [0u8; HEADER_SIZE];
        assert!(matches!(
            decode_header("r", &buf),
            Err(ShmError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_unknown_dtype_rejected() {
        let mut buf = [0u8; HEADER_SIZE];
        encode_header(&mut buf, DType::U8, &[8]);
        buf[12..16].copy_from_slice(&99u32.to_le_bytes());
        let err = decode_header("r", &buf).unwrap_err();
        assert!(err.to_string().contains("unknown element type"));
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(decode_header("r", &[0u8; 10]).is_err());
    }

    #[test]
    fn test_element_count_validation() {
        assert_eq!(element_count(&[2, 3, 4]).unwrap(), 24);
        assert!(element_count(&[]).is_err());
        assert!(element_count(&[1, 2, 3, 4, 5]).is_err());
        assert!(element_count(&[4, 0]).is_err());
        assert!(element_count(&[usize::MAX, 2]).is_err());
    }

    #[test]
    fn test_region_size() {
        assert_eq!(region_size(DType::F64, &[10]).unwrap(), HEADER_SIZE + 80);
        assert_eq!(region_size(DType::U8, &[2, 2]).unwrap(), HEADER_SIZE + 4);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(DType::F32, &[2, 5]), "f32[2, 5]");
    }
}
