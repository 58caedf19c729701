//! Byte order and directory-entry reading.
//!
//! This module holds the two primitives every tagged-directory parser in the
//! crate shares: the byte-order mode and the entry reader.
//!
//! # Directory Entry Structure
//! ```text
//! Bytes 0-1: Tag
//! Bytes 2-3: Field type
//! Bytes 4-7: Count (number of values)
//! Bytes 8-11: Value, or offset to the value relative to the directory base
//! ```

use crate::error::IoError;
use crate::io::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, RangeReader, SourceCursor};

use super::tags::FieldType;

// =============================================================================
// Constants
// =============================================================================

/// Marker indicating little-endian byte order ("II" for Intel)
pub const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Marker indicating big-endian byte order ("MM" for Motorola)
pub const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Size of a directory entry in bytes
pub const ENTRY_SIZE: u64 = 12;

/// Size of the value/offset field; larger values are stored indirectly
const INLINE_THRESHOLD: u64 = 4;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of the region being parsed.
///
/// A raw container can switch order between regions (a little-endian
/// maker note inside a big-endian file), so this is cursor state rather
/// than a file-wide constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Byte order selected by a 16-bit marker value.
    ///
    /// Only "II" selects little-endian; every other value selects big-endian.
    #[inline]
    pub fn from_marker(marker: u16) -> Self {
        if marker == BYTE_ORDER_LITTLE_ENDIAN {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    /// Whether `marker` is one of the two valid byte-order markers.
    #[inline]
    pub fn is_marker(marker: u16) -> bool {
        marker == BYTE_ORDER_LITTLE_ENDIAN || marker == BYTE_ORDER_BIG_ENDIAN
    }

    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Decode an IEEE double stored in this byte order.
    #[inline]
    pub fn read_f64(self, bytes: [u8; 8]) -> f64 {
        match self {
            ByteOrder::LittleEndian => f64::from_le_bytes(bytes),
            ByteOrder::BigEndian => f64::from_be_bytes(bytes),
        }
    }
}

// =============================================================================
// DirEntry
// =============================================================================

/// Header of one directory entry, as returned by [`read_entry`].
///
/// After `read_entry` the cursor sits at the entry's value: either the inline
/// value field or the indirect location. Handlers read from there and the
/// walker seeks back to `next` before reading the following entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// Tag identifying the field
    pub tag: u16,

    /// Raw field type code
    pub field_type: u16,

    /// Number of values
    pub count: u32,

    /// Position of the entry following this one (the continuation point)
    pub next: u64,
}

impl DirEntry {
    /// Whether the value is stored indirectly.
    #[inline]
    pub fn is_indirect(&self) -> bool {
        FieldType::value_size(self.field_type) * self.count as u64 > INLINE_THRESHOLD
    }
}

/// Read one directory entry header at the cursor.
///
/// When the encoded value is larger than 4 bytes, the value field holds an
/// offset relative to `base` and the cursor is moved there. Otherwise the
/// cursor is left at the inline value.
pub async fn read_entry<R: RangeReader>(
    cursor: &mut SourceCursor<R>,
    base: u64,
) -> Result<DirEntry, IoError> {
    let tag = cursor.get2().await?;
    let field_type = cursor.get2().await?;
    let count = cursor.get4().await?;
    let next = cursor.position() + 4;

    let entry = DirEntry {
        tag,
        field_type,
        count,
        next,
    };

    if entry.is_indirect() {
        let offset = cursor.get4().await?;
        cursor.seek(base + offset as u64);
    }

    Ok(entry)
}

// =============================================================================
// Tests
// =============================================================================
