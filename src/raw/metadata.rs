//! Metadata model produced by an identification pass.
//!
//! # Text fields
//!
//! Camera strings live in fixed-capacity buffers ([`TextField`]). The
//! logical length is stored next to the bytes and never recovered by
//! scanning for a terminator; bytes past the length are always zero so
//! the buffer can be copied into a fixed-width wire field as-is.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// ASCII case-insensitive prefix test on raw bytes.
pub fn starts_with_ignore_case(bytes: &[u8], prefix: &[u8]) -> bool {
    bytes
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

// =============================================================================
// TextField
// =============================================================================

/// A text value of at most `N` bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct TextField<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> TextField<N> {
    /// Empty field.
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    /// Build a field from raw bytes.
    ///
    /// Copying stops at the first NUL or at capacity, whichever comes first.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut field = Self::new();
        field.set(bytes);
        field
    }

    /// Replace the value, with the same truncation rules as
    /// [`from_bytes`](Self::from_bytes).
    pub fn set(&mut self, bytes: &[u8]) {
        let end = bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(bytes.len())
            .min(N);
        self.buf = [0; N];
        self.buf[..end].copy_from_slice(&bytes[..end]);
        self.len = end;
    }

    /// Remove the first `count` bytes, shifting the rest down.
    pub fn strip_prefix_len(&mut self, count: usize) {
        let count = count.min(self.len);
        self.buf.copy_within(count..self.len, 0);
        self.len -= count;
        self.buf[self.len..].fill(0);
    }

    /// The logical value.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The whole buffer, zero beyond the logical length.
    #[inline]
    pub fn raw(&self) -> &[u8; N] {
        &self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Capacity in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// The value as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    /// Whether the value is exactly `other`.
    #[inline]
    pub fn eq_bytes(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }

    /// ASCII case-insensitive prefix test.
    pub fn starts_with_ignore_case(&self, prefix: &[u8]) -> bool {
        starts_with_ignore_case(self.as_bytes(), prefix)
    }

    /// ASCII case-insensitive substring test.
    pub fn contains_ignore_case(&self, needle: &[u8]) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.as_bytes()
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle))
    }
}

impl<const N: usize> Default for TextField<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> std::fmt::Debug for TextField<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl<const N: usize> std::fmt::Display for TextField<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl<const N: usize> Serialize for TextField<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

// =============================================================================
// CameraMetadata
// =============================================================================

/// Capacity of the make, model and artist fields.
pub const NAME_CAPACITY: usize = 64;

/// Capacity of the description field.
pub const DESCRIPTION_CAPACITY: usize = 512;

/// Everything learned about the camera and the file layout.
///
/// Populated incrementally by every parser of a session. For most fields
/// the last writer wins; a few are only written while still zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CameraMetadata {
    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------
    pub make: TextField<NAME_CAPACITY>,
    pub model: TextField<NAME_CAPACITY>,
    /// Secondary model name from a maker note
    pub model2: TextField<NAME_CAPACITY>,
    pub description: TextField<DESCRIPTION_CAPACITY>,
    pub artist: TextField<NAME_CAPACITY>,
    pub software: TextField<NAME_CAPACITY>,
    pub unique_id: u32,
    /// Body serial number accumulated from a maker note
    pub serial: u64,

    // -------------------------------------------------------------------------
    // Exposure
    // -------------------------------------------------------------------------
    /// Seconds
    pub shutter: f64,
    /// F number
    pub aperture: f64,
    pub iso_speed: f64,
    /// Millimetres
    pub focal_len: f64,
    /// Exposure bias in EV
    pub exposure: f64,
    /// Flash strength from the CIFF exposure record
    pub flash_used: f64,
    /// EXIF flash status code
    pub flash: u16,
    pub exposure_program: u16,
    pub white_balance_index: u32,
    pub shot_order: u32,
    #[serde(with = "optional_rfc3339")]
    pub timestamp: Option<DateTime<Utc>>,

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------
    /// Orientation code after normalization
    pub flip: i32,
    pub width: u32,
    pub height: u32,
    pub raw_width: u32,
    pub raw_height: u32,
    /// Color filter pattern
    pub filters: u32,
    pub fuji_width: u32,
    pub fuji_layout: u32,

    // -------------------------------------------------------------------------
    // Raw data
    // -------------------------------------------------------------------------
    pub bits_per_sample: u32,
    pub compression: u32,
    pub samples: u32,
    pub tile_width: u32,
    pub tile_length: u32,
    pub load_flags: u32,
    pub is_raw: u32,
    /// Packed DNG version, 0 when not a DNG
    pub dng_version: u32,

    // -------------------------------------------------------------------------
    // Block locations
    // -------------------------------------------------------------------------
    pub data_offset: u64,
    pub meta_offset: u64,
    pub meta_length: u64,
    pub thumb_offset: u64,
    pub thumb_length: u64,
    pub thumb_width: u32,
    pub thumb_height: u32,
    /// Thumbnail bit depth in the low 5 bits, sample count above
    pub thumb_misc: u32,
}

mod optional_rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

// =============================================================================
// DirectoryRecord
// =============================================================================

/// Summary of one tagged directory, in discovery order.
///
/// Records are created when a directory scan starts and only mutated by
/// that scan (and by the shutter back-propagation of candidate selection).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectoryRecord {
    pub width: u32,
    pub height: u32,
    pub bps: u32,
    pub comp: u32,
    pub phint: u32,
    pub offset: u64,
    pub flip: i32,
    pub samples: u32,
    pub bytes: u64,
    pub tile_width: u32,
    pub tile_length: u32,
    pub shutter: f64,
}
