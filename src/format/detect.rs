//! Container detection from the leading bytes of a file.
//!
//! Detection looks only at a 32-byte head window:
//!
//! - **TIFF family**: "II" or "MM" byte-order marker (CR2, NEF, DNG, ARW, ...),
//!   with a CIFF flag when "HEAPCCDR" sits 6 bytes in (Canon CRW)
//! - **Exif JPEG**: SOI followed by an APP1 segment whose payload starts "Exif"
//! - **Fuji RAF**: "FUJIFILM"
//! - **Minolta MRW**: "\0MRM"
//! - **Sigma X3F**: "FOVb"
//!
//! Anything else is [`SourceFormat::Unknown`]; the identification pass
//! still runs its generic JPEG segment scan over such files.

use serde::Serialize;

use super::tiff::ByteOrder;

// =============================================================================
// SourceFormat
// =============================================================================

/// Size of the head window examined by [`detect_format`].
pub const HEAD_SIZE: usize = 32;

/// Signature of a Canon CIFF heap, 6 bytes into the file.
const CIFF_SIGNATURE: &[u8] = b"HEAPCCDR";

const EXIF_JPEG_PREFIX: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE1];
const EXIF_SIGNATURE: &[u8] = b"Exif";
const FUJI_SIGNATURE: &[u8] = b"FUJIFILM";
const MINOLTA_SIGNATURE: &[u8] = b"\0MRM";
const FOVEON_SIGNATURE: &[u8] = b"FOVb";

/// Container family of a raw file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Tagged-directory container; `ciff` when a Canon CIFF heap follows the
    /// byte-order marker
    Tiff { ciff: bool },

    /// JPEG with an Exif APP1 segment
    ExifJpeg,

    /// Fuji RAF
    Fuji,

    /// Minolta MRW
    Minolta,

    /// Sigma/Foveon X3F
    Foveon,

    /// No known signature
    Unknown,
}

impl SourceFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            SourceFormat::Tiff { ciff: true } => "Canon CIFF",
            SourceFormat::Tiff { ciff: false } => "TIFF-based raw",
            SourceFormat::ExifJpeg => "Exif JPEG",
            SourceFormat::Fuji => "Fuji RAF",
            SourceFormat::Minolta => "Minolta MRW",
            SourceFormat::Foveon => "Sigma X3F",
            SourceFormat::Unknown => "Unknown",
        }
    }
}

// =============================================================================
// Format Detection
// =============================================================================

/// Detect the container family from the head window.
///
/// # Arguments
/// * `head` - The first bytes of the file (up to [`HEAD_SIZE`]); shorter
///   slices are accepted and simply match fewer signatures
///
/// # Returns
/// The first matching family, checked in dispatch order.
pub fn detect_format(head: &[u8]) -> SourceFormat {
    if head.len() >= 2 && ByteOrder::is_marker(u16::from_be_bytes([head[0], head[1]])) {
        let ciff = head.get(6..14) == Some(CIFF_SIGNATURE);
        return SourceFormat::Tiff { ciff };
    }

    if head.starts_with(EXIF_JPEG_PREFIX) && head.get(6..10) == Some(EXIF_SIGNATURE) {
        return SourceFormat::ExifJpeg;
    }

    if head.starts_with(FUJI_SIGNATURE) {
        return SourceFormat::Fuji;
    }

    if head.starts_with(MINOLTA_SIGNATURE) {
        return SourceFormat::Minolta;
    }

    if head.starts_with(FOVEON_SIGNATURE) {
        return SourceFormat::Foveon;
    }

    SourceFormat::Unknown
}

/// Check if the head starts with a TIFF byte-order marker.
#[inline]
pub fn is_tiff_header(head: &[u8]) -> bool {
    matches!(detect_format(head), SourceFormat::Tiff { .. })
}

// =============================================================================
// Tests
// =============================================================================
