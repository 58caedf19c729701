//! Embedded thumbnail emission.
//!
//! Candidate selection leaves behind a thumbnail location and a
//! [`ThumbnailKind`] naming how those bytes are encoded. Only embedded JPEG
//! previews can be emitted; every other kind is reported as
//! [`ThumbnailOutcome::Unsupported`] rather than approximated.
//!
//! Emitted JPEGs always carry Exif metadata: when the embedded preview has
//! none, a synthesized header ([`build_header`]) describing the camera is
//! inserted as an APP1 segment.

mod header;
mod writer;

use bytes::Bytes;
use serde::Serialize;

pub use header::{build_header, HEADER_SIZE};
pub use writer::{emit_thumbnail, write_jpeg_thumbnail, APP1_LENGTH};

/// Encoding of the selected thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailKind {
    /// Embedded JPEG stream
    #[default]
    Jpeg,

    /// Uncompressed planar layers
    Layered,

    /// Uncompressed 8-bit samples
    Samples8,

    /// Uncompressed 16-bit samples
    Samples16,

    /// Sigma/Foveon proprietary preview
    Foveon,

    /// Thumbnail present but not usable
    Disabled,
}

impl ThumbnailKind {
    /// Get a human-readable name for the kind.
    pub const fn name(&self) -> &'static str {
        match self {
            ThumbnailKind::Jpeg => "JPEG",
            ThumbnailKind::Layered => "layered",
            ThumbnailKind::Samples8 => "8-bit samples",
            ThumbnailKind::Samples16 => "16-bit samples",
            ThumbnailKind::Foveon => "Foveon",
            ThumbnailKind::Disabled => "disabled",
        }
    }
}

/// Result of a thumbnail extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    /// A complete JPEG byte stream
    Jpeg(Bytes),

    /// The file has no usable thumbnail location
    NotFound,

    /// A thumbnail exists but its encoding cannot be emitted
    Unsupported(ThumbnailKind),
}

impl ThumbnailOutcome {
    /// The emitted bytes, if any.
    pub fn into_jpeg(self) -> Option<Bytes> {
        match self {
            ThumbnailOutcome::Jpeg(bytes) => Some(bytes),
            _ => None,
        }
    }
}
