//! JPEG preview emission.
//!
//! The output is the preview's own stream with one change: when the
//! preview carries no Exif segment, an APP1 segment holding the
//! synthesized header is spliced in right after the start-of-image marker.
//!
//! ```text
//! FF D8  FF E1  len:u16  "Exif\0\0"  header[1420]  preview[2..]
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::ExtractError;
use crate::format::jpeg::{has_exif_header, APP1, SOI};
use crate::io::{RangeReader, SourceCursor};
use crate::raw::CameraMetadata;

use super::header::{build_header, HEADER_SIZE};
use super::{ThumbnailKind, ThumbnailOutcome};

/// Length field of the synthesized APP1 segment: the header plus the
/// length field itself and the "Exif\0\0" signature.
pub const APP1_LENGTH: u16 = (HEADER_SIZE + 8) as u16;

const EXIF_SIGNATURE: &[u8; 6] = b"Exif\0\0";

/// Read the selected thumbnail and emit it as a standalone JPEG.
///
/// # Arguments
/// * `cursor` - Cursor over the source the metadata was read from
/// * `meta` - Identification result holding the thumbnail location
/// * `kind` - Encoding chosen by candidate selection
/// * `limit` - Largest thumbnail, in bytes, that may be read into memory
///
/// # Returns
/// - `NotFound` when no location is known or fewer than two bytes are there
/// - `Unsupported` for every encoding other than JPEG
/// - `ThumbnailTooLarge` error when the length, clamped to the source size,
///   exceeds `limit`
pub async fn emit_thumbnail<R: RangeReader>(
    cursor: &mut SourceCursor<R>,
    meta: &CameraMetadata,
    kind: ThumbnailKind,
    limit: u64,
) -> Result<ThumbnailOutcome, ExtractError> {
    if meta.thumb_offset == 0 {
        return Ok(ThumbnailOutcome::NotFound);
    }
    if kind != ThumbnailKind::Jpeg {
        debug!(kind = kind.name(), "Thumbnail encoding not supported");
        return Ok(ThumbnailOutcome::Unsupported(kind));
    }

    let available = cursor.size().saturating_sub(meta.thumb_offset);
    let length = meta.thumb_length.min(available);
    if length > limit {
        return Err(ExtractError::ThumbnailTooLarge { length, limit });
    }
    if length < 2 {
        return Ok(ThumbnailOutcome::NotFound);
    }

    cursor.seek(meta.thumb_offset);
    let data = cursor.read_bytes(length as usize).await?;
    debug!(
        offset = meta.thumb_offset,
        length = data.len(),
        "Emitting JPEG thumbnail"
    );

    Ok(ThumbnailOutcome::Jpeg(write_jpeg_thumbnail(meta, &data)))
}

/// Assemble the output stream for JPEG thumbnail bytes.
///
/// SOI, then an Exif APP1 segment built from `meta` unless `data` already
/// has one, then `data` without its own SOI.
pub fn write_jpeg_thumbnail(meta: &CameraMetadata, data: &[u8]) -> Bytes {
    let body = data.get(2..).unwrap_or_default();
    let tagged = has_exif_header(data);
    let app1 = if tagged { 0 } else { 4 + EXIF_SIGNATURE.len() + HEADER_SIZE };

    let mut out = BytesMut::with_capacity(SOI.len() + app1 + body.len());
    out.put_slice(&SOI);
    if !tagged {
        out.put_slice(&APP1);
        out.put_u16(APP1_LENGTH);
        out.put_slice(EXIF_SIGNATURE);
        out.put_slice(&build_header(meta));
    }
    out.put_slice(body);

    out.freeze()
}
