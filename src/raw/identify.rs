//! Format dispatch for one identification pass.
//!
//! [`identify`] sniffs the container family from the head of the file,
//! runs the matching parsers over the session, falls back to a JPEG segment
//! scan when no make was found, and finally normalizes names and
//! orientation.

use tracing::{debug, info};

use crate::error::IoError;
use crate::format::ciff::parse_ciff;
use crate::format::detect::{detect_format, SourceFormat, HEAD_SIZE};
use crate::format::foveon::parse_foveon;
use crate::format::fuji::parse_fuji;
use crate::format::jpeg::parse_jpeg;
use crate::format::minolta::parse_minolta;
use crate::format::tiff::{parse_tiff, ByteOrder};
use crate::io::RangeReader;

use super::normalize::{canonicalize_make, normalize_flip, strip_make_from_model};
use super::select::apply_tiff;
use super::session::Session;

// =============================================================================
// Fixed offsets of the Fuji RAF header
// =============================================================================

const FUJI_THUMB_POINTER: u64 = 84;
const FUJI_DIRECTORY_POINTER: u64 = 92;
const FUJI_TIFF_POINTER: u64 = 100;
const FUJI_SECOND_SHOT_POINTER: u64 = 120;

/// Distance between the first and second shot's TIFF pointers.
const FUJI_SHOT_STRIDE: u64 = 28;

/// Run the whole identification over a fresh session.
///
/// # Returns
/// The detected container family. Everything else learned is left in the
/// session.
pub async fn identify<R: RangeReader>(session: &mut Session<R>) -> Result<SourceFormat, IoError> {
    session.flip = None;
    session.tiff_flip = None;

    let marker = session.cursor.get2().await?;
    session.cursor.set_byte_order(ByteOrder::from_marker(marker));
    let hlen = session.cursor.get4().await? as u64;
    session.cursor.seek(0);
    let head = session.cursor.read_bytes(HEAD_SIZE).await?;
    let size = session.cursor.size();

    let format = detect_format(&head);
    debug!(
        source = session.cursor.reader().identifier(),
        size,
        format = format.name(),
        "Identifying"
    );

    match format {
        SourceFormat::Tiff { ciff } => {
            if ciff {
                session.meta.data_offset = hlen;
                parse_ciff(session, hlen, size as i64 - hlen as i64, 0).await?;
            }
            parse_tiff(session, 0).await?;
            apply_tiff(session).await?;
        }
        SourceFormat::ExifJpeg => {
            session.cursor.set_byte_order(ByteOrder::BigEndian);
            session.cursor.seek(4);
            let data_offset = session.cursor.get2().await? as u64 + 4;
            session.meta.data_offset = data_offset;
            session.cursor.seek(data_offset);
            if session.cursor.read_u8().await? != Some(0xFF) {
                parse_tiff(session, 12).await?;
            }
            session.meta.thumb_offset = 0;
        }
        SourceFormat::Fuji => identify_fuji(session).await?,
        SourceFormat::Minolta => parse_minolta(session, 0).await?,
        SourceFormat::Foveon => parse_foveon(session).await?,
        SourceFormat::Unknown => {}
    }

    if session.meta.make.is_empty() {
        parse_jpeg(session, 0).await?;
    }

    let meta = &mut session.meta;
    canonicalize_make(&mut meta.make);
    strip_make_from_model(&meta.make, &mut meta.model);
    meta.flip = normalize_flip(session.flip, session.tiff_flip);

    info!(
        make = %meta.make,
        model = %meta.model,
        raw_width = meta.raw_width,
        raw_height = meta.raw_height,
        directories = session.dirs.len(),
        "Identified"
    );

    Ok(format)
}

/// Fuji RAF: fixed header pointers to the thumbnail, the vendor directory
/// block and one TIFF per shot.
async fn identify_fuji<R: RangeReader>(session: &mut Session<R>) -> Result<(), IoError> {
    let second_shot = session.options.shot_select > 0;

    session.cursor.seek(FUJI_THUMB_POINTER);
    session.meta.thumb_offset = session.cursor.get4().await? as u64;
    session.meta.thumb_length = session.cursor.get4().await? as u64;

    session.cursor.seek(FUJI_DIRECTORY_POINTER);
    let directory = session.cursor.get4().await? as u64;
    parse_fuji(session, directory).await?;

    if session.meta.thumb_offset > FUJI_SECOND_SHOT_POINTER {
        session.cursor.seek(FUJI_SECOND_SHOT_POINTER);
        let second = session.cursor.get4().await? as i32;
        if second > 0 {
            session.meta.is_raw += 1;
        }
        if session.meta.is_raw == 2 && second_shot {
            parse_fuji(session, second as u64).await?;
        }
    }

    let pointer = FUJI_TIFF_POINTER + if second_shot { FUJI_SHOT_STRIDE } else { 0 };
    session.cursor.seek(pointer);
    let data_offset = session.cursor.get4().await? as u64;
    session.meta.data_offset = data_offset;
    parse_tiff(session, data_offset).await?;

    let embedded = session.meta.thumb_offset + 12;
    parse_tiff(session, embedded).await?;
    apply_tiff(session).await
}
