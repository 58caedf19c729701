//! Sigma/Foveon X3F directory.
//!
//! The file ends with a pointer to a little-endian directory:
//!
//! ```text
//! "SECd"  version:u32  count:u32
//! count x (offset:u32  length:u32  tag:u32)
//! ```
//!
//! Every section starts with "SEC" plus the last byte of its tag. Image
//! sections give dimensions and the preview, `CAMF` locates the calibration
//! block, and `PROP` is a table of UTF-16 name/value pairs.

use tracing::debug;

use crate::error::IoError;
use crate::format::jpeg::SOI;
use crate::format::tiff::{leading_float, leading_int, unix_timestamp, ByteOrder};
use crate::io::RangeReader;
use crate::raw::Session;
use crate::thumbnail::ThumbnailKind;

/// "SECd"
const DIRECTORY_MAGIC: u32 = 0x64434553;

/// "SEC\0"; the section tag's first byte fills the high byte.
const SECTION_MAGIC: u32 = 0x20434553;

const IMAG: u32 = 0x47414d49;
const IMA2: u32 = 0x32414d49;
const CAMF: u32 = 0x464d4143;
const PROP: u32 = 0x504f5250;

/// Most directory entries followed.
pub const MAX_FOVEON_ENTRIES: u32 = 1024;

/// Most properties read from a `PROP` section.
pub const MAX_FOVEON_PROPERTIES: u32 = 256;

/// Offset of the orientation word in the file header.
const HEADER_ROTATION: u64 = 36;

/// Size of an image section header.
const IMAGE_HEADER: u64 = 28;

/// Longest property string, excluding the terminator.
const PROPERTY_CHARS: usize = 63;

/// Parse the X3F directory. The caller's byte order is restored on return.
pub async fn parse_foveon<R: RangeReader>(session: &mut Session<R>) -> Result<(), IoError> {
    let saved = session.cursor.byte_order();
    session.cursor.set_byte_order(ByteOrder::LittleEndian);
    let result = walk_sections(session).await;
    session.cursor.set_byte_order(saved);
    result
}

async fn walk_sections<R: RangeReader>(session: &mut Session<R>) -> Result<(), IoError> {
    session.cursor.seek(HEADER_ROTATION);
    session.flip = Some(session.cursor.get4().await? as i32);

    session.cursor.seek_signed(session.cursor.size() as i64 - 4);
    let directory = session.cursor.get4().await? as u64;
    debug!(directory, "Parsing X3F directory");
    session.cursor.seek(directory);
    if session.cursor.get4().await? != DIRECTORY_MAGIC {
        debug!(directory, "X3F directory signature missing");
        return Ok(());
    }
    session.cursor.get4().await?;
    let entries = session.cursor.get4().await?.min(MAX_FOVEON_ENTRIES);

    let mut images = 0;
    for _ in 0..entries {
        let off = session.cursor.get4().await? as u64;
        let len = session.cursor.get4().await?;
        let tag = session.cursor.get4().await?;
        let save = session.cursor.position();

        session.cursor.seek(off);
        if session.cursor.get4().await? != SECTION_MAGIC | (tag << 24) {
            debug!(off, tag, "X3F section signature mismatch");
            return Ok(());
        }

        match tag {
            IMAG | IMA2 => {
                images += 1;
                read_image_section(session, off, len, images).await?;
            }
            CAMF => {
                session.meta.meta_offset = off + 8;
                session.meta.meta_length = len.wrapping_sub(28) as u64;
            }
            PROP => read_properties(session, off).await?,
            _ => {}
        }

        session.cursor.seek(save);
    }

    Ok(())
}

async fn read_image_section<R: RangeReader>(
    session: &mut Session<R>,
    off: u64,
    len: u32,
    index: u32,
) -> Result<(), IoError> {
    session.cursor.skip(8);
    session.cursor.get4().await?;
    let wide = session.cursor.get4().await?;
    let high = session.cursor.get4().await?;

    if wide > session.meta.raw_width && high > session.meta.raw_height {
        session.meta.raw_width = wide;
        session.meta.raw_height = high;
        session.meta.data_offset = off + IMAGE_HEADER;
    }

    session.cursor.seek(off + IMAGE_HEADER);
    let payload = len as i64 - IMAGE_HEADER as i64;
    if session.cursor.read_bytes(2).await?[..] == SOI
        && (session.meta.thumb_length as i64) < payload
    {
        session.meta.thumb_offset = off + IMAGE_HEADER;
        session.meta.thumb_length = payload as u64;
        session.thumb_kind = ThumbnailKind::Jpeg;
    }

    if index == 2 && session.meta.thumb_length == 0 {
        session.meta.thumb_offset = off + 24;
        session.meta.thumb_width = wide;
        session.meta.thumb_height = high;
        session.thumb_kind = ThumbnailKind::Foveon;
    }

    Ok(())
}

async fn read_properties<R: RangeReader>(session: &mut Session<R>, off: u64) -> Result<(), IoError> {
    session.cursor.get4().await?;
    let count = session.cursor.get4().await?;
    session.cursor.skip(12);
    let base = off + count as u64 * 8 + 24;
    let count = count.min(MAX_FOVEON_PROPERTIES) as usize;

    let mut offsets = Vec::with_capacity(count * 2);
    for _ in 0..count * 2 {
        offsets.push(base + session.cursor.get4().await? as u64 * 2);
    }

    for pair in offsets.chunks_exact(2) {
        let name = read_utf16_string(session, pair[0]).await?;
        let value = read_utf16_string(session, pair[1]).await?;
        let meta = &mut session.meta;

        match name.as_slice() {
            b"ISO" => meta.iso_speed = leading_int(&value).unwrap_or(0) as f64,
            b"CAMMANUF" => meta.make.set(&value),
            b"CAMMODEL" => meta.model.set(&value),
            b"TIME" => meta.timestamp = unix_timestamp(leading_int(&value).unwrap_or(0)),
            b"EXPTIME" => meta.shutter = leading_int(&value).unwrap_or(0) as f64 / 1_000_000.0,
            b"APERTURE" => meta.aperture = leading_float(&value),
            b"FLENGTH" => meta.focal_len = leading_float(&value),
            _ => {}
        }
    }

    Ok(())
}

/// Read a NUL-terminated UTF-16 string at `offset`, keeping the low byte of
/// each code unit.
async fn read_utf16_string<R: RangeReader>(
    session: &mut Session<R>,
    offset: u64,
) -> Result<Vec<u8>, IoError> {
    session.cursor.seek(offset);
    let mut out = Vec::with_capacity(PROPERTY_CHARS);
    while out.len() < PROPERTY_CHARS {
        let unit = session.cursor.get2().await? as u8;
        if unit == 0 {
            break;
        }
        out.push(unit);
    }
    Ok(out)
}
