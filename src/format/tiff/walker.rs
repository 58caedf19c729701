//! Tagged-directory walker.
//!
//! [`parse_tiff`] reads a TIFF header at a base offset and walks the
//! directory chain behind it; [`parse_tiff_ifd`] scans one directory,
//! recording it as a [`DirectoryRecord`](crate::raw::DirectoryRecord) and
//! folding camera-level fields into the session metadata.
//!
//! # Bounds
//!
//! - A directory with more than [`MAX_IFD_ENTRIES`] entries is abandoned.
//! - Every directory scan consumes one slot of the session's directory
//!   budget; once it is spent, further directories are abandoned.
//!
//! An abandoned directory stops the chain it belongs to.

use tracing::debug;

use crate::error::IoError;
use crate::format::exif::parse_exif;
use crate::format::jpeg::probe_header;
use crate::format::mos::parse_mos;
use crate::io::RangeReader;
use crate::raw::{BoxFuture, Session};

use super::parser::{read_entry, ByteOrder, DirEntry};
use super::tags::{FieldType, TiffTag};
use super::values::{get_int, get_real, get_timestamp};

/// Most entries accepted in one top-level directory.
pub const MAX_IFD_ENTRIES: u16 = 512;

/// Orientation codes indexed by the low three bits of tag 274.
const ORIENTATION_MAP: &[u8; 8] = b"50132467";

/// Width of the Sony DSLR-A100 raw frame, whose SubIFDs entry holds the
/// raw data offset instead of directory offsets.
const A100_RAW_WIDTH: u32 = 3872;

// =============================================================================
// Chain Walking
// =============================================================================

/// Parse the TIFF header at `base` and walk its directory chain.
///
/// The chain is followed until a zero (or negative) next-directory offset,
/// or until a directory is abandoned. The caller's byte order is restored
/// on return.
///
/// # Returns
/// `false` when there is no byte-order marker at `base`.
pub fn parse_tiff<'a, R: RangeReader + 'a>(
    session: &'a mut Session<R>,
    base: u64,
) -> BoxFuture<'a, Result<bool, IoError>> {
    Box::pin(async move {
        let saved = session.cursor.byte_order();
        let result = walk_chain(session, base).await;
        session.cursor.set_byte_order(saved);
        result
    })
}

async fn walk_chain<R: RangeReader>(session: &mut Session<R>, base: u64) -> Result<bool, IoError> {
    debug!(base, "Parsing tagged directories");
    session.cursor.seek(base);
    let marker = session.cursor.get2().await?;
    if !ByteOrder::is_marker(marker) {
        return Ok(false);
    }
    session.cursor.set_byte_order(ByteOrder::from_marker(marker));
    session.cursor.get2().await?;

    loop {
        let next = session.cursor.get4().await? as i32;
        if next <= 0 {
            break;
        }
        session.cursor.seek(base + next as u64);
        if parse_tiff_ifd(session, base).await? {
            break;
        }
    }

    Ok(true)
}

// =============================================================================
// Directory Scanning
// =============================================================================

/// Scan the directory at the cursor.
///
/// Entries are handled strictly in on-disk order; after each handler the
/// cursor is put back at the entry's continuation point.
///
/// # Returns
/// `true` when the directory was abandoned (entry count over the cap, or
/// directory budget spent).
pub fn parse_tiff_ifd<'a, R: RangeReader + 'a>(
    session: &'a mut Session<R>,
    base: u64,
) -> BoxFuture<'a, Result<bool, IoError>> {
    Box::pin(async move {
        let Some(mut ifd) = session.open_directory() else {
            return Ok(true);
        };

        let entries = session.cursor.get2().await?;
        if entries > MAX_IFD_ENTRIES {
            debug!(
                entries,
                offset = session.cursor.position(),
                "Directory entry count over limit, skipping"
            );
            return Ok(true);
        }

        for _ in 0..entries {
            let entry = read_entry(&mut session.cursor, base).await?;
            apply_entry(session, &mut ifd, base, entry).await?;
            session.cursor.seek(entry.next);
        }

        Ok(false)
    })
}

async fn apply_entry<R: RangeReader>(
    session: &mut Session<R>,
    ifd: &mut usize,
    base: u64,
    entry: DirEntry,
) -> Result<(), IoError> {
    let Some(tag) = TiffTag::from_u16(entry.tag) else {
        return Ok(());
    };
    let ty = entry.field_type;

    match tag {
        TiffTag::PanasonicWidth => {
            session.meta.width = session.cursor.get2().await? as u32;
        }
        TiffTag::PanasonicHeight => {
            session.meta.height = session.cursor.get2().await? as u32;
        }
        TiffTag::PanasonicWidthAdjust => {
            let extra = session.cursor.get2().await? as u32;
            session.meta.width = session.meta.width.wrapping_add(extra);
        }
        TiffTag::PanasonicFilters => {
            session.meta.filters = session.cursor.get2().await? as u32;
        }
        TiffTag::PanasonicIso => {
            if ty == FieldType::Short as u16 {
                session.meta.iso_speed = session.cursor.get2().await? as f64;
            }
        }
        TiffTag::PanasonicJpeg => {
            if ty == FieldType::Undefined as u16
                && session.cursor.read_u8().await? == Some(0xFF)
                && session.cursor.read_u8().await? == Some(0xD8)
            {
                session.meta.thumb_offset = session.cursor.position() - 2;
                session.meta.thumb_length = entry.count as u64;
            }
        }
        TiffTag::FujiIfd => {
            let offset = session.cursor.get4().await? as u64;
            session.cursor.seek(base + offset);
            parse_tiff_ifd(session, base).await?;
        }
        TiffTag::ImageWidth => {
            let width = get_int(&mut session.cursor, ty).await?;
            session.directory(*ifd).width = width;
        }
        TiffTag::ImageLength => {
            let height = get_int(&mut session.cursor, ty).await?;
            session.directory(*ifd).height = height;
        }
        TiffTag::BitsPerSample => {
            let bps = get_int(&mut session.cursor, ty).await?;
            let dir = session.directory(*ifd);
            dir.samples = entry.count & 7;
            dir.bps = bps;
        }
        TiffTag::FujiLoadFlags => {
            session.meta.raw_height = 0;
            if session.directory(*ifd).bps <= 12 {
                let flag = session.cursor.get4().await?;
                session.meta.load_flags = if flag > 0 { 24 } else { 80 };
            }
        }
        TiffTag::Compression => {
            let comp = get_int(&mut session.cursor, ty).await?;
            session.directory(*ifd).comp = comp;
        }
        TiffTag::PhotometricInterpretation => {
            let phint = session.cursor.get2().await? as u32;
            session.directory(*ifd).phint = phint;
        }
        TiffTag::ImageDescription => {
            let buf: [u8; 512] = session.read_field().await?;
            session.meta.description.set(&buf);
        }
        TiffTag::Make => {
            let buf: [u8; 64] = session.read_field().await?;
            session.meta.make.set(&buf);
        }
        TiffTag::Model => {
            let buf: [u8; 64] = session.read_field().await?;
            session.meta.model.set(&buf);
        }
        TiffTag::RawDataOffset => {
            if ty == FieldType::Long as u16 {
                session.meta.load_flags = 0x2008;
                read_strip_offset(session, *ifd, base).await?;
            }
        }
        TiffTag::StripOffsets => {
            read_strip_offset(session, *ifd, base).await?;
        }
        TiffTag::Orientation => {
            let code = session.cursor.get2().await? & 7;
            session.directory(*ifd).flip = (ORIENTATION_MAP[code as usize] - b'0') as i32;
        }
        TiffTag::SamplesPerPixel => {
            let samples = get_int(&mut session.cursor, ty).await? & 7;
            session.directory(*ifd).samples = samples;
        }
        TiffTag::StripByteCounts => {
            let bytes = session.cursor.get4().await? as u64;
            session.directory(*ifd).bytes = bytes;
        }
        TiffTag::Software => {
            let buf: [u8; 64] = session.read_field().await?;
            session.meta.software.set(&buf);
        }
        TiffTag::DateTime => {
            if let Some(ts) = get_timestamp(&mut session.cursor).await? {
                session.meta.timestamp = Some(ts);
            }
        }
        TiffTag::Artist => {
            let buf: [u8; 64] = session.read_field().await?;
            session.meta.artist.set(&buf);
        }
        TiffTag::TileWidth => {
            let value = get_int(&mut session.cursor, ty).await?;
            session.directory(*ifd).tile_width = value;
        }
        TiffTag::TileLength => {
            let value = get_int(&mut session.cursor, ty).await?;
            session.directory(*ifd).tile_length = value;
        }
        TiffTag::TileOffsets => {
            let offset = if entry.count > 1 {
                session.cursor.position()
            } else {
                session.cursor.get4().await? as u64
            };
            let dir = session.directory(*ifd);
            dir.offset = offset;
            if entry.count == 1 {
                dir.tile_width = 0;
                dir.tile_length = 0;
            }
            if entry.count == 4 {
                session.meta.is_raw = 5;
            }
        }
        TiffTag::SubIfds => {
            if session.meta.model.eq_bytes(b"DSLR-A100")
                && session.directory(*ifd).width == A100_RAW_WIDTH
            {
                session.meta.data_offset = session.cursor.get4().await? as u64 + base;
                *ifd += 1;
                return Ok(());
            }
            for _ in 0..entry.count {
                let here = session.cursor.position();
                let offset = session.cursor.get4().await? as u64;
                session.cursor.seek(base + offset);
                if parse_tiff_ifd(session, base).await? {
                    break;
                }
                session.cursor.seek(here + 4);
            }
        }
        TiffTag::ExposureTime => {
            let shutter = get_real(&mut session.cursor, ty).await?;
            session.directory(*ifd).shutter = shutter;
            session.meta.shutter = shutter;
        }
        TiffTag::FNumber => {
            session.meta.aperture = get_real(&mut session.cursor, ty).await?;
        }
        TiffTag::LeafMarker => {
            session.meta.make.set(b"Leaf");
        }
        TiffTag::LeafBlocks => {
            let offset = session.cursor.position();
            parse_mos(session, offset, 0).await?;
            session.meta.make.set(b"Leaf");
        }
        TiffTag::ExifIfd => {
            let offset = session.cursor.get4().await? as u64;
            session.cursor.seek(base + offset);
            parse_exif(session, base).await?;
        }
        TiffTag::FocalLength => {
            session.meta.focal_len = get_real(&mut session.cursor, ty).await?;
        }
        TiffTag::ImageNumber => {
            session.meta.shot_order = get_int(&mut session.cursor, ty).await?;
        }
        TiffTag::DngVersion => {
            let mut version = 0u32;
            for _ in 0..4 {
                let byte = session.cursor.read_u8_or_fill().await? as u32;
                version = (version << 8) + byte;
            }
            session.meta.dng_version = version;
        }
        TiffTag::OpcodeList2 => {
            session.meta.meta_offset = session.cursor.position();
        }
    }

    Ok(())
}

/// Record a strip offset; when the directory has no declared bit depth,
/// probe the strip for a lossless-JPEG header and take the geometry from
/// it. Such strips carry their own TIFF header 12 bytes in.
async fn read_strip_offset<R: RangeReader>(
    session: &mut Session<R>,
    ifd: usize,
    base: u64,
) -> Result<(), IoError> {
    let offset = base + session.cursor.get4().await? as u64;
    let dir = session.directory(ifd);
    dir.offset = offset;
    if dir.bps != 0 || offset == 0 {
        return Ok(());
    }

    session.cursor.seek(offset);
    let dng = session.meta.dng_version > 0;
    let Some(header) = probe_header(&mut session.cursor, dng).await? else {
        return Ok(());
    };

    let dir = session.directory(ifd);
    dir.comp = 6;
    dir.width = header.wide;
    dir.height = header.high;
    dir.bps = header.bits.max(0) as u32;
    dir.samples = header.clrs;
    if header.sraw == 0 && header.clrs & 1 == 0 {
        dir.width = dir.width.wrapping_mul(header.clrs);
    }
    if dir.width > dir.height.saturating_mul(4) && header.clrs > 0 {
        dir.width /= 2;
        dir.height = dir.height.wrapping_mul(2);
    }

    parse_tiff(session, offset + 12).await?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
