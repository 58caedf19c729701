//! Maker-note parsing.
//!
//! A maker note is a vendor-private tagged directory inside the EXIF block.
//! Its layout is announced by a 10-byte signature:
//!
//! | Signature            | Base offset        | Byte order   | Entries start      |
//! |----------------------|--------------------|--------------|--------------------|
//! | `Nikon`              | after signature    | own header   | header offset      |
//! | `OLYMPUS`, `PENTAX ` | signature start    | bytes 8..10  | 10 (12 for Olympus)|
//! | `SONY*`, `Panasonic` | unchanged          | little       | 12                 |
//! | `FUJIFILM*`          | signature start    | little       | 12                 |
//! | `OLYMP`, `LEICA`, `Ricoh`, `EPSON` | unchanged | unchanged | 8                |
//! | `AOC`, `QVC`         | unchanged          | unchanged    | 6                  |
//! | anything else        | unchanged (Samsung: note start) | unchanged | 0     |
//!
//! Tags are matched numerically; the upper 16 bits carry the tag of the
//! enclosing note when notes nest.

use tracing::debug;

use crate::error::IoError;
use crate::format::exif::MAX_NOTE_ENTRIES;
use crate::format::tiff::{parse_tiff_ifd, read_entry, ByteOrder, FieldType};
use crate::io::RangeReader;
use crate::raw::{starts_with_ignore_case, BoxFuture, Session};

/// Marks the start of the orientation record in a Nikon 0xd block.
const ORIENTATION_SENTINEL: u16 = 0xbbbb;

/// Capture-note record holding the rotation angle.
const CAPTURE_NOTE_ROTATION: u32 = 0x76a43207;

/// Color filter pattern implied by a tag 0x81 raw block.
const TAG_81_FILTERS: u32 = 0x61616161;

/// Bytes before the value of the first capture-note record, and the
/// header size of every record.
const CAPTURE_NOTE_HEADER: u64 = 22;

const BYTE: u16 = FieldType::Byte as u16;
const ASCII: u16 = FieldType::Ascii as u16;
const LONG: u16 = FieldType::Long as u16;
const UNDEFINED: u16 = FieldType::Undefined as u16;
const IFD: u16 = FieldType::Ifd as u16;

/// The signature up to its first NUL.
fn c_str(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

#[inline]
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// =============================================================================
// Maker Note
// =============================================================================

/// Parse the maker note at the cursor.
///
/// # Arguments
/// * `base` - Base of the enclosing directory; some signatures replace it
/// * `uptag` - Tag of the enclosing note, 0 at the top level
pub fn parse_maker_note<'a, R: RangeReader + 'a>(
    session: &'a mut Session<R>,
    base: u64,
    uptag: u32,
) -> BoxFuture<'a, Result<(), IoError>> {
    Box::pin(async move {
        if session.meta.make.starts_with_ignore_case(b"Nokia") || !session.enter_block() {
            return Ok(());
        }

        let saved = session.cursor.byte_order();
        let result = scan_note(session, base, uptag).await;
        session.cursor.set_byte_order(saved);
        result
    })
}

async fn scan_note<R: RangeReader>(
    session: &mut Session<R>,
    base: u64,
    uptag: u32,
) -> Result<(), IoError> {
    let base = read_signature(session, base).await?;

    let entries = session.cursor.get2().await?;
    if entries > MAX_NOTE_ENTRIES {
        debug!(entries, "Maker note entry count over limit, skipping");
        return Ok(());
    }

    let note_order = session.cursor.byte_order();
    for _ in 0..entries {
        session.cursor.set_byte_order(note_order);
        let entry = read_entry(&mut session.cursor, base).await?;
        apply_entry(session, base, uptag, entry.tag, entry.field_type, entry.count).await?;
        session.cursor.seek(entry.next);
    }

    Ok(())
}

/// Consume the vendor signature and position the cursor at the entry count.
///
/// # Returns
/// The base offset for the note's indirect values.
async fn read_signature<R: RangeReader>(
    session: &mut Session<R>,
    mut base: u64,
) -> Result<u64, IoError> {
    let buf: [u8; 10] = session.read_field().await?;
    let sig = c_str(&buf);
    let cursor = &mut session.cursor;

    if sig == b"Nikon" {
        base = cursor.position();
        let marker = cursor.get2().await?;
        cursor.set_byte_order(ByteOrder::from_marker(marker));
        cursor.get2().await?;
        let offset = cursor.get4().await?;
        cursor.skip(offset as i64 - 8);
    } else if sig == b"OLYMPUS" || sig == b"PENTAX " {
        base = cursor.position().saturating_sub(10);
        cursor.skip(-2);
        let marker = cursor.get2().await?;
        cursor.set_byte_order(ByteOrder::from_marker(marker));
        if buf[0] == b'O' {
            cursor.get2().await?;
        }
    } else if buf.starts_with(b"SONY") || sig == b"Panasonic" {
        cursor.set_byte_order(ByteOrder::LittleEndian);
        cursor.skip(2);
    } else if buf.starts_with(b"FUJIFILM") {
        base = cursor.position().saturating_sub(10);
        cursor.set_byte_order(ByteOrder::LittleEndian);
        cursor.skip(2);
    } else if [b"OLYMP".as_slice(), b"LEICA", b"Ricoh", b"EPSON"].contains(&sig) {
        cursor.skip(-2);
    } else if sig == b"AOC" || sig == b"QVC" {
        cursor.skip(-4);
    } else {
        cursor.skip(-10);
        if session.meta.make.starts_with_ignore_case(b"SAMSUNG") {
            base = cursor.position();
        }
    }

    Ok(base)
}

/// Run every handler matching one entry, in order.
///
/// Several handlers may fire for the same entry; a capture note even
/// replaces the tag seen by the handlers after it.
async fn apply_entry<R: RangeReader>(
    session: &mut Session<R>,
    base: u64,
    uptag: u32,
    raw_tag: u16,
    ty: u16,
    len: u32,
) -> Result<(), IoError> {
    let mut tag = raw_tag as u32 | uptag << 16;
    let make = session.meta.make.clone();
    let make = make.as_bytes();

    if tag == 2 && contains(make, b"NIKON") && session.meta.iso_speed == 0.0 {
        session.cursor.get2().await?;
        session.meta.iso_speed = session.cursor.get2().await? as f64;
    }
    if tag == 4 && len > 26 && len < 35 {
        read_exposure_block(session).await?;
    }
    if (tag == 4 || tag == 0x114) && starts_with_ignore_case(make, b"KONICA") {
        session.cursor.skip(if tag == 4 { 140 } else { 160 });
        match session.cursor.get2().await? {
            72 => session.flip = Some(0),
            76 => session.flip = Some(6),
            82 => session.flip = Some(5),
            _ => {}
        }
    }
    if tag == 7 && ty == ASCII && len > 20 {
        let buf: [u8; 64] = session.read_field().await?;
        session.meta.model2.set(&buf);
    }
    if tag == 8 && ty == LONG {
        session.meta.shot_order = session.cursor.get4().await?;
    }
    if tag == 0xd && ty == UNDEFINED && session.cursor.get2().await? == 0xaaaa {
        read_orientation_block(session, len).await?;
    }
    if tag == 0x10 && ty == LONG {
        session.meta.unique_id = session.cursor.get4().await?;
    }
    if tag == 0x11 && session.meta.is_raw > 0 && make.starts_with(b"NIKON") {
        let offset = session.cursor.get4().await? as u64;
        session.cursor.seek(base + offset);
        parse_tiff_ifd(session, base).await?;
    }
    if tag == 0x15 && ty == ASCII && session.meta.is_raw > 0 {
        let buf: [u8; 64] = session.read_field().await?;
        session.meta.model.set(&buf);
    }
    if contains(make, b"PENTAX") {
        match tag {
            0x1b => tag = 0x1018,
            0x1c => tag = 0x1017,
            _ => {}
        }
    }
    if tag == 0x1d {
        read_serial(session, len).await?;
    }
    if tag == 0x81 && ty == LONG {
        let offset = session.cursor.get4().await? as u64;
        session.meta.data_offset = offset;
        session.cursor.seek(offset + 41);
        session.meta.raw_height = (session.cursor.get2().await? as u32).wrapping_mul(2);
        session.meta.raw_width = session.cursor.get2().await? as u32;
        session.meta.filters = TAG_81_FILTERS;
    }
    if (tag == 0x81 && ty == UNDEFINED) || (tag == 0x100 && ty == UNDEFINED) || (tag == 0x280 && ty == BYTE)
    {
        session.meta.thumb_offset = session.cursor.position();
        session.meta.thumb_length = len as u64;
    }
    if tag == 0x88 && ty == LONG {
        let offset = session.cursor.get4().await? as u64;
        session.meta.thumb_offset = if offset > 0 { offset + base } else { 0 };
    }
    if tag == 0x89 && ty == LONG {
        session.meta.thumb_length = session.cursor.get4().await? as u64;
    }
    if tag == 0x8c || tag == 0x96 {
        session.meta.meta_offset = session.cursor.position();
    }
    if tag == 0x200 && len == 3 {
        session.cursor.get4().await?;
        session.meta.shot_order = session.cursor.get4().await?;
    }
    if tag == 0x220 && ty == UNDEFINED {
        session.meta.meta_offset = session.cursor.position();
    }
    if tag == 0xe01 {
        tag = read_capture_note(session, len).await?.unwrap_or(tag);
    }
    if (tag | 0x70) == 0x2070 && (ty == LONG || ty == IFD) {
        let offset = session.cursor.get4().await? as u64;
        session.cursor.seek(offset + base);
    }
    if tag == 0x2020 {
        parse_thumb_note(session, base, 257, 258).await?;
    }
    if tag == 0x2040 {
        parse_maker_note(session, base, 0x2040).await?;
    }
    if tag == 0xb028 {
        let offset = session.cursor.get4().await? as u64;
        session.cursor.seek(offset + base);
        parse_thumb_note(session, base, 136, 137).await?;
    }
    if tag == 0xb001 {
        session.meta.unique_id = session.cursor.get2().await? as u32;
    }

    Ok(())
}

/// Canon-style packed exposure block: ISO, aperture and shutter as APEX
/// values, then white balance and shot counter. Exposure values only fill
/// fields that are still unset.
async fn read_exposure_block<R: RangeReader>(session: &mut Session<R>) -> Result<(), IoError> {
    let cursor = &mut session.cursor;
    let meta = &mut session.meta;

    cursor.get4().await?;
    let iso = cursor.get2().await?;
    if iso != 0x7fff && meta.iso_speed == 0.0 {
        meta.iso_speed = 50.0 * (iso as f64 / 32.0 - 4.0).exp2();
    }
    cursor.get2().await?;
    let aperture = cursor.get2().await?;
    if aperture != 0x7fff && meta.aperture == 0.0 {
        meta.aperture = (aperture as f64 / 64.0).exp2();
    }
    let shutter = cursor.get2().await?;
    if shutter != 0xffff && meta.shutter == 0.0 {
        meta.shutter = (shutter as f64 / -32.0).exp2();
    }
    cursor.get2().await?;
    meta.white_balance_index = cursor.get2().await? as u32;
    cursor.get2().await?;
    meta.shot_order = cursor.get2().await? as u32;
    Ok(())
}

/// Nikon 0xd block: skip to the sentinel, then look for record 257 whose
/// trailing byte selects the orientation.
async fn read_orientation_block<R: RangeReader>(
    session: &mut Session<R>,
    len: u32,
) -> Result<(), IoError> {
    let mut c: u32 = 2;
    let mut i: u32 = 2;
    while c as u16 != ORIENTATION_SENTINEL && i < len {
        let Some(byte) = session.cursor.read_u8().await? else {
            break;
        };
        c = c << 8 | byte as u32;
        i += 1;
    }

    let len = len as i64;
    let mut i = i as i64;
    loop {
        i += 4;
        if i >= len - 5 || session.cursor.remaining() == 0 {
            break;
        }
        if session.cursor.get4().await? == 257 {
            i = len;
            session.cursor.get4().await?;
            let code = session.cursor.read_u8_or_fill().await?;
            if code < 3 {
                session.flip = Some((b"065"[code as usize] - b'0') as i32);
            }
        }
    }
    Ok(())
}

/// Serial number text folded into an integer: digits add their value,
/// other bytes add their value mod 10.
async fn read_serial<R: RangeReader>(session: &mut Session<R>, len: u32) -> Result<(), IoError> {
    let mut serial = session.meta.serial;
    for _ in 0..len {
        match session.cursor.read_u8().await? {
            None | Some(0) => break,
            Some(c) => {
                let digit = if c.is_ascii_digit() { c - b'0' } else { c % 10 };
                serial = serial.wrapping_mul(10).wrapping_add(digit as u64);
            }
        }
    }
    session.meta.serial = serial;
    Ok(())
}

/// Nikon capture note: a little-endian list of records searched for the
/// rotation angle.
///
/// # Returns
/// The tag of the last record visited, which replaces the entry tag.
async fn read_capture_note<R: RangeReader>(
    session: &mut Session<R>,
    len: u32,
) -> Result<Option<u32>, IoError> {
    let cursor = &mut session.cursor;
    cursor.set_byte_order(ByteOrder::LittleEndian);
    cursor.skip(CAPTURE_NOTE_HEADER as i64);

    let mut last = None;
    let mut offset = CAPTURE_NOTE_HEADER;
    while offset + CAPTURE_NOTE_HEADER < len as u64 && cursor.remaining() > 0 {
        let record = cursor.get4().await?;
        last = Some(record);
        cursor.skip(14);
        let size = cursor.get4().await?.wrapping_sub(4);
        if record == CAPTURE_NOTE_ROTATION {
            session.flip = Some(cursor.get2().await? as i32);
        } else {
            cursor.skip(size as i64);
        }
        offset += CAPTURE_NOTE_HEADER + size as u64;
    }
    Ok(last)
}

// =============================================================================
// Thumbnail Note
// =============================================================================

/// Scan a directory for a thumbnail offset/length tag pair only.
///
/// # Arguments
/// * `toff` - Tag holding the thumbnail offset, relative to `base`
/// * `tlen` - Tag holding the thumbnail length
pub async fn parse_thumb_note<R: RangeReader>(
    session: &mut Session<R>,
    base: u64,
    toff: u16,
    tlen: u16,
) -> Result<(), IoError> {
    let entries = session.cursor.get2().await?;
    if entries > MAX_NOTE_ENTRIES {
        debug!(entries, "Thumbnail note entry count over limit, skipping");
        return Ok(());
    }

    for _ in 0..entries {
        let entry = read_entry(&mut session.cursor, base).await?;
        if entry.tag == toff {
            session.meta.thumb_offset = session.cursor.get4().await? as u64 + base;
        }
        if entry.tag == tlen {
            session.meta.thumb_length = session.cursor.get4().await? as u64;
        }
        session.cursor.seek(entry.next);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
