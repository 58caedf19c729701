//! Canon CIFF heap parsing (CRW files).
//!
//! A heap ends with a 4-byte pointer to its record table:
//!
//! ```text
//! table:  count:u16, then count records of
//!         type:u16  length:u32  offset:u32   (offset relative to heap start)
//! ```
//!
//! Records whose type marks them as a sub-heap are parsed recursively.
//! A single guard bounds both breadth and depth: a table is skipped when
//! `count | depth` exceeds 127. Every sub-heap entered is also charged to
//! the session's nested block budget, which caps the total across siblings.

use tracing::debug;

use crate::error::IoError;
use crate::format::tiff::unix_timestamp;
use crate::io::RangeReader;
use crate::raw::{BoxFuture, Session};

/// Upper bound on `record count | depth`.
pub const MAX_CIFF_RECORDS: u32 = 127;

/// Largest white-balance index accepted from the shot-info record.
const MAX_WHITE_BALANCE_INDEX: u32 = 17;

// Record types
const ARTIST: u16 = 0x0810;
const MAKE_MODEL: u16 = 0x080a;
const IMAGE_SPEC: u16 = 0x1810;
const COMPRESSION: u16 = 0x1835;
const THUMBNAIL: u16 = 0x2007;
const EXPOSURE_INFO: u16 = 0x1818;
const SHOT_INFO: u16 = 0x102a;
const SENSOR_INFO: u16 = 0x1031;
const FOCAL_LENGTH: u16 = 0x5029;
const FLASH: u16 = 0x5813;
const SHOT_ORDER: u16 = 0x5817;
const UNIQUE_ID: u16 = 0x5834;
const CAPTURE_TIME_INLINE: u16 = 0x580e;
const CAPTURE_TIME: u16 = 0x180e;

/// Whether a record type denotes a nested heap (0x28xx or 0x30xx).
#[inline]
fn is_sub_heap(record_type: u16) -> bool {
    (((record_type >> 8) + 8) | 8) == 0x38
}

/// Parse the heap spanning `length` bytes at `offset`.
pub fn parse_ciff<'a, R: RangeReader + 'a>(
    session: &'a mut Session<R>,
    offset: u64,
    length: i64,
    depth: u32,
) -> BoxFuture<'a, Result<(), IoError>> {
    Box::pin(async move {
        debug!(offset, length, depth, "Parsing CIFF heap");
        session.cursor.seek_signed(offset as i64 + length - 4);
        let table = session.cursor.get4().await? as u64 + offset;
        session.cursor.seek(table);

        let records = session.cursor.get2().await? as u32;
        if (records | depth) > MAX_CIFF_RECORDS {
            debug!(records, depth, "CIFF table over limit, skipping");
            return Ok(());
        }

        for _ in 0..records {
            let record_type = session.cursor.get2().await?;
            let len = session.cursor.get4().await?;
            let save = session.cursor.position() + 4;
            let data = session.cursor.get4().await? as u64;
            session.cursor.seek(offset + data);

            if is_sub_heap(record_type) && session.enter_block() {
                let start = session.cursor.position();
                parse_ciff(session, start, len as i64, depth + 1).await?;
            }
            apply_record(session, record_type, len).await?;

            session.cursor.seek(save);
        }

        Ok(())
    })
}

async fn apply_record<R: RangeReader>(
    session: &mut Session<R>,
    record_type: u16,
    len: u32,
) -> Result<(), IoError> {
    match record_type {
        ARTIST => {
            let buf: [u8; 64] = session.read_field().await?;
            session.meta.artist.set(&buf);
        }
        MAKE_MODEL => {
            let start = session.cursor.position();
            let buf: [u8; 64] = session.read_field().await?;
            session.meta.make.set(&buf);
            session.cursor.seek(start + session.meta.make.len() as u64 + 1);
            let buf: [u8; 64] = session.read_field().await?;
            session.meta.model.set(&buf);
        }
        IMAGE_SPEC => {
            session.meta.width = session.cursor.get4().await? & 0xffff;
            session.meta.height = session.cursor.get4().await? & 0xffff;
            session.cursor.get4().await?;
            session.flip = Some(session.cursor.get4().await? as i32);
        }
        COMPRESSION => {
            session.meta.compression = session.cursor.get4().await?;
        }
        THUMBNAIL => {
            session.meta.thumb_offset = session.cursor.position();
            session.meta.thumb_length = len as u64;
        }
        EXPOSURE_INFO => {
            session.cursor.get4().await?;
            let tv = f32::from_bits(session.cursor.get4().await?) as f64;
            let av = f32::from_bits(session.cursor.get4().await?) as f64;
            session.meta.shutter = (-tv).exp2();
            session.meta.aperture = (av / 2.0).exp2();
        }
        SHOT_INFO => {
            let cursor = &mut session.cursor;
            let meta = &mut session.meta;
            cursor.get4().await?;
            let iso = cursor.get2().await? as f64;
            meta.iso_speed = (iso / 32.0 - 4.0).exp2() * 50.0;
            cursor.get2().await?;
            let av = cursor.get2().await? as i16 as f64;
            meta.aperture = (av / 64.0).exp2();
            let tv = cursor.get2().await? as i16 as f64;
            meta.shutter = (-tv / 32.0).exp2();
            cursor.get2().await?;
            let wbi = cursor.get2().await? as u32;
            meta.white_balance_index = if wbi > MAX_WHITE_BALANCE_INDEX { 0 } else { wbi };
            cursor.skip(32);
            if meta.shutter > 1e6 {
                meta.shutter = cursor.get2().await? as f64 / 10.0;
            }
        }
        SENSOR_INFO => {
            session.cursor.get2().await?;
            session.meta.raw_width = session.cursor.get2().await? as u32;
            session.meta.raw_height = session.cursor.get2().await? as u32;
        }
        FOCAL_LENGTH => {
            let mut focal = (len >> 16) as f64;
            if len & 0xffff == 2 {
                focal /= 32.0;
            }
            session.meta.focal_len = focal;
        }
        FLASH => {
            session.meta.flash_used = f32::from_bits(len) as f64;
        }
        SHOT_ORDER => {
            session.meta.shot_order = len;
        }
        UNIQUE_ID => {
            session.meta.unique_id = len;
        }
        CAPTURE_TIME_INLINE => {
            session.meta.timestamp = unix_timestamp(len as i32 as i64);
        }
        CAPTURE_TIME => {
            let seconds = session.cursor.get4().await? as i32 as i64;
            session.meta.timestamp = unix_timestamp(seconds);
        }
        _ => {}
    }
    Ok(())
}
