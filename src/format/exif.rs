//! EXIF sub-directory parsing.
//!
//! The EXIF directory is a plain tagged directory; only the exposure
//! fields, the capture time and the maker-note pointer are used. Raw
//! dimensions are taken from the pixel-dimension tags only for early Kodak
//! files, whose primary directories do not carry them.

use tracing::debug;

use crate::error::IoError;
use crate::format::makernote::parse_maker_note;
use crate::format::tiff::{get_real, get_timestamp, read_entry, ExifTag};
use crate::io::RangeReader;
use crate::raw::Session;

/// Most entries accepted in an EXIF or maker-note directory.
pub const MAX_NOTE_ENTRIES: u16 = 1000;

/// APEX shutter values at or above this are ignored.
const MAX_SHUTTER_EXPONENT: f64 = 128.0;

/// Parse the EXIF directory at the cursor.
///
/// # Arguments
/// * `session` - Parse session, cursor at the directory's entry count
/// * `base` - Base that indirect offsets are relative to
pub async fn parse_exif<R: RangeReader>(session: &mut Session<R>, base: u64) -> Result<(), IoError> {
    if !session.enter_block() {
        return Ok(());
    }
    let kodak = session.meta.make.as_bytes().starts_with(b"EASTMAN") && session.dirs.len() < 3;

    let entries = session.cursor.get2().await?;
    if entries > MAX_NOTE_ENTRIES {
        debug!(entries, "EXIF entry count over limit, skipping");
        return Ok(());
    }

    for _ in 0..entries {
        let entry = read_entry(&mut session.cursor, base).await?;
        let ty = entry.field_type;

        match ExifTag::from_u16(entry.tag) {
            Some(ExifTag::ExposureTime) => {
                let shutter = get_real(&mut session.cursor, ty).await?;
                set_shutter(session, shutter);
            }
            Some(ExifTag::FNumber) => {
                session.meta.aperture = get_real(&mut session.cursor, ty).await?;
            }
            Some(ExifTag::ExposureProgram) => {
                session.meta.exposure_program = session.cursor.get2().await?;
            }
            Some(ExifTag::IsoSpeed) => {
                session.meta.iso_speed = session.cursor.get2().await? as f64;
            }
            Some(ExifTag::DateTimeOriginal) | Some(ExifTag::DateTimeDigitized) => {
                if let Some(ts) = get_timestamp(&mut session.cursor).await? {
                    session.meta.timestamp = Some(ts);
                }
            }
            Some(ExifTag::ShutterSpeedValue) => {
                let expo = -get_real(&mut session.cursor, ty).await?;
                if expo < MAX_SHUTTER_EXPONENT {
                    set_shutter(session, expo.exp2());
                }
            }
            Some(ExifTag::ApertureValue) => {
                let value = get_real(&mut session.cursor, ty).await?;
                session.meta.aperture = (value / 2.0).exp2();
            }
            Some(ExifTag::ExposureBias) => {
                session.meta.exposure = get_real(&mut session.cursor, ty).await?;
            }
            Some(ExifTag::Flash) => {
                session.meta.flash = session.cursor.get2().await?;
            }
            Some(ExifTag::FocalLength) => {
                session.meta.focal_len = get_real(&mut session.cursor, ty).await?;
            }
            Some(ExifTag::MakerNote) => {
                parse_maker_note(session, base, 0).await?;
            }
            Some(ExifTag::PixelXDimension) if kodak => {
                session.meta.raw_width = session.cursor.get4().await?;
            }
            Some(ExifTag::PixelYDimension) if kodak => {
                session.meta.raw_height = session.cursor.get4().await?;
            }
            _ => {}
        }

        session.cursor.seek(entry.next);
    }

    Ok(())
}

/// Store a shutter value on the camera and on the latest directory record.
fn set_shutter<R>(session: &mut Session<R>, shutter: f64) {
    if let Some(dir) = session.dirs.last_mut() {
        dir.shutter = shutter;
    }
    session.meta.shutter = shutter;
}
