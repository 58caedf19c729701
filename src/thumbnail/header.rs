//! Minimal Exif header for thumbnails that lack their own.
//!
//! The header is a complete big-endian TIFF structure of fixed size
//! ([`HEADER_SIZE`] bytes): one primary directory, one EXIF directory, an
//! empty GPS directory, and the value areas the entries point into. All
//! pointers are relative to the start of the header, which is where the
//! TIFF data of an Exif APP1 segment begins.
//!
//! # Layout
//!
//! | Offset | Size | Content                                   |
//! |--------|------|-------------------------------------------|
//! | 0      | 8    | "MM", 42, first directory at 10           |
//! | 10     | 2    | primary entry count                       |
//! | 12     | 276  | up to 23 primary entries                  |
//! | 288    | 4    | next directory (0)                        |
//! | 294    | 2    | EXIF entry count                          |
//! | 296    | 84   | up to 7 EXIF entries                      |
//! | 382    | 2    | GPS entry count (0)                       |
//! | 384    | 120  | up to 10 GPS entries                      |
//! | 504    | 8    | bits per sample (unused)                  |
//! | 512    | 48   | 6 rationals: x/y resolution, shutter, aperture, focal length, exposure bias |
//! | 560    | 104  | GPS words (unused)                        |
//! | 664    | 512  | description                               |
//! | 1176   | 64   | make                                      |
//! | 1240   | 64   | model                                     |
//! | 1304   | 32   | software                                  |
//! | 1336   | 20   | capture date                              |
//! | 1356   | 64   | artist                                    |

use crate::format::tiff::{ExifTag, FieldType, TiffTag};
use crate::raw::CameraMetadata;

/// Total size of the synthesized header.
pub const HEADER_SIZE: usize = 1420;

/// Offset of the first directory.
const FIRST_IFD: u32 = 10;

const PRIMARY_COUNT_AT: usize = 10;
const PRIMARY_AT: usize = 12;
const EXIF_COUNT_AT: usize = 294;
const EXIF_AT: usize = 296;
const GPS_COUNT_AT: usize = 382;

const RATIONALS_AT: usize = 512;
const X_RESOLUTION_AT: usize = RATIONALS_AT;
const Y_RESOLUTION_AT: usize = RATIONALS_AT + 8;
const SHUTTER_AT: usize = RATIONALS_AT + 16;
const APERTURE_AT: usize = RATIONALS_AT + 24;
const FOCAL_LENGTH_AT: usize = RATIONALS_AT + 32;
const EXPOSURE_BIAS_AT: usize = RATIONALS_AT + 40;

const DESCRIPTION: Field = Field { at: 664, len: 512 };
const MAKE: Field = Field { at: 1176, len: 64 };
const MODEL: Field = Field { at: 1240, len: 64 };
const SOFTWARE: Field = Field { at: 1304, len: 32 };
const DATE: Field = Field { at: 1336, len: 20 };
const ARTIST: Field = Field { at: 1356, len: 64 };

/// Denominator of the exposure rationals.
const RATIONAL_SCALE: f64 = 1_000_000.0;

/// Pixels per inch written as both resolutions.
const RESOLUTION: i32 = 300;

/// Orientation tag values indexed by flip code.
const ORIENTATION: &[u8; 8] = b"12435867";

// Layout tags the walker never reads
const X_RESOLUTION: u16 = 282;
const Y_RESOLUTION: u16 = 283;
const PLANAR_CONFIGURATION: u16 = 284;
const RESOLUTION_UNIT: u16 = 296;

/// Chunky planar configuration.
const PLANAR_CHUNKY: u16 = 1;

/// Resolution in inches.
const UNIT_INCH: u16 = 2;

const ENTRY_SIZE: usize = 12;

/// Fixed-size text area inside the header.
#[derive(Clone, Copy)]
struct Field {
    at: usize,
    len: usize,
}

// =============================================================================
// Writer
// =============================================================================

/// Big-endian writer over the fixed header buffer.
struct HeaderWriter {
    buf: [u8; HEADER_SIZE],
}

impl HeaderWriter {
    fn new() -> Self {
        Self {
            buf: [0; HEADER_SIZE],
        }
    }

    #[inline]
    fn put_u16(&mut self, at: usize, value: u16) {
        self.buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }

    #[inline]
    fn put_u32(&mut self, at: usize, value: u32) {
        self.buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
    }

    #[inline]
    fn put_i32(&mut self, at: usize, value: i32) {
        self.buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
    }

    fn put_rational(&mut self, at: usize, numerator: i32, denominator: i32) {
        self.put_i32(at, numerator);
        self.put_i32(at + 4, denominator);
    }

    /// Copy text into a field, keeping at least one terminating zero.
    fn put_text(&mut self, field: Field, text: &[u8]) {
        let len = text.len().min(field.len - 1);
        self.buf[field.at..field.at + len].copy_from_slice(&text[..len]);
    }

    fn text(&self, field: Field) -> &[u8] {
        &self.buf[field.at..field.at + field.len]
    }
}

/// Appends entries to one directory of the header.
struct Directory {
    count_at: usize,
    entries_at: usize,
    count: u16,
}

impl Directory {
    fn new(count_at: usize, entries_at: usize) -> Self {
        Self {
            count_at,
            entries_at,
            count: 0,
        }
    }

    fn push_raw(&mut self, w: &mut HeaderWriter, tag: u16, field_type: FieldType, count: u32, value: [u8; 4]) {
        let at = self.entries_at + self.count as usize * ENTRY_SIZE;
        w.put_u16(at, tag);
        w.put_u16(at + 2, field_type as u16);
        w.put_u32(at + 4, count);
        w.buf[at + 8..at + 12].copy_from_slice(&value);
        self.count += 1;
        w.put_u16(self.count_at, self.count);
    }

    /// SHORT value, stored left-justified in the value slot.
    fn push_short(&mut self, w: &mut HeaderWriter, tag: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.push_raw(w, tag, FieldType::Short, 1, [hi, lo, 0, 0]);
    }

    /// Entry whose value lives at `offset` within the header.
    fn push_offset(&mut self, w: &mut HeaderWriter, tag: u16, field_type: FieldType, count: u32, offset: usize) {
        self.push_raw(w, tag, field_type, count, (offset as u32).to_be_bytes());
    }

    /// ASCII entry over a text field; short strings are stored inline.
    fn push_text(&mut self, w: &mut HeaderWriter, tag: u16, field: Field) {
        let text = w.text(field);
        let len = text[..field.len - 1]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(field.len - 1);
        let count = len + 1;
        if count <= 4 {
            let mut inline = [0u8; 4];
            inline.copy_from_slice(&text[..4]);
            self.push_raw(w, tag, FieldType::Ascii, count as u32, inline);
        } else {
            self.push_offset(w, tag, FieldType::Ascii, count as u32, field.at);
        }
    }
}

// =============================================================================
// Header synthesis
// =============================================================================

/// Build the header describing `meta`.
///
/// The orientation is taken from `meta.flip`; codes above 7 are written as
/// "upright".
pub fn build_header(meta: &CameraMetadata) -> [u8; HEADER_SIZE] {
    let mut w = HeaderWriter::new();

    w.buf[0..2].copy_from_slice(b"MM");
    w.put_u16(2, 42);
    w.put_u32(4, FIRST_IFD);

    w.put_rational(X_RESOLUTION_AT, RESOLUTION, 1);
    w.put_rational(Y_RESOLUTION_AT, RESOLUTION, 1);
    w.put_rational(SHUTTER_AT, scaled(meta.shutter), RATIONAL_SCALE as i32);
    w.put_rational(APERTURE_AT, scaled(meta.aperture), RATIONAL_SCALE as i32);
    w.put_rational(FOCAL_LENGTH_AT, scaled(meta.focal_len), RATIONAL_SCALE as i32);
    w.put_rational(EXPOSURE_BIAS_AT, scaled(meta.exposure), RATIONAL_SCALE as i32);

    w.put_text(DESCRIPTION, meta.description.as_bytes());
    w.put_text(MAKE, meta.make.as_bytes());
    w.put_text(MODEL, meta.model.as_bytes());
    w.put_text(SOFTWARE, meta.software.as_bytes());
    if let Some(ts) = meta.timestamp {
        w.put_text(DATE, ts.format("%Y:%m:%d %H:%M:%S").to_string().as_bytes());
    }
    w.put_text(ARTIST, meta.artist.as_bytes());

    let mut primary = Directory::new(PRIMARY_COUNT_AT, PRIMARY_AT);
    primary.push_text(&mut w, TiffTag::ImageDescription as u16, DESCRIPTION);
    primary.push_text(&mut w, TiffTag::Make as u16, MAKE);
    primary.push_text(&mut w, TiffTag::Model as u16, MODEL);
    primary.push_short(&mut w, TiffTag::Orientation as u16, orientation(meta.flip));
    primary.push_offset(&mut w, X_RESOLUTION, FieldType::Rational, 1, X_RESOLUTION_AT);
    primary.push_offset(&mut w, Y_RESOLUTION, FieldType::Rational, 1, Y_RESOLUTION_AT);
    primary.push_short(&mut w, PLANAR_CONFIGURATION, PLANAR_CHUNKY);
    primary.push_short(&mut w, RESOLUTION_UNIT, UNIT_INCH);
    primary.push_text(&mut w, TiffTag::Software as u16, SOFTWARE);
    primary.push_text(&mut w, TiffTag::DateTime as u16, DATE);
    primary.push_text(&mut w, TiffTag::Artist as u16, ARTIST);
    primary.push_raw(
        &mut w,
        TiffTag::ExifIfd as u16,
        FieldType::Long,
        1,
        (EXIF_COUNT_AT as u32).to_be_bytes(),
    );

    let mut exif = Directory::new(EXIF_COUNT_AT, EXIF_AT);
    exif.push_offset(&mut w, ExifTag::ExposureTime as u16, FieldType::Rational, 1, SHUTTER_AT);
    exif.push_offset(&mut w, ExifTag::FNumber as u16, FieldType::Rational, 1, APERTURE_AT);
    exif.push_short(&mut w, ExifTag::ExposureProgram as u16, meta.exposure_program);
    exif.push_short(&mut w, ExifTag::IsoSpeed as u16, meta.iso_speed as i32 as u16);
    exif.push_offset(&mut w, ExifTag::ExposureBias as u16, FieldType::SRational, 1, EXPOSURE_BIAS_AT);
    exif.push_short(&mut w, ExifTag::Flash as u16, meta.flash);
    exif.push_offset(&mut w, ExifTag::FocalLength as u16, FieldType::Rational, 1, FOCAL_LENGTH_AT);

    // The GPS directory stays empty
    w.buf
}

#[inline]
fn scaled(value: f64) -> i32 {
    (value * RATIONAL_SCALE) as i32
}

fn orientation(flip: i32) -> u16 {
    let index = usize::try_from(flip).ok().filter(|&f| f < ORIENTATION.len()).unwrap_or(0);
    (ORIENTATION[index] - b'0') as u16
}
