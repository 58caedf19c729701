//! JPEG stream handling.
//!
//! Two jobs live here:
//!
//! - **Header probing**: walk the marker segments of a (lossless or baseline)
//!   JPEG far enough to learn its geometry, without decoding anything. Used
//!   to size embedded previews and to recognize lossless-JPEG raw strips.
//! - **Segment scanning**: the fallback for files no signature matched. Each
//!   segment before the scan data is checked for an embedded CIFF heap or a
//!   tagged directory.
//!
//! # Segment Layout
//! ```text
//! FF xx        marker
//! LL LL        big-endian length, including these two bytes
//! ...          LL LL - 2 bytes of payload
//! ```

use tracing::debug;

use crate::error::IoError;
use crate::io::{read_u16_be, RangeReader, SourceCursor};
use crate::raw::{apply_tiff, Session};

use super::ciff::parse_ciff;
use super::tiff::{parse_tiff, ByteOrder};

// =============================================================================
// JPEG Markers
// =============================================================================

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// Start Of Frame (baseline DCT)
pub const SOF0: u16 = 0xFFC0;

/// Start Of Frame (extended sequential DCT)
pub const SOF1: u16 = 0xFFC1;

/// Start Of Frame (lossless)
pub const SOF3: u16 = 0xFFC3;

/// Start Of Scan
pub const SOS: u16 = 0xFFDA;

/// Define Quantization Table
pub const DQT: u16 = 0xFFDB;

/// Define Restart Interval
pub const DRI: u16 = 0xFFDD;

/// Application segment 1 (Exif)
pub const APP1: [u8; 2] = [0xFF, 0xE1];

/// Markers at or below this value are not valid segment markers.
const MIN_MARKER: u16 = 0xFF00;

/// Most segments the fallback scanner will visit.
pub const MAX_JPEG_SEGMENTS: usize = 1024;

/// "HEAP", the start of an embedded CIFF heap signature
const HEAP_SIGNATURE: u32 = 0x48454150;

// =============================================================================
// Header Probing
// =============================================================================

/// Geometry learned from the frame and scan headers of a JPEG stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JpegHeader {
    /// Low byte of the start-of-frame marker (0xC0, 0xC1 or 0xC3)
    pub algo: u8,
    /// Sample precision, reduced by the point transform of the scan
    pub bits: i32,
    pub high: u32,
    pub wide: u32,
    /// Component count, including the sRAW correction
    pub clrs: u32,
    /// Canon sRAW subsampling correction
    pub sraw: u32,
    /// Predictor selection of the first scan
    pub psv: u8,
    pub restart: u32,
    /// First quantization table entry
    pub quant0: u16,
}

/// Probe the JPEG stream at the cursor.
///
/// Scans segments until the start-of-scan marker. Returns `None` when the
/// stream does not start with SOI, runs out of bytes, or hits a marker
/// below `0xFF01`.
///
/// # Arguments
/// * `cursor` - Positioned at the first byte of the stream
/// * `dng` - Whether the file is a DNG; its lossless frames may carry one
///   byte of padding after a 9-byte frame header
pub async fn probe_header<R: RangeReader>(
    cursor: &mut SourceCursor<R>,
    dng: bool,
) -> Result<Option<JpegHeader>, IoError> {
    let soi = cursor.read_bytes(2).await?;
    if soi[..] != SOI {
        return Ok(None);
    }

    let mut header = JpegHeader {
        restart: u32::MAX,
        ..Default::default()
    };

    loop {
        let mut marker = [0u8; 4];
        if cursor.read_into(&mut marker).await? == 0 {
            return Ok(None);
        }

        let tag = read_u16_be(&marker[0..2]);
        let len = read_u16_be(&marker[2..4]).wrapping_sub(2);
        if tag <= MIN_MARKER {
            return Ok(None);
        }

        let data = cursor.read_bytes(len as usize).await?;
        let at = |i: usize| data.get(i).copied().unwrap_or(0);

        match tag {
            SOF3 | SOF1 | SOF0 => {
                if tag == SOF3 {
                    let d7 = at(7) as i32;
                    header.sraw = (((d7 >> 4) * (d7 & 15) - 1) & 3) as u32;
                }
                header.algo = (tag & 0xFF) as u8;
                header.bits = at(0) as i32;
                header.high = (at(1) as u32) << 8 | at(2) as u32;
                header.wide = (at(3) as u32) << 8 | at(4) as u32;
                header.clrs = at(5) as u32 + header.sraw;
                if len == 9 && dng {
                    cursor.skip(1);
                }
            }
            SOS => {
                let first = at(0) as usize;
                header.psv = at(1 + first * 2);
                header.bits -= (at(3 + first * 2) & 15) as i32;
            }
            DQT => {
                header.quant0 = (at(1) as u16) << 8 | at(2) as u16;
            }
            DRI => {
                header.restart = (at(0) as u32) << 8 | at(1) as u32;
            }
            _ => {}
        }

        if tag == SOS {
            return Ok(Some(header));
        }
    }
}

/// Whether thumbnail bytes already carry an Exif APP1 payload at offset 6.
#[inline]
pub fn has_exif_header(data: &[u8]) -> bool {
    data.get(6..10) == Some(b"Exif".as_slice())
}

// =============================================================================
// Segment Scanning
// =============================================================================

/// Scan the JPEG segments at `offset` for embedded containers.
///
/// For every segment before the scan data: a frame header sets the raw
/// dimensions, an embedded CIFF heap is parsed, and a tagged directory 6
/// bytes into the payload is parsed and run through candidate selection.
///
/// Returns `false` when there is no SOI at `offset`.
pub async fn parse_jpeg<R: RangeReader>(
    session: &mut Session<R>,
    offset: u64,
) -> Result<bool, IoError> {
    debug!(offset, "Scanning JPEG segments");
    session.cursor.seek(offset);
    if session.cursor.read_bytes(2).await?[..] != SOI {
        return Ok(false);
    }

    for _ in 0..MAX_JPEG_SEGMENTS {
        if session.cursor.read_u8().await? != Some(0xFF) {
            return Ok(true);
        }
        let mark = session.cursor.read_u8_or_fill().await?;
        if mark as u16 | 0xFF00 == SOS {
            return Ok(true);
        }

        session.cursor.set_byte_order(ByteOrder::BigEndian);
        let len = session.cursor.get2().await? as i64 - 2;
        let save = session.cursor.position();

        if mark == 0xC0 || mark == 0xC3 {
            session.cursor.skip(1);
            session.meta.raw_height = session.cursor.get2().await? as u32;
            session.meta.raw_width = session.cursor.get2().await? as u32;
        }

        let marker = session.cursor.get2().await?;
        session.cursor.set_byte_order(ByteOrder::from_marker(marker));
        let hlen = session.cursor.get4().await? as u64;
        if session.cursor.get4().await? == HEAP_SIGNATURE {
            parse_ciff(session, save + hlen, len - hlen as i64, 0).await?;
        }

        if parse_tiff(session, save + 6).await? {
            apply_tiff(session).await?;
        }

        session.cursor.seek_signed(save as i64 + len);
    }

    debug!(
        budget = MAX_JPEG_SEGMENTS,
        "JPEG segment budget exhausted"
    );
    Ok(true)
}

// =============================================================================
// Tests
// =============================================================================
