//! Candidate selection over the collected directory records.
//!
//! After the container parsers have run, every tagged directory they saw is
//! summarized in [`Session::dirs`]. This module decides which of them holds
//! the sensor data and which one is the best embedded preview.
//!
//! # Scoring
//!
//! - **Raw**: the largest area wins, skipping three-sample JPEG directories
//!   (full-size previews) and directories with a dimension of 65536 or more.
//! - **Thumbnail**: among directories with the highest sample count seen
//!   (capped at three), the largest `width * height / (bps² + 1)` wins. The
//!   divisor penalizes deep samples, so an 8-bit preview beats a 16-bit one
//!   of the same size. Ties keep the earlier directory.

use tracing::debug;

use crate::error::IoError;
use crate::format::jpeg::probe_header;
use crate::io::RangeReader;
use crate::thumbnail::ThumbnailKind;

use super::metadata::{starts_with_ignore_case, DirectoryRecord};
use super::session::Session;

/// Compression code of lossy JPEG in a DNG container; never a thumbnail.
const LOSSY_DNG: u32 = 34892;

/// Directories at or past this size in either dimension are ignored.
const MAX_DIMENSION: u32 = 0x10000;

/// Highest sample count tracked for thumbnail eligibility.
const MAX_TRACKED_SAMPLES: u32 = 3;

/// Bit depth assumed for a thumbnail until something better is known.
const DEFAULT_THUMB_BITS: u32 = 16;

// =============================================================================
// Pure selection helpers
// =============================================================================

/// Outcome of the raw directory scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChoice {
    /// Index of the winning directory, if any beat the starting area
    pub index: Option<usize>,

    /// Highest sample count seen, capped at three
    pub max_samples: u32,
}

/// Pick the raw image directory.
///
/// # Arguments
/// * `dirs` - Directory records in discovery order
/// * `area` - Area already known from the format dispatch; a directory must
///   be strictly larger to win
pub fn select_raw(dirs: &[DirectoryRecord], mut area: u64) -> RawChoice {
    let mut choice = RawChoice {
        index: None,
        max_samples: 0,
    };

    for (i, dir) in dirs.iter().enumerate() {
        choice.max_samples = choice.max_samples.max(dir.samples).min(MAX_TRACKED_SAMPLES);

        let preview = dir.comp == 6 && dir.samples == 3;
        let in_range = (dir.width | dir.height) < MAX_DIMENSION;
        let dir_area = dir.width as u64 * dir.height as u64;
        if !preview && in_range && dir_area > area {
            area = dir_area;
            choice.index = Some(i);
        }
    }

    choice
}

/// Orientation of the latest directory that has a nonzero one.
pub fn latest_flip(dirs: &[DirectoryRecord]) -> Option<i32> {
    dirs.iter().rev().map(|dir| dir.flip).find(|&flip| flip != 0)
}

/// Current best thumbnail, used as the bar a directory must clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailBar {
    pub width: u32,
    pub height: u32,
    pub bits: u32,
}

impl ThumbnailBar {
    #[inline]
    fn score(width: u32, height: u32, bits: u32) -> u64 {
        width as u64 * height as u64 / (bits as u64 * bits as u64 + 1)
    }
}

/// Pick the thumbnail directory.
///
/// Returns the index of the last directory that raised the bar.
pub fn select_thumbnail(
    dirs: &[DirectoryRecord],
    raw: Option<usize>,
    max_samples: u32,
    mut bar: ThumbnailBar,
) -> Option<usize> {
    let mut best = None;

    for (i, dir) in dirs.iter().enumerate() {
        if Some(i) == raw || dir.samples != max_samples || dir.comp == LOSSY_DNG {
            continue;
        }

        let score = ThumbnailBar::score(dir.width, dir.height, dir.bps);
        if score > ThumbnailBar::score(bar.width, bar.height, bar.bits) {
            bar = ThumbnailBar {
                width: dir.width,
                height: dir.height,
                bits: dir.bps,
            };
            best = Some(i);
        }
    }

    best
}

/// Emission strategy implied by a thumbnail directory's compression.
///
/// Codes without a dedicated strategy keep `current`.
pub fn thumbnail_kind(dir: &DirectoryRecord, make: &[u8], current: ThumbnailKind) -> ThumbnailKind {
    match dir.comp {
        0 => ThumbnailKind::Layered,
        1 if dir.bps <= 8 => ThumbnailKind::Samples8,
        1 if starts_with_ignore_case(make, b"Imacon") => ThumbnailKind::Samples16,
        1 | 65000 => ThumbnailKind::Disabled,
        _ => current,
    }
}

// =============================================================================
// Session update
// =============================================================================

/// Run candidate selection over the session's directories.
///
/// Probes an already-known thumbnail for its real geometry, propagates
/// shutter speeds, then records the raw image layout, the orientation and
/// the thumbnail location in the session.
pub async fn apply_tiff<R: RangeReader>(session: &mut Session<R>) -> Result<(), IoError> {
    let meta = &mut session.meta;
    meta.thumb_misc = DEFAULT_THUMB_BITS;

    if meta.thumb_offset > 0 {
        session.cursor.seek(session.meta.thumb_offset);
        let dng = session.meta.dng_version > 0;
        if let Some(header) = probe_header(&mut session.cursor, dng).await? {
            let meta = &mut session.meta;
            meta.thumb_misc = header.bits.max(0) as u32;
            meta.thumb_width = header.wide;
            meta.thumb_height = header.high;
        }
    }

    // Shutter speeds flow from later directories to earlier ones
    let mut shutter = session.meta.shutter;
    for dir in session.dirs.iter_mut().rev() {
        if dir.shutter != 0.0 {
            shutter = dir.shutter;
        }
        dir.shutter = shutter;
    }
    session.meta.shutter = shutter;

    let area = session.meta.raw_width as u64 * session.meta.raw_height as u64;
    let raw = select_raw(&session.dirs, area);

    if let Some(i) = raw.index {
        let dir = &session.dirs[i];
        let meta = &mut session.meta;
        meta.raw_width = dir.width;
        meta.raw_height = dir.height;
        meta.bits_per_sample = dir.bps;
        meta.compression = dir.comp;
        meta.data_offset = dir.offset;
        meta.samples = dir.samples;
        meta.tile_width = dir.tile_width;
        meta.tile_length = dir.tile_length;
        session.tiff_flip = Some(dir.flip);
        debug!(
            index = i,
            width = dir.width,
            height = dir.height,
            compression = dir.comp,
            "Selected raw directory"
        );
    }

    if let Some(flip) = latest_flip(&session.dirs) {
        session.tiff_flip = Some(flip);
    }

    let bar = ThumbnailBar {
        width: session.meta.thumb_width,
        height: session.meta.thumb_height,
        bits: session.meta.thumb_misc,
    };
    if let Some(i) = select_thumbnail(&session.dirs, raw.index, raw.max_samples, bar) {
        let dir = &session.dirs[i];
        let meta = &mut session.meta;
        meta.thumb_width = dir.width;
        meta.thumb_height = dir.height;
        meta.thumb_offset = dir.offset;
        meta.thumb_length = dir.bytes;
        meta.thumb_misc = dir.bps | dir.samples << 5;
        session.thumb_kind = thumbnail_kind(dir, meta.make.as_bytes(), session.thumb_kind);
        debug!(
            index = i,
            width = dir.width,
            height = dir.height,
            kind = ?session.thumb_kind,
            "Selected thumbnail directory"
        );
    }

    Ok(())
}
