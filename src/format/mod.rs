//! Container parsers for camera raw files.
//!
//! # Format Detection
//!
//! Use [`detect::detect_format`] to identify the container family from the
//! first bytes of a file. Supported families:
//!
//! - **TIFF-based**: CR2, NEF, DNG, ARW, ORF, PEF, RW2 and friends
//! - **Canon CIFF**: CRW
//! - **Exif JPEG**: plain camera JPEGs
//! - **Fuji RAF**, **Minolta MRW**, **Sigma X3F**
//!
//! # Parsers
//!
//! Every parser takes the session of the running identification pass and
//! writes what it learns into the session's metadata. Malformed structures
//! are skipped, never reported.

pub mod ciff;
pub mod detect;
pub mod exif;
pub mod foveon;
pub mod fuji;
pub mod jpeg;
pub mod makernote;
pub mod minolta;
pub mod mos;
pub mod tiff;

pub use detect::{detect_format, is_tiff_header, SourceFormat, HEAD_SIZE};
pub use jpeg::{has_exif_header, probe_header, JpegHeader};
