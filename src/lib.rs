//! # rawpeek
//!
//! Identification, metadata extraction and JPEG preview extraction for
//! digital camera raw files.
//!
//! rawpeek reads only the container structure of a raw file: the tagged
//! directories, vendor records and embedded previews. Sensor data is never
//! decoded. All reads go through the [`RangeReader`] trait, so a file can be
//! inspected on local disk, in memory, or behind any other seekable store.
//!
//! ## Features
//!
//! - **Container families**: TIFF-based raws (CR2, NEF, ARW, DNG, PEF, ORF,
//!   RW2, ...), Canon CIFF (CRW), Fuji RAF, Minolta MRW, Sigma X3F, Leaf MOS
//!   and Exif JPEG
//! - **Metadata**: make, model, exposure, timestamp, orientation, raw
//!   geometry and data offsets
//! - **Thumbnails**: the best embedded JPEG preview, re-wrapped with an Exif
//!   header when it has none
//! - **Hostile input**: every count, depth and length read from the file is
//!   capped; malformed files yield partial metadata, never an error
//!
//! ## Architecture
//!
//! - [`io`] - Byte sources and the buffered, endian-aware cursor
//! - [`mod@format`] - Container detection and the per-family parsers
//! - [`raw`] - Parse session, metadata model, candidate selection
//! - [`thumbnail`] - Exif header synthesis and JPEG emission
//! - [`config`] - Parse options and the CLI
//!
//! ## Example
//!
//! ```rust,no_run
//! use rawpeek::{FileRangeReader, RawFile, ThumbnailOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = FileRangeReader::open("DSC_0001.NEF").await?;
//!     let raw = RawFile::new(reader);
//!
//!     let id = raw.identify().await?;
//!     println!("{} {} ({})", id.metadata.make, id.metadata.model, id.format.name());
//!
//!     if let ThumbnailOutcome::Jpeg(bytes) = raw.thumbnail().await? {
//!         std::fs::write("preview.jpg", &bytes)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod raw;
pub mod thumbnail;

// Re-export commonly used types
pub use config::{Cli, Command, InfoConfig, ParseOptions, ThumbnailConfig};
pub use error::{ExtractError, IoError};
pub use format::tiff::{ByteOrder, ExifTag, FieldType, TiffTag};
pub use format::{detect_format, is_tiff_header, JpegHeader, SourceFormat};
pub use io::{FileRangeReader, MemoryReader, RangeReader, SourceCursor};
pub use raw::{CameraMetadata, DirectoryRecord, Identification, RawFile, TextField};
pub use thumbnail::{ThumbnailKind, ThumbnailOutcome};
