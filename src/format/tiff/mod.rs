//! Tagged-directory (TIFF) parsing shared by most raw formats.
//!
//! # Key Concepts
//!
//! - **Byte order**: a region declares its endianness with "II" (little) or
//!   "MM" (big). The order lives on the cursor and sub-parsers that switch
//!   it restore the caller's order on return.
//!
//! - **Entries**: 12 bytes each, `tag:u16 type:u16 count:u32 value:u32`.
//!   Values wider than 4 bytes are stored at `base + value`.
//!
//! - **Continuation point**: whatever a handler reads or seeks, the walker
//!   resumes at the entry following the current one.
//!
//! - **Directory records**: every scanned directory becomes a candidate for
//!   the raw image or the thumbnail, chosen after all parsing is done.

mod parser;
mod tags;
mod values;
mod walker;

pub use parser::{
    read_entry, ByteOrder, DirEntry, BYTE_ORDER_BIG_ENDIAN, BYTE_ORDER_LITTLE_ENDIAN, ENTRY_SIZE,
};
pub use tags::{compression, ExifTag, FieldType, TiffTag};
pub use values::{
    get_int, get_real, get_timestamp, leading_float, leading_int, parse_timestamp, unix_timestamp,
};
pub use walker::{parse_tiff, parse_tiff_ifd, MAX_IFD_ENTRIES};
