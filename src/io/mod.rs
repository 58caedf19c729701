mod cursor;
mod file_reader;
mod memory;
mod range_reader;

pub use cursor::{SourceCursor, DEFAULT_WINDOW_SIZE};
pub use file_reader::FileRangeReader;
pub use memory::MemoryReader;
pub use range_reader::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, RangeReader};
