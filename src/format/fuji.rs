//! Fuji RAF directory block.
//!
//! A flat list of `tag:u16 length:u16 payload[length]` records, preceded by
//! a 32-bit record count. Only three tags matter here: raw dimensions,
//! sensor layout, and output dimensions.

use tracing::debug;

use crate::error::IoError;
use crate::io::RangeReader;
use crate::raw::Session;

/// Most records accepted in one block.
pub const MAX_FUJI_ENTRIES: u32 = 255;

const RAW_DIMENSIONS: u16 = 0x100;
const OUTPUT_DIMENSIONS: u16 = 0x121;
const LAYOUT: u16 = 0x130;

/// Output width reported by some bodies three pixels short.
const SHORT_WIDTH: u32 = 4284;

/// Parse the directory block at `offset`.
pub async fn parse_fuji<R: RangeReader>(session: &mut Session<R>, offset: u64) -> Result<(), IoError> {
    debug!(offset, "Parsing Fuji directory block");
    session.cursor.seek(offset);
    let entries = session.cursor.get4().await?;
    if entries > MAX_FUJI_ENTRIES {
        debug!(entries, offset, "Fuji directory entry count over limit, skipping");
        return Ok(());
    }

    for _ in 0..entries {
        let tag = session.cursor.get2().await?;
        let len = session.cursor.get2().await? as u64;
        let save = session.cursor.position();

        match tag {
            RAW_DIMENSIONS => {
                session.meta.raw_height = session.cursor.get2().await? as u32;
                session.meta.raw_width = session.cursor.get2().await? as u32;
            }
            LAYOUT => {
                let layout = session.cursor.read_u8_or_fill().await?;
                let flags = session.cursor.read_u8_or_fill().await?;
                session.meta.fuji_layout = (layout >> 7) as u32;
                session.meta.fuji_width = if flags & 8 == 0 { 1 } else { 0 };
            }
            OUTPUT_DIMENSIONS => {
                session.meta.height = session.cursor.get2().await? as u32;
                let mut width = session.cursor.get2().await? as u32;
                if width == SHORT_WIDTH {
                    width += 3;
                }
                session.meta.width = width;
            }
            _ => {}
        }

        session.cursor.seek(save + len);
    }

    session.meta.height <<= session.meta.fuji_layout;
    session.meta.width >>= session.meta.fuji_layout;
    Ok(())
}
