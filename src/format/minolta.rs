//! Minolta MRW container.
//!
//! ```text
//! 0   "\0MRM"           the last byte's value doubles as the byte-order marker
//! 4   length:u32        blocks end at base + length + 8
//! 8   blocks of  tag[4]  length:u32  payload[length]
//! ```
//!
//! `PRD` carries the raw dimensions, `TTW` a complete TIFF. Raw data starts
//! right after the last block.

use tracing::debug;

use crate::error::IoError;
use crate::format::tiff::{parse_tiff, ByteOrder};
use crate::io::RangeReader;
use crate::raw::Session;

/// "\0PRD"
const PRD: u32 = 0x505244;

/// "\0TTW"
const TTW: u32 = 0x545457;

/// Parse the container at `base`.
///
/// Returns without changes when the signature does not match. The caller's
/// byte order is restored on return.
pub async fn parse_minolta<R: RangeReader>(session: &mut Session<R>, base: u64) -> Result<(), IoError> {
    debug!(base, "Parsing MRW blocks");
    let saved = session.cursor.byte_order();
    let result = walk_blocks(session, base).await;
    session.cursor.set_byte_order(saved);
    result
}

async fn walk_blocks<R: RangeReader>(session: &mut Session<R>, base: u64) -> Result<(), IoError> {
    session.cursor.seek(base);
    let signature: [u8; 4] = session.read_field().await?;
    if signature[..3] != *b"\0MR" {
        return Ok(());
    }
    session
        .cursor
        .set_byte_order(ByteOrder::from_marker(signature[3] as u16 * 0x101));

    let end = base + session.cursor.get4().await? as u64 + 8;
    let mut high = 0;
    let mut wide = 0;

    loop {
        let save = session.cursor.position();
        if save >= end {
            break;
        }

        let tag = u32::from_be_bytes(session.read_field().await?);
        let len = session.cursor.get4().await? as u64;

        match tag {
            PRD => {
                session.cursor.skip(8);
                high = session.cursor.get2().await? as u32;
                wide = session.cursor.get2().await? as u32;
            }
            TTW => {
                let offset = session.cursor.position();
                parse_tiff(session, offset).await?;
                session.meta.data_offset = end;
            }
            _ => {}
        }

        session.cursor.seek(save + len + 8);
    }

    session.meta.raw_height = high;
    session.meta.raw_width = wide;
    Ok(())
}
