//! Leaf/Mamiya "PKTS" block parsing.
//!
//! Leaf backs store metadata as a chain of named blocks:
//!
//! ```text
//! "PKTS"  u32  name[40]  size:u32  body[size]
//! ```
//!
//! Bodies may themselves hold block chains; each block entered is charged
//! to the session's nested block budget. Two names are understood:
//! `JPEG_preview_data` locates the embedded preview and
//! `ShootObj_back_type` selects the back's model name.

use tracing::debug;

use crate::error::IoError;
use crate::format::tiff::leading_int;
use crate::io::RangeReader;
use crate::raw::{BoxFuture, Session};

/// Block signature, "PKTS".
const BLOCK_MAGIC: u32 = 0x504b5453;

/// Deepest block nesting followed.
pub const MAX_MOS_DEPTH: u32 = 16;

/// Leaf back names indexed by `ShootObj_back_type`.
const BACK_MODELS: [&str; 39] = [
    "", "DCB2", "Volare", "Cantare", "CMost", "Valeo 6", "Valeo 11", "Valeo 22", "Valeo 11p",
    "Valeo 17", "", "Aptus 17", "Aptus 22", "Aptus 75", "Aptus 65", "Aptus 54S", "Aptus 65S",
    "Aptus 75S", "AFi 5", "AFi 6", "AFi 7", "AFi-II 7", "Aptus-II 7", "", "Aptus-II 6", "", "",
    "Aptus-II 10", "Aptus-II 5", "", "", "", "", "Aptus-II 10R", "Aptus-II 8", "", "Aptus-II 12",
    "", "AFi-II 12",
];

/// Model name for a back type, if it is in range.
pub fn back_model(back_type: i64) -> Option<&'static str> {
    usize::try_from(back_type)
        .ok()
        .and_then(|i| BACK_MODELS.get(i).copied())
}

/// Parse the block chain at `offset`.
pub fn parse_mos<'a, R: RangeReader + 'a>(
    session: &'a mut Session<R>,
    offset: u64,
    depth: u32,
) -> BoxFuture<'a, Result<(), IoError>> {
    Box::pin(async move {
        if depth > MAX_MOS_DEPTH {
            debug!(depth, "PKTS nesting over limit, skipping");
            return Ok(());
        }

        session.cursor.seek(offset);
        while session.cursor.get4().await? == BLOCK_MAGIC {
            if !session.enter_block() {
                break;
            }
            session.cursor.get4().await?;
            let name: [u8; 40] = session.read_field().await?;
            let size = session.cursor.get4().await? as u64;
            let body = session.cursor.position();
            let name = c_str(&name);

            if name == b"JPEG_preview_data" {
                session.meta.thumb_offset = body;
                session.meta.thumb_length = size;
            }
            if name == b"ShootObj_back_type" {
                let text: [u8; 10] = session.read_field().await?;
                if let Some(model) = leading_int(&text).and_then(back_model) {
                    session.meta.model.set(model.as_bytes());
                }
            }

            parse_mos(session, body, depth + 1).await?;
            session.cursor.seek(body + size);
        }

        Ok(())
    })
}

fn c_str(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}
