//! Parse session: the state shared by every parser of one identification
//! pass.
//!
//! A session exclusively owns its cursor, the metadata aggregate and the
//! directory list. Parsers receive `&mut Session` and save and restore the
//! cursor's byte order themselves at their boundaries.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::config::ParseOptions;
use crate::error::IoError;
use crate::io::{RangeReader, SourceCursor};
use crate::thumbnail::ThumbnailKind;

use super::metadata::{CameraMetadata, DirectoryRecord};

/// Boxed future used by the recursive parsers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Most directory records one session will create.
pub const MAX_DIRECTORIES: usize = 64;

/// Most nested containers (CIFF sub-heaps, PKTS blocks, maker notes) one
/// session will enter.
pub const MAX_NESTED_BLOCKS: u32 = 1024;

/// Mutable state of one identification pass.
pub struct Session<R> {
    /// Cursor over the byte source
    pub cursor: SourceCursor<R>,

    /// Metadata collected so far
    pub meta: CameraMetadata,

    /// Directory records in discovery order
    pub dirs: Vec<DirectoryRecord>,

    pub options: ParseOptions,

    /// Orientation set directly by a vendor parser (CIFF, Foveon, maker note)
    pub flip: Option<i32>,

    /// Orientation derived from the tagged directories
    pub tiff_flip: Option<i32>,

    /// Emission strategy for the selected thumbnail
    pub thumb_kind: ThumbnailKind,

    /// Nested containers entered so far
    blocks_entered: u32,
}

impl<R: RangeReader> Session<R> {
    /// Start a session at offset 0 of `reader`.
    pub fn new(reader: R, options: ParseOptions) -> Self {
        let cursor = SourceCursor::with_window_size(reader, options.window_size);
        let meta = CameraMetadata {
            is_raw: 1,
            ..Default::default()
        };

        Self {
            cursor,
            meta,
            dirs: Vec::new(),
            options,
            flip: None,
            tiff_flip: None,
            thumb_kind: ThumbnailKind::Jpeg,
            blocks_entered: 0,
        }
    }

    /// Charge one nested container against the session budget.
    ///
    /// Returns `false` once the budget is spent; the caller skips the
    /// container.
    pub fn enter_block(&mut self) -> bool {
        if self.blocks_entered >= MAX_NESTED_BLOCKS {
            debug!(
                budget = MAX_NESTED_BLOCKS,
                "Nested block budget exhausted, skipping block"
            );
            return false;
        }
        self.blocks_entered += 1;
        true
    }

    /// Create the record for a directory about to be scanned.
    ///
    /// Returns `None` once the directory budget is spent.
    pub fn open_directory(&mut self) -> Option<usize> {
        if self.dirs.len() >= MAX_DIRECTORIES {
            debug!(
                budget = MAX_DIRECTORIES,
                "Directory budget exhausted, skipping directory"
            );
            return None;
        }
        self.dirs.push(DirectoryRecord::default());
        Some(self.dirs.len() - 1)
    }

    /// Record at `index`, creating empty records up to it if needed.
    pub fn directory(&mut self, index: usize) -> &mut DirectoryRecord {
        if index >= self.dirs.len() {
            self.dirs.resize(index + 1, DirectoryRecord::default());
        }
        &mut self.dirs[index]
    }

    /// Read up to `N` bytes at the cursor into a zeroed buffer.
    pub async fn read_field<const N: usize>(&mut self) -> Result<[u8; N], IoError> {
        let mut buf = [0u8; N];
        self.cursor.read_into(&mut buf).await?;
        Ok(buf)
    }
}
