use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

use super::RangeReader;
use crate::error::IoError;

/// Local-file implementation of RangeReader.
///
/// The file size is taken once on open. Reads are positional: each call
/// seeks the shared handle under a lock, so concurrent callers never
/// observe each other's positions.
pub struct FileRangeReader {
    file: Mutex<File>,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Open `path` for reading.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();

        Ok(Self {
            file: Mutex::new(file),
            size,
            identifier: path.display().to_string(),
        })
    }
}

#[async_trait]
impl RangeReader for FileRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let in_bounds = offset
            .checked_add(len as u64)
            .is_some_and(|end| end <= self.size);
        if !in_bounds {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }

        let mut buf = vec![0u8; len];
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.read_exact(&mut buf).await?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
