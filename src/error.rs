use thiserror::Error;

/// I/O errors that can occur when reading from the byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// The backing store failed to deliver bytes
    #[error("Read error: {0}")]
    Read(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Source not found
    #[error("Source not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            IoError::NotFound(err.to_string())
        } else {
            IoError::Read(err.to_string())
        }
    }
}

/// Errors surfaced to the host by an identification or extraction pass.
///
/// Malformed input never produces an error: the parsers degrade to a
/// best-effort metadata record instead. Only failures of the byte source
/// itself and oversized allocations are reported.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// I/O error while reading the source
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The selected thumbnail is larger than the configured allocation limit
    #[error("Thumbnail too large: {length} bytes exceeds the limit of {limit} bytes")]
    ThumbnailTooLarge { length: u64, limit: u64 },
}
