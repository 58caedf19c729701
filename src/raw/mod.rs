//! Camera raw identification.
//!
//! [`RawFile`] is the public entry point. Each call to
//! [`identify`](RawFile::identify) runs a full pass over the source from
//! offset 0 with a fresh [`Session`]; nothing is cached between calls.
//!
//! # Example
//!
//! ```ignore
//! use rawpeek::{FileRangeReader, RawFile, ThumbnailOutcome};
//!
//! let reader = FileRangeReader::open("IMG_0001.CR2").await?;
//! let raw = RawFile::new(reader);
//!
//! let id = raw.identify().await?;
//! println!("{} {}", id.metadata.make, id.metadata.model);
//!
//! if let ThumbnailOutcome::Jpeg(bytes) = raw.thumbnail().await? {
//!     tokio::fs::write("thumb.jpg", bytes).await?;
//! }
//! ```

mod identify;
mod metadata;
mod normalize;
mod select;
mod session;

use serde::Serialize;

use crate::config::ParseOptions;
use crate::error::ExtractError;
use crate::format::SourceFormat;
use crate::io::RangeReader;
use crate::thumbnail::{emit_thumbnail, ThumbnailKind, ThumbnailOutcome};

pub use identify::identify;
pub use metadata::{
    starts_with_ignore_case, CameraMetadata, DirectoryRecord, TextField, DESCRIPTION_CAPACITY,
    NAME_CAPACITY,
};
pub use normalize::{canonicalize_make, normalize_flip, strip_make_from_model, CANONICAL_MAKES};
pub use select::{
    apply_tiff, latest_flip, select_raw, select_thumbnail, thumbnail_kind, RawChoice, ThumbnailBar,
};
pub use session::{BoxFuture, Session, MAX_DIRECTORIES, MAX_NESTED_BLOCKS};

/// Everything an identification pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    /// Container family detected from the file head
    pub format: SourceFormat,

    pub metadata: CameraMetadata,

    /// Tagged directories in discovery order
    pub directories: Vec<DirectoryRecord>,

    /// Encoding of the selected thumbnail
    pub thumbnail_kind: ThumbnailKind,
}

/// A camera raw file behind a byte source.
pub struct RawFile<R> {
    reader: R,
    options: ParseOptions,
}

impl<R: RangeReader> RawFile<R> {
    /// Wrap `reader` with default options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParseOptions::default())
    }

    pub fn with_options(reader: R, options: ParseOptions) -> Self {
        Self { reader, options }
    }

    /// The underlying byte source.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Run a full identification pass.
    pub async fn identify(&self) -> Result<Identification, ExtractError> {
        let mut session = self.session();
        let format = identify(&mut session).await?;

        Ok(Identification {
            format,
            metadata: session.meta,
            directories: session.dirs,
            thumbnail_kind: session.thumb_kind,
        })
    }

    /// Identify and return only the metadata.
    pub async fn metadata(&self) -> Result<CameraMetadata, ExtractError> {
        Ok(self.identify().await?.metadata)
    }

    /// Identify, then emit the selected thumbnail.
    pub async fn thumbnail(&self) -> Result<ThumbnailOutcome, ExtractError> {
        let mut session = self.session();
        identify(&mut session).await?;

        emit_thumbnail(
            &mut session.cursor,
            &session.meta,
            session.thumb_kind,
            self.options.max_thumbnail_bytes,
        )
        .await
    }

    fn session(&self) -> Session<&R> {
        Session::new(&self.reader, self.options.clone())
    }
}
