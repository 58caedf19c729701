//! Seekable cursor over a [`RangeReader`].
//!
//! The container parsers are written against a stream model: a current
//! position, a current byte order, and 2/4-byte primitive reads that advance
//! the position. `SourceCursor` provides that model on top of positional
//! range reads.
//!
//! # Short reads
//!
//! Reads never fail because the source ends early. A read that starts at or
//! past the end returns no bytes; a read that straddles the end returns the
//! bytes that exist. For the primitive integer reads, missing bytes keep the
//! fill value `0xFF`, so a truncated count or offset decodes as a very large
//! number and is rejected by the parsers' caps. Only a failure of the backing
//! store itself surfaces as an [`IoError`].
//!
//! # Read-ahead window
//!
//! A parse issues thousands of tiny reads at scattered offsets. The cursor
//! keeps one window of bytes (64 KiB by default) and serves reads that fall
//! inside it locally; a miss refills the window starting at the requested
//! position.

use bytes::Bytes;

use super::RangeReader;
use crate::error::IoError;
use crate::format::tiff::ByteOrder;

/// Default read-ahead window: 64KB
pub const DEFAULT_WINDOW_SIZE: usize = 64 * 1024;

/// Value of bytes a short primitive read could not obtain.
const SHORT_READ_FILL: u8 = 0xFF;

/// A positioned, byte-order-aware view of a byte source.
pub struct SourceCursor<R> {
    reader: R,
    size: u64,
    position: u64,
    byte_order: ByteOrder,
    window: Bytes,
    window_start: u64,
    window_size: usize,
}

impl<R: RangeReader> SourceCursor<R> {
    /// Create a cursor at offset 0 with the default window size.
    pub fn new(reader: R) -> Self {
        Self::with_window_size(reader, DEFAULT_WINDOW_SIZE)
    }

    /// Create a cursor at offset 0 with a custom read-ahead window.
    pub fn with_window_size(reader: R, window_size: usize) -> Self {
        let size = reader.size();
        Self {
            reader,
            size,
            position: 0,
            byte_order: ByteOrder::BigEndian,
            window: Bytes::new(),
            window_start: 0,
            window_size: window_size.max(1),
        }
    }

    /// The underlying reader.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Total size of the source in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current absolute position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move to an absolute position. Positions past the end are allowed.
    #[inline]
    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    /// Move to an absolute position computed with signed arithmetic.
    ///
    /// Negative positions clamp to 0.
    #[inline]
    pub fn seek_signed(&mut self, position: i64) {
        self.position = u64::try_from(position).unwrap_or(0);
    }

    /// Move relative to the current position, clamping at 0.
    #[inline]
    pub fn skip(&mut self, delta: i64) {
        self.position = if delta < 0 {
            self.position.saturating_sub(delta.unsigned_abs())
        } else {
            self.position.saturating_add(delta as u64)
        };
    }

    /// Byte order used by [`get2`](Self::get2) and [`get4`](Self::get4).
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    #[inline]
    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    /// Bytes remaining between the current position and the end.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.position)
    }

    fn window_contains(&self, offset: u64, len: usize) -> bool {
        offset >= self.window_start
            && offset + len as u64 <= self.window_start + self.window.len() as u64
    }

    /// Read up to `len` bytes and advance past them.
    ///
    /// Returns fewer bytes (possibly none) when the source ends first.
    pub async fn read_bytes(&mut self, len: usize) -> Result<Bytes, IoError> {
        if len == 0 || self.position >= self.size {
            return Ok(Bytes::new());
        }

        let available = self.remaining().min(len as u64) as usize;

        let bytes = if self.window_contains(self.position, available) {
            let start = (self.position - self.window_start) as usize;
            self.window.slice(start..start + available)
        } else if available >= self.window_size {
            self.reader.read_exact_at(self.position, available).await?
        } else {
            let fill = self.remaining().min(self.window_size as u64) as usize;
            self.window = self.reader.read_exact_at(self.position, fill).await?;
            self.window_start = self.position;
            self.window.slice(0..available)
        };

        self.position += available as u64;
        Ok(bytes)
    }

    /// Fill as much of `buf` as the source allows; returns the byte count.
    ///
    /// Bytes of `buf` beyond the returned count are left untouched.
    pub async fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let bytes = self.read_bytes(buf.len()).await?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Read one byte, or `None` at the end of the source.
    pub async fn read_u8(&mut self) -> Result<Option<u8>, IoError> {
        let bytes = self.read_bytes(1).await?;
        Ok(bytes.first().copied())
    }

    /// Read one byte, substituting the short-read fill value at the end.
    pub async fn read_u8_or_fill(&mut self) -> Result<u8, IoError> {
        Ok(self.read_u8().await?.unwrap_or(SHORT_READ_FILL))
    }

    /// Read a 16-bit integer in the current byte order.
    pub async fn get2(&mut self) -> Result<u16, IoError> {
        let mut raw = [SHORT_READ_FILL; 2];
        self.read_into(&mut raw).await?;
        Ok(self.byte_order.read_u16(&raw))
    }

    /// Read a 32-bit integer in the current byte order.
    pub async fn get4(&mut self) -> Result<u32, IoError> {
        let mut raw = [SHORT_READ_FILL; 4];
        self.read_into(&mut raw).await?;
        Ok(self.byte_order.read_u32(&raw))
    }

    /// Read 8 raw bytes, fill-padded when short.
    pub async fn get8_raw(&mut self) -> Result<[u8; 8], IoError> {
        let mut raw = [SHORT_READ_FILL; 8];
        self.read_into(&mut raw).await?;
        Ok(raw)
    }
}
