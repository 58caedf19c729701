//! Test utilities for integration tests.
//!
//! This module provides a request-tracking reader, JPEG helpers built on the
//! `image` crate, and builders for synthetic raw containers.

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rawpeek::error::IoError;
use rawpeek::io::RangeReader;

// =============================================================================
// Mock Range Reader with Request Tracking
// =============================================================================

/// A range reader over owned bytes that counts read requests.
pub struct TrackingMockReader {
    data: Bytes,
    identifier: String,
    request_count: Arc<AtomicUsize>,
}

impl TrackingMockReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RangeReader for TrackingMockReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// A reader whose backing store always fails.
pub struct FailingReader {
    pub size: u64,
}

#[async_trait]
impl RangeReader for FailingReader {
    async fn read_exact_at(&self, _offset: u64, _len: usize) -> Result<Bytes, IoError> {
        Err(IoError::Read("connection reset".to_string()))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        "failing"
    }
}

// =============================================================================
// Test JPEG Creation
// =============================================================================

/// Create a test RGB JPEG image.
pub fn create_test_rgb_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let r = (x % 256) as u8;
        let g = (y % 256) as u8;
        let b = ((x + y) % 256) as u8;
        Rgb([r, g, b])
    });

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&img).unwrap();
    buf
}

/// Insert an Exif APP1 segment carrying `tiff` right after the SOI.
///
/// The TIFF header lands at offset 12 of the result.
pub fn with_exif_segment(jpeg: &[u8], tiff: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Check if data is a decodable JPEG; returns its dimensions.
pub fn decode_jpeg(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .expect("emitted thumbnail should decode as JPEG");
    (img.width(), img.height())
}

pub fn be16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

pub fn be32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

// =============================================================================
// TIFF File Builder
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Value of one directory entry.
#[derive(Clone)]
pub enum Value {
    Short(u16),
    Shorts(Vec<u16>),
    Long(u32),
    Ascii(String),
    Rational(u32, u32),
    /// LONG holding the offset of another directory of the builder
    Ifd(usize),
    /// LONG array holding the offsets of several directories
    Ifds(Vec<usize>),
    /// LONG holding the offset of a blob
    BlobOffset(usize),
    /// LONG holding the length of a blob
    BlobLength(usize),
}

/// Builder for TIFF files with chained and nested directories.
///
/// Directories are numbered in the order they are added. Only the ones
/// listed in the chain are linked from the header; the rest are reachable
/// through [`Value::Ifd`] entries.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    ifds: Vec<Vec<(u16, Value)>>,
    chain: Vec<usize>,
    blobs: Vec<Vec<u8>>,
}

impl TiffBuilder {
    pub fn new(byte_order: ByteOrderType) -> Self {
        Self {
            byte_order,
            ifds: Vec::new(),
            chain: Vec::new(),
            blobs: Vec::new(),
        }
    }

    /// Add a directory to the header's chain; returns its index.
    pub fn chained(&mut self, entries: Vec<(u16, Value)>) -> usize {
        let index = self.nested(entries);
        self.chain.push(index);
        index
    }

    /// Add a directory reachable only through pointers; returns its index.
    pub fn nested(&mut self, entries: Vec<(u16, Value)>) -> usize {
        self.ifds.push(entries);
        self.ifds.len() - 1
    }

    /// Add a data blob placed after all directories; returns its index.
    pub fn blob(&mut self, data: Vec<u8>) -> usize {
        self.blobs.push(data);
        self.blobs.len() - 1
    }

    pub fn build(&self) -> Vec<u8> {
        // Directories first, then out-of-line values, then blobs
        let mut ifd_offsets = Vec::new();
        let mut at = 8usize;
        for entries in &self.ifds {
            ifd_offsets.push(at);
            at += 2 + entries.len() * 12 + 4;
        }

        let mut extra = Vec::new();
        let extra_at = at;
        let mut encoded = Vec::new();
        for entries in &self.ifds {
            let mut dir = Vec::new();
            for (tag, value) in entries {
                let (ty, count, bytes) = self.encode(value, &ifd_offsets);
                let slot = if bytes.len() <= 4 {
                    let mut slot = bytes.clone();
                    slot.resize(4, 0);
                    slot
                } else {
                    let offset = (extra_at + extra.len()) as u32;
                    extra.extend_from_slice(&bytes);
                    if extra.len() % 2 == 1 {
                        extra.push(0);
                    }
                    self.u32_bytes(offset)
                };
                dir.push((*tag, ty, count, slot));
            }
            encoded.push(dir);
        }

        let blobs_at = extra_at + extra.len();
        let mut blob_offsets = Vec::new();
        let mut blob_at = blobs_at;
        for blob in &self.blobs {
            blob_offsets.push(blob_at);
            blob_at += blob.len();
        }

        let mut data = match self.byte_order {
            ByteOrderType::LittleEndian => b"II".to_vec(),
            ByteOrderType::BigEndian => b"MM".to_vec(),
        };
        data.extend(self.u16_bytes(42));
        let first = self.chain.first().map(|&i| ifd_offsets[i]).unwrap_or(0);
        data.extend(self.u32_bytes(first as u32));

        for (index, dir) in encoded.into_iter().enumerate() {
            data.extend(self.u16_bytes(dir.len() as u16));
            for (tag, ty, count, mut slot) in dir {
                if let Some(blob) = self.blob_ref(&self.ifds[index], tag) {
                    slot = match blob {
                        BlobRef::Offset(b) => self.u32_bytes(blob_offsets[b] as u32),
                        BlobRef::Length(b) => self.u32_bytes(self.blobs[b].len() as u32),
                    };
                }
                data.extend(self.u16_bytes(tag));
                data.extend(self.u16_bytes(ty));
                data.extend(self.u32_bytes(count));
                data.extend(slot);
            }
            let next = self
                .chain
                .iter()
                .position(|&i| i == index)
                .and_then(|pos| self.chain.get(pos + 1))
                .map(|&i| ifd_offsets[i])
                .unwrap_or(0);
            data.extend(self.u32_bytes(next as u32));
        }

        data.extend(extra);
        for blob in &self.blobs {
            data.extend_from_slice(blob);
        }
        data
    }

    fn blob_ref(&self, entries: &[(u16, Value)], tag: u16) -> Option<BlobRef> {
        entries.iter().find(|(t, _)| *t == tag).and_then(|(_, v)| match v {
            Value::BlobOffset(b) => Some(BlobRef::Offset(*b)),
            Value::BlobLength(b) => Some(BlobRef::Length(*b)),
            _ => None,
        })
    }

    /// (type, count, value bytes) of an entry.
    fn encode(&self, value: &Value, ifd_offsets: &[usize]) -> (u16, u32, Vec<u8>) {
        match value {
            Value::Short(v) => (3, 1, self.u16_bytes(*v)),
            Value::Shorts(vs) => (
                3,
                vs.len() as u32,
                vs.iter().flat_map(|&v| self.u16_bytes(v)).collect(),
            ),
            Value::Long(v) => (4, 1, self.u32_bytes(*v)),
            Value::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                (2, bytes.len() as u32, bytes)
            }
            Value::Rational(n, d) => {
                let mut bytes = self.u32_bytes(*n);
                bytes.extend(self.u32_bytes(*d));
                (5, 1, bytes)
            }
            Value::Ifd(i) => (4, 1, self.u32_bytes(ifd_offsets[*i] as u32)),
            Value::Ifds(is) => (
                4,
                is.len() as u32,
                is.iter()
                    .flat_map(|&i| self.u32_bytes(ifd_offsets[i] as u32))
                    .collect(),
            ),
            // Patched once blob offsets are known
            Value::BlobOffset(_) | Value::BlobLength(_) => (4, 1, vec![0; 4]),
        }
    }

    fn u16_bytes(&self, value: u16) -> Vec<u8> {
        match self.byte_order {
            ByteOrderType::LittleEndian => value.to_le_bytes().to_vec(),
            ByteOrderType::BigEndian => value.to_be_bytes().to_vec(),
        }
    }

    fn u32_bytes(&self, value: u32) -> Vec<u8> {
        match self.byte_order {
            ByteOrderType::LittleEndian => value.to_le_bytes().to_vec(),
            ByteOrderType::BigEndian => value.to_be_bytes().to_vec(),
        }
    }
}

enum BlobRef {
    Offset(usize),
    Length(usize),
}

/// Shorthand for an ASCII value.
pub fn ascii(s: &str) -> Value {
    Value::Ascii(s.to_string())
}

// =============================================================================
// Synthetic Raw Files
// =============================================================================

/// Dimensions of the preview embedded by [`create_cr2_like`].
pub const PREVIEW_SIZE: (u32, u32) = (64, 48);

/// Dimensions of the raw image described by [`create_cr2_like`].
pub const RAW_SIZE: (u32, u32) = (256, 192);

/// Little-endian, CR2-shaped file.
///
/// IFD0 holds the camera strings and an RGB JPEG preview, with an EXIF
/// sub-directory; IFD1 describes an uncompressed 12-bit raw image.
pub fn create_cr2_like() -> Vec<u8> {
    let mut b = TiffBuilder::new(ByteOrderType::LittleEndian);
    let jpeg = b.blob(create_test_rgb_jpeg(PREVIEW_SIZE.0, PREVIEW_SIZE.1, 85));
    let raw = b.blob(vec![0u8; 512]);

    let exif = b.nested(vec![
        (33434, Value::Rational(1, 250)),
        (33437, Value::Rational(56, 10)),
        (34855, Value::Short(400)),
        (36867, ascii("2009:07:14 18:30:05")),
        (37386, Value::Rational(50, 1)),
    ]);
    b.chained(vec![
        (256, Value::Short(PREVIEW_SIZE.0 as u16)),
        (257, Value::Short(PREVIEW_SIZE.1 as u16)),
        (258, Value::Shorts(vec![8, 8, 8])),
        (259, Value::Short(6)),
        (271, ascii("Canon")),
        (272, ascii("Canon EOS 5D Mark II")),
        (273, Value::BlobOffset(jpeg)),
        (274, Value::Short(6)),
        (279, Value::BlobLength(jpeg)),
        (315, ascii("Jane Doe")),
        (34665, Value::Ifd(exif)),
    ]);
    b.chained(vec![
        (256, Value::Short(RAW_SIZE.0 as u16)),
        (257, Value::Short(RAW_SIZE.1 as u16)),
        (258, Value::Short(12)),
        (259, Value::Short(1)),
        (273, Value::BlobOffset(raw)),
        (277, Value::Short(1)),
        (279, Value::BlobLength(raw)),
    ]);
    b.build()
}

/// Big-endian, NEF-shaped file.
///
/// IFD0 is an uncompressed RGB thumbnail with two SubIFDs: a JPEG preview
/// (when `with_preview`) and the raw image.
pub fn create_nef_like(with_preview: bool) -> Vec<u8> {
    let mut b = TiffBuilder::new(ByteOrderType::BigEndian);
    let thumb = b.blob(vec![0x80; 160 * 120 * 3]);

    let mut subs = Vec::new();
    if with_preview {
        let jpeg = b.blob(create_test_rgb_jpeg(320, 240, 80));
        subs.push(b.nested(vec![
            (256, Value::Short(320)),
            (257, Value::Short(240)),
            (258, Value::Shorts(vec![8, 8, 8])),
            (259, Value::Short(6)),
            (273, Value::BlobOffset(jpeg)),
            (279, Value::BlobLength(jpeg)),
        ]));
    }
    subs.push(b.nested(vec![
        (256, Value::Long(4288)),
        (257, Value::Long(2848)),
        (258, Value::Short(14)),
        (259, Value::Short(34713)),
        (273, Value::Long(0x10000)),
        (277, Value::Short(1)),
    ]));

    b.chained(vec![
        (256, Value::Short(160)),
        (257, Value::Short(120)),
        (258, Value::Shorts(vec![8, 8, 8])),
        (259, Value::Short(1)),
        (271, ascii("NIKON CORPORATION")),
        (272, ascii("NIKON D3")),
        (273, Value::BlobOffset(thumb)),
        (277, Value::Short(3)),
        (279, Value::BlobLength(thumb)),
        (330, Value::Ifds(subs)),
    ]);
    b.build()
}

/// Minimal tagged directory carrying a make and a model.
pub fn create_name_tiff(order: ByteOrderType, make: &str, model: &str) -> Vec<u8> {
    let mut b = TiffBuilder::new(order);
    b.chained(vec![(271, ascii(make)), (272, ascii(model))]);
    b.build()
}
