//! Tests for TIFF-based raw containers.
//!
//! These tests verify:
//! - Raw and thumbnail directory selection on CR2- and NEF-shaped files
//! - Make canonicalization and model prefix handling
//! - Orientation and exposure extraction
//! - Directory budget and entry caps on hostile input
//! - Read batching through the source cursor

use super::test_utils::*;
use rawpeek::{MemoryReader, RawFile, SourceFormat, ThumbnailKind, ThumbnailOutcome};

fn open(data: Vec<u8>) -> RawFile<MemoryReader> {
    RawFile::new(MemoryReader::new(data, "test.raw"))
}

// =============================================================================
// CR2-shaped Files
// =============================================================================

#[tokio::test]
async fn test_cr2_like_selects_raw_and_preview() {
    let id = open(create_cr2_like()).identify().await.unwrap();

    assert_eq!(id.format, SourceFormat::Tiff { ciff: false });
    assert_eq!(id.directories.len(), 2);

    let meta = &id.metadata;
    assert_eq!(meta.raw_width, RAW_SIZE.0);
    assert_eq!(meta.raw_height, RAW_SIZE.1);
    assert_eq!(meta.bits_per_sample, 12);
    assert_eq!(meta.compression, 1);
    assert_eq!(meta.data_offset, id.directories[1].offset);

    assert_eq!(meta.thumb_width, PREVIEW_SIZE.0);
    assert_eq!(meta.thumb_height, PREVIEW_SIZE.1);
    assert_eq!(meta.thumb_offset, id.directories[0].offset);
    assert_eq!(meta.thumb_length, id.directories[0].bytes);
    assert_eq!(id.thumbnail_kind, ThumbnailKind::Jpeg);
}

#[tokio::test]
async fn test_cr2_like_names_and_orientation() {
    let meta = open(create_cr2_like()).metadata().await.unwrap();

    assert_eq!(meta.make.as_bytes(), b"Canon");
    assert_eq!(meta.model.as_bytes(), b"EOS 5D Mark II");
    assert_eq!(meta.artist.as_bytes(), b"Jane Doe");
    // Orientation 6 on the preview directory wins over the raw's zero
    assert_eq!(meta.flip, 6);
}

#[tokio::test]
async fn test_cr2_like_exposure() {
    let meta = open(create_cr2_like()).metadata().await.unwrap();

    assert!((meta.shutter - 0.004).abs() < 1e-9);
    assert!((meta.aperture - 5.6).abs() < 1e-9);
    assert!((meta.focal_len - 50.0).abs() < 1e-9);
    assert_eq!(meta.iso_speed, 400.0);

    let ts = meta.timestamp.expect("timestamp should be parsed");
    assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2009-07-14 18:30:05");
}

#[tokio::test]
async fn test_cr2_like_single_request() {
    let reader = TrackingMockReader::new(create_cr2_like(), "tracked.cr2");
    let raw = RawFile::new(reader);

    raw.identify().await.unwrap();

    // The whole file fits in the first window
    assert_eq!(raw.reader().request_count(), 1);
}

// =============================================================================
// NEF-shaped Files
// =============================================================================

#[tokio::test]
async fn test_nef_like_sub_directories() {
    let id = open(create_nef_like(true)).identify().await.unwrap();

    assert_eq!(id.directories.len(), 3);

    let meta = &id.metadata;
    assert_eq!(meta.make.as_bytes(), b"Nikon");
    // "NIKON " is stripped against the canonical "Nikon"
    assert_eq!(meta.model.as_bytes(), b"D3");

    assert_eq!(meta.raw_width, 4288);
    assert_eq!(meta.raw_height, 2848);
    assert_eq!(meta.bits_per_sample, 14);
    assert_eq!(meta.compression, 34713);
    assert_eq!(meta.data_offset, 0x10000);

    // The larger JPEG preview beats the uncompressed thumbnail
    assert_eq!(meta.thumb_width, 320);
    assert_eq!(meta.thumb_height, 240);
    assert_eq!(id.thumbnail_kind, ThumbnailKind::Jpeg);
}

#[tokio::test]
async fn test_nef_like_without_preview() {
    let raw = open(create_nef_like(false));
    let id = raw.identify().await.unwrap();

    assert_eq!(id.metadata.thumb_width, 160);
    assert_eq!(id.metadata.thumb_height, 120);
    assert_eq!(id.thumbnail_kind, ThumbnailKind::Samples8);

    let outcome = raw.thumbnail().await.unwrap();
    assert_eq!(outcome, ThumbnailOutcome::Unsupported(ThumbnailKind::Samples8));
}

#[tokio::test]
async fn test_big_and_little_endian_agree() {
    let le = create_name_tiff(ByteOrderType::LittleEndian, "PENTAX Corporation", "PENTAX K-5");
    let be = create_name_tiff(ByteOrderType::BigEndian, "PENTAX Corporation", "PENTAX K-5");

    let le = open(le).metadata().await.unwrap();
    let be = open(be).metadata().await.unwrap();

    assert_eq!(le.make.as_bytes(), b"Pentax");
    assert_eq!(le.make, be.make);
    assert_eq!(le.model, be.model);
}

// =============================================================================
// Hostile Input
// =============================================================================

/// One-entry directory whose next pointer refers back to itself.
fn create_self_cycle() -> Vec<u8> {
    let mut data = b"II*\0".to_vec();
    data.extend_from_slice(&8u32.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&256u16.to_le_bytes());
    data.extend_from_slice(&3u16.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&10u32.to_le_bytes());
    data.extend_from_slice(&8u32.to_le_bytes());
    data
}

#[tokio::test]
async fn test_cyclic_chain_hits_directory_budget() {
    let id = open(create_self_cycle()).identify().await.unwrap();

    assert_eq!(id.directories.len(), rawpeek::raw::MAX_DIRECTORIES);
    assert!(id.directories.iter().all(|dir| dir.width == 10));
}

#[tokio::test]
async fn test_oversized_entry_count_abandons_directory() {
    let mut data = b"MM\0\x2a\0\0\0\x08".to_vec();
    data.extend_from_slice(&600u16.to_be_bytes());
    data.resize(64, 0);

    let id = open(data).identify().await.unwrap();

    // The record was opened but nothing was read into it
    assert_eq!(id.directories.len(), 1);
    assert_eq!(id.directories[0].width, 0);
    assert!(id.metadata.make.is_empty());
}

#[tokio::test]
async fn test_truncated_files_never_fail() {
    let full = create_cr2_like();

    for len in [0, 1, 4, 8, 20, 64, 200, full.len() / 2] {
        let raw = open(full[..len].to_vec());
        let id = raw.identify().await.unwrap();
        assert!(id.directories.len() <= rawpeek::raw::MAX_DIRECTORIES);

        // Thumbnail extraction degrades the same way
        raw.thumbnail().await.unwrap();
    }
}

#[tokio::test]
async fn test_reader_failure_is_reported() {
    let raw = RawFile::new(FailingReader { size: 1024 });
    let err = raw.identify().await.unwrap_err();
    assert!(matches!(err, rawpeek::ExtractError::Io(_)));
}

#[tokio::test]
async fn test_unknown_file_yields_empty_identification() {
    let id = open(b"plain text, definitely not a camera file".to_vec())
        .identify()
        .await
        .unwrap();

    assert_eq!(id.format, SourceFormat::Unknown);
    assert!(id.directories.is_empty());
    assert!(id.metadata.make.is_empty());
}
