//! Tests for thumbnail extraction.
//!
//! These tests verify:
//! - Synthesized Exif APP1 segments and their layout
//! - The emitted stream decodes as a JPEG of the preview's dimensions
//! - The synthesized header describes the camera when read back
//! - Allocation limits and missing thumbnails

use super::test_utils::*;
use rawpeek::{
    ExtractError, MemoryReader, ParseOptions, RawFile, SourceFormat, ThumbnailOutcome,
};

fn open(data: Vec<u8>) -> RawFile<MemoryReader> {
    RawFile::new(MemoryReader::new(data, "thumb.raw"))
}

async fn cr2_thumbnail() -> Vec<u8> {
    open(create_cr2_like())
        .thumbnail()
        .await
        .unwrap()
        .into_jpeg()
        .expect("CR2 preview should be emitted")
        .to_vec()
}

// =============================================================================
// Synthesized Exif Header
// =============================================================================

#[tokio::test]
async fn test_synthesized_app1_layout() {
    let out = cr2_thumbnail().await;

    assert_eq!(&out[0..2], &[0xFF, 0xD8]);
    assert_eq!(&out[2..4], &[0xFF, 0xE1]);
    assert_eq!(be16(&out, 4), rawpeek::thumbnail::APP1_LENGTH);
    assert_eq!(&out[6..12], b"Exif\0\0");

    // Big-endian TIFF header with the first directory at 10
    assert_eq!(&out[12..14], b"MM");
    assert_eq!(be16(&out, 14), 42);
    assert_eq!(be32(&out, 16), 10);

    // The preview's own stream resumes right after the segment
    let resume = 4 + rawpeek::thumbnail::APP1_LENGTH as usize;
    assert_eq!(out[resume], 0xFF);
}

#[tokio::test]
async fn test_synthesized_thumbnail_decodes() {
    let out = cr2_thumbnail().await;
    assert_eq!(decode_jpeg(&out), PREVIEW_SIZE);
}

#[tokio::test]
async fn test_synthesized_thumbnail_length() {
    let raw = open(create_cr2_like());
    let meta = raw.metadata().await.unwrap();
    let out = raw.thumbnail().await.unwrap().into_jpeg().unwrap();

    // SOI + APP1 marker + segment, then the preview minus its SOI
    let expected = 2 + 2 + rawpeek::thumbnail::APP1_LENGTH as u64 + meta.thumb_length - 2;
    assert_eq!(out.len() as u64, expected);
}

#[tokio::test]
async fn test_synthesized_header_reads_back() {
    let out = cr2_thumbnail().await;

    // The emitted thumbnail is itself an Exif JPEG
    let id = open(out).identify().await.unwrap();
    assert_eq!(id.format, SourceFormat::ExifJpeg);

    let meta = &id.metadata;
    assert_eq!(meta.make.as_bytes(), b"Canon");
    assert_eq!(meta.model.as_bytes(), b"EOS 5D Mark II");
    assert_eq!(meta.artist.as_bytes(), b"Jane Doe");
    assert_eq!(meta.flip, 6);
    assert!((meta.shutter - 0.004).abs() < 1e-5);
    assert!((meta.aperture - 5.6).abs() < 1e-5);
    assert!((meta.focal_len - 50.0).abs() < 1e-5);
    assert_eq!(meta.iso_speed, 400.0);
    assert_eq!(meta.raw_width, PREVIEW_SIZE.0);
    assert_eq!(meta.raw_height, PREVIEW_SIZE.1);
}

// =============================================================================
// Exif Passthrough
// =============================================================================

#[tokio::test]
async fn test_tagged_preview_is_not_rewrapped() {
    let mut b = TiffBuilder::new(ByteOrderType::LittleEndian);
    let exif = create_name_tiff(ByteOrderType::LittleEndian, "SONY", "DSLR-A700");
    let preview = with_exif_segment(&create_test_rgb_jpeg(48, 32, 85), &exif);
    let blob = b.blob(preview.clone());
    b.chained(vec![
        (256, Value::Short(48)),
        (257, Value::Short(32)),
        (258, Value::Shorts(vec![8, 8, 8])),
        (259, Value::Short(6)),
        (271, ascii("SONY")),
        (272, ascii("DSLR-A700")),
        (273, Value::BlobOffset(blob)),
        (279, Value::BlobLength(blob)),
    ]);

    let out = open(b.build()).thumbnail().await.unwrap().into_jpeg().unwrap();

    assert_eq!(out.len(), preview.len());
    assert_eq!(&out[..], &preview[..]);
    assert_eq!(decode_jpeg(&out), (48, 32));
}

// =============================================================================
// Limits and Missing Thumbnails
// =============================================================================

#[tokio::test]
async fn test_thumbnail_over_limit() {
    let options = ParseOptions {
        max_thumbnail_bytes: 100,
        ..Default::default()
    };
    let raw = RawFile::with_options(MemoryReader::new(create_cr2_like(), "limit"), options);

    let err = raw.thumbnail().await.unwrap_err();
    match err {
        ExtractError::ThumbnailTooLarge { length, limit } => {
            assert!(length > 100);
            assert_eq!(limit, 100);
        }
        other => panic!("expected ThumbnailTooLarge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_thumbnail() {
    let data = create_name_tiff(ByteOrderType::BigEndian, "Leica", "M9");
    assert_eq!(open(data).thumbnail().await.unwrap(), ThumbnailOutcome::NotFound);
}

#[tokio::test]
async fn test_small_window_same_result() {
    let options = ParseOptions {
        window_size: 512,
        ..Default::default()
    };
    let reader = TrackingMockReader::new(create_cr2_like(), "window");
    let raw = RawFile::with_options(reader, options);

    let out = raw.thumbnail().await.unwrap().into_jpeg().unwrap();

    assert_eq!(&out[..], &cr2_thumbnail().await[..]);
    assert!(raw.reader().request_count() > 1);
}
