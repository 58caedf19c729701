//! Tests for vendor containers.
//!
//! These tests verify:
//! - Canon CIFF heaps (CRW) with CIFF-style orientation
//! - Fuji RAF header pointers and Exif passthrough of the embedded JPEG
//! - Minolta MRW block walking with an embedded TIFF
//! - Exif JPEG files resolved through the segment scanner
//! - Sigma X3F property tables and image sections

use super::test_utils::*;
use rawpeek::{MemoryReader, RawFile, SourceFormat, ThumbnailKind};

fn open(data: Vec<u8>) -> RawFile<MemoryReader> {
    RawFile::new(MemoryReader::new(data, "vendor.raw"))
}

// =============================================================================
// Canon CIFF
// =============================================================================

const CRW_HEADER_LEN: usize = 26;

/// Little-endian CRW with one heap holding the camera names, an image spec
/// rotated by 90 degrees, and a JPEG thumbnail.
fn create_crw(thumb: &[u8]) -> Vec<u8> {
    let mut data = b"II".to_vec();
    data.extend_from_slice(&(CRW_HEADER_LEN as u32).to_le_bytes());
    data.extend_from_slice(b"HEAPCCDR");
    data.resize(CRW_HEADER_LEN, 0);

    let mut heap = Vec::new();
    let names_at = heap.len() as u32;
    heap.extend_from_slice(b"Canon\0Canon EOS D60\0");
    let names_len = heap.len() as u32 - names_at;

    let spec_at = heap.len() as u32;
    for value in [3072u32, 2048, 0, 90] {
        heap.extend_from_slice(&value.to_le_bytes());
    }

    let thumb_at = heap.len() as u32;
    heap.extend_from_slice(thumb);

    let table_at = heap.len() as u32;
    let records: [(u16, u32, u32); 3] = [
        (0x080a, names_len, names_at),
        (0x1810, 16, spec_at),
        (0x2007, thumb.len() as u32, thumb_at),
    ];
    heap.extend_from_slice(&(records.len() as u16).to_le_bytes());
    for (record_type, len, offset) in records {
        heap.extend_from_slice(&record_type.to_le_bytes());
        heap.extend_from_slice(&len.to_le_bytes());
        heap.extend_from_slice(&offset.to_le_bytes());
    }
    heap.extend_from_slice(&table_at.to_le_bytes());

    data.extend(heap);
    data
}

#[tokio::test]
async fn test_crw_heap() {
    let thumb = create_test_rgb_jpeg(80, 60, 80);
    let id = open(create_crw(&thumb)).identify().await.unwrap();

    assert_eq!(id.format, SourceFormat::Tiff { ciff: true });

    let meta = &id.metadata;
    assert_eq!(meta.make.as_bytes(), b"Canon");
    assert_eq!(meta.model.as_bytes(), b"EOS D60");
    assert_eq!(meta.width, 3072);
    assert_eq!(meta.height, 2048);
    // 90 degrees from the image spec record
    assert_eq!(meta.flip, 6);

    assert_eq!(meta.thumb_length, thumb.len() as u64);
    assert_eq!(meta.thumb_width, 80);
    assert_eq!(meta.thumb_height, 60);
    assert_eq!(id.thumbnail_kind, ThumbnailKind::Jpeg);
}

#[tokio::test]
async fn test_crw_thumbnail_gets_exif_header() {
    let thumb = create_test_rgb_jpeg(80, 60, 80);
    let out = open(create_crw(&thumb))
        .thumbnail()
        .await
        .unwrap()
        .into_jpeg()
        .expect("CRW thumbnail should be emitted");

    assert_eq!(&out[6..12], b"Exif\0\0");
    assert_eq!(out.len(), thumb.len() + 1430);
    assert_eq!(decode_jpeg(&out), (80, 60));
}

#[tokio::test]
async fn test_crw_cyclic_heap_is_bounded() {
    // A heap whose only record is a sub-heap spanning itself
    let mut data = b"II".to_vec();
    data.extend_from_slice(&(CRW_HEADER_LEN as u32).to_le_bytes());
    data.extend_from_slice(b"HEAPCCDR");
    data.resize(CRW_HEADER_LEN, 0);

    let mut heap = 1u16.to_le_bytes().to_vec();
    heap.extend_from_slice(&0x300au16.to_le_bytes());
    heap.extend_from_slice(&16u32.to_le_bytes());
    heap.extend_from_slice(&0u32.to_le_bytes());
    heap.extend_from_slice(&[0, 0]);
    heap.extend_from_slice(&0u32.to_le_bytes());
    data.extend(heap);

    let id = open(data).identify().await.unwrap();
    assert_eq!(id.format, SourceFormat::Tiff { ciff: true });
    assert!(id.metadata.make.is_empty());
}

// =============================================================================
// Fuji RAF
// =============================================================================

const RAF_TIFF_AT: usize = 0x200;
const RAF_JPEG_AT: usize = 0x400;

/// RAF with a vendor directory block, a primary TIFF and a JPEG thumbnail
/// that carries its own Exif segment.
fn create_raf() -> (Vec<u8>, Vec<u8>) {
    let exif = create_name_tiff(ByteOrderType::BigEndian, "FUJIFILM", "X-Pro1");
    let jpeg = with_exif_segment(&create_test_rgb_jpeg(96, 64, 85), &exif);

    let mut data = vec![0u8; RAF_JPEG_AT];
    data[..16].copy_from_slice(b"FUJIFILMCCD-RAW ");

    let put = |data: &mut Vec<u8>, at: usize, value: u32| {
        data[at..at + 4].copy_from_slice(&value.to_be_bytes());
    };
    put(&mut data, 84, RAF_JPEG_AT as u32);
    put(&mut data, 88, jpeg.len() as u32);
    put(&mut data, 92, 0x100);
    put(&mut data, 100, RAF_TIFF_AT as u32);

    // Vendor directory block: raw height then raw width
    put(&mut data, 0x100, 1);
    data[0x104..0x106].copy_from_slice(&0x100u16.to_be_bytes());
    data[0x106..0x108].copy_from_slice(&4u16.to_be_bytes());
    data[0x108..0x10a].copy_from_slice(&3296u16.to_be_bytes());
    data[0x10a..0x10c].copy_from_slice(&4952u16.to_be_bytes());

    let tiff = create_name_tiff(ByteOrderType::BigEndian, "FUJIFILM", "X-Pro1");
    data[RAF_TIFF_AT..RAF_TIFF_AT + tiff.len()].copy_from_slice(&tiff);

    data.extend_from_slice(&jpeg);
    (data, jpeg)
}

#[tokio::test]
async fn test_raf_header() {
    let (data, jpeg) = create_raf();
    let id = open(data).identify().await.unwrap();

    assert_eq!(id.format, SourceFormat::Fuji);

    let meta = &id.metadata;
    assert_eq!(meta.make.as_bytes(), b"Fujifilm");
    assert_eq!(meta.model.as_bytes(), b"X-Pro1");
    assert_eq!(meta.raw_height, 3296);
    assert_eq!(meta.raw_width, 4952);
    assert_eq!(meta.data_offset, RAF_TIFF_AT as u64);
    assert_eq!(meta.thumb_offset, RAF_JPEG_AT as u64);
    assert_eq!(meta.thumb_length, jpeg.len() as u64);
}

#[tokio::test]
async fn test_raf_thumbnail_passthrough() {
    let (data, jpeg) = create_raf();
    let out = open(data).thumbnail().await.unwrap().into_jpeg().unwrap();

    // The embedded Exif segment is kept, so the output is the JPEG itself
    assert_eq!(&out[..], &jpeg[..]);
    assert_eq!(decode_jpeg(&out), (96, 64));
}

// =============================================================================
// Minolta MRW
// =============================================================================

fn mrw_block(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn create_mrw() -> Vec<u8> {
    let mut prd = b"21810002".to_vec();
    prd.extend_from_slice(&1544u16.to_be_bytes());
    prd.extend_from_slice(&2056u16.to_be_bytes());
    prd.resize(24, 0);

    let ttw = create_name_tiff(ByteOrderType::BigEndian, "MINOLTA", "DiMAGE A2");
    let body = [mrw_block(b"\0PRD", &prd), mrw_block(b"\0TTW", &ttw)].concat();

    let mut data = b"\0MRM".to_vec();
    data.extend_from_slice(&(body.len() as u32).to_be_bytes());
    data.extend(body);
    data.extend_from_slice(&[0u8; 256]);
    data
}

#[tokio::test]
async fn test_mrw_blocks() {
    let data = create_mrw();
    let blocks_end = data.len() as u64 - 256;
    let id = open(data).identify().await.unwrap();

    assert_eq!(id.format, SourceFormat::Minolta);

    let meta = &id.metadata;
    assert_eq!(meta.make.as_bytes(), b"Minolta");
    assert_eq!(meta.model.as_bytes(), b"DiMAGE A2");
    assert_eq!(meta.raw_height, 1544);
    assert_eq!(meta.raw_width, 2056);
    assert_eq!(meta.data_offset, blocks_end);
}

// =============================================================================
// Exif JPEG
// =============================================================================

#[tokio::test]
async fn test_exif_jpeg_resolved_by_segment_scan() {
    let tiff = create_name_tiff(
        ByteOrderType::LittleEndian,
        "OLYMPUS IMAGING CORP.",
        "E-M5",
    );
    let data = with_exif_segment(&create_test_rgb_jpeg(120, 90, 90), &tiff);

    let raw = open(data);
    let id = raw.identify().await.unwrap();

    assert_eq!(id.format, SourceFormat::ExifJpeg);
    assert_eq!(id.metadata.make.as_bytes(), b"Olympus");
    assert_eq!(id.metadata.model.as_bytes(), b"E-M5");
    // The frame header supplies the image geometry
    assert_eq!(id.metadata.raw_width, 120);
    assert_eq!(id.metadata.raw_height, 90);

    assert_eq!(raw.thumbnail().await.unwrap(), rawpeek::ThumbnailOutcome::NotFound);
}

// =============================================================================
// Sigma X3F
// =============================================================================

fn utf16(text: &str) -> Vec<u8> {
    let mut out: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    out.extend_from_slice(&[0, 0]);
    out
}

/// X3F with a JPEG image section and a property table.
fn create_x3f(jpeg: &[u8]) -> Vec<u8> {
    let mut data = b"FOVb".to_vec();
    data.resize(64, 0);

    // Image section: 28-byte header, then the preview stream
    let image_at = data.len() as u32;
    data.extend_from_slice(b"SECi");
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&96u32.to_le_bytes());
    data.extend_from_slice(&64u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(jpeg);
    let image_len = data.len() as u32 - image_at;

    // Property section: 24-byte header, offset pairs, then UTF-16 strings
    let props = [("CAMMANUF", "SIGMA"), ("CAMMODEL", "SD14"), ("ISO", "200")];
    let prop_at = data.len() as u32;
    data.extend_from_slice(b"SECp");
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&(props.len() as u32).to_le_bytes());
    data.extend_from_slice(&[0u8; 12]);
    let mut strings = Vec::new();
    for (name, value) in props {
        for text in [name, value] {
            data.extend_from_slice(&((strings.len() / 2) as u32).to_le_bytes());
            strings.extend(utf16(text));
        }
    }
    data.extend(strings);
    let prop_len = data.len() as u32 - prop_at;

    let directory_at = data.len() as u32;
    data.extend_from_slice(b"SECd");
    data.extend_from_slice(&0x20000u32.to_le_bytes());
    data.extend_from_slice(&2u32.to_le_bytes());
    for (offset, len, tag) in [(image_at, image_len, b"IMAG"), (prop_at, prop_len, b"PROP")] {
        data.extend_from_slice(&offset.to_le_bytes());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(tag);
    }
    data.extend_from_slice(&directory_at.to_le_bytes());
    data
}

#[tokio::test]
async fn test_x3f_properties_and_preview() {
    let jpeg = create_test_rgb_jpeg(96, 64, 85);
    let raw = open(create_x3f(&jpeg));
    let id = raw.identify().await.unwrap();

    assert_eq!(id.format, SourceFormat::Foveon);
    assert_eq!(id.thumbnail_kind, ThumbnailKind::Jpeg);

    let meta = &id.metadata;
    assert_eq!(meta.make.as_bytes(), b"Sigma");
    assert_eq!(meta.model.as_bytes(), b"SD14");
    assert_eq!(meta.iso_speed, 200.0);
    assert_eq!(meta.raw_width, 96);
    assert_eq!(meta.raw_height, 64);
    assert_eq!(meta.thumb_offset, 64 + 28);
    assert_eq!(meta.thumb_length, jpeg.len() as u64);

    let out = raw.thumbnail().await.unwrap().into_jpeg().unwrap();
    assert_eq!(&out[6..12], b"Exif\0\0");
    assert_eq!(decode_jpeg(&out), (96, 64));
}
