//! Tag and field type definitions.
//!
//! This module defines the vocabulary of the tagged-directory walker:
//! - Field types that determine how values are encoded
//! - Primary-directory tag IDs, including vendor aliases
//! - EXIF sub-directory tag IDs
//!
//! Maker-note tags are vendor-specific and are matched numerically in
//! [`crate::format::makernote`].

// =============================================================================
// Field Types
// =============================================================================

/// Per-type value sizes in bytes, indexed by the raw type code.
///
/// Codes 14 and above are unknown and fall back to slot 0 (one byte).
const TYPE_SIZES: [u8; 14] = [1, 1, 1, 2, 4, 8, 1, 1, 2, 4, 8, 4, 8, 4];

/// Field types that determine how values are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,

    /// 8-bit ASCII character
    Ascii = 2,

    /// Unsigned 16-bit integer
    Short = 3,

    /// Unsigned 32-bit integer
    Long = 4,

    /// Two LONGs: numerator, denominator
    Rational = 5,

    /// Signed 8-bit integer
    SByte = 6,

    /// Undefined byte data
    Undefined = 7,

    /// Signed 16-bit integer
    SShort = 8,

    /// Signed 32-bit integer
    SLong = 9,

    /// Two SLONGs: numerator, denominator
    SRational = 10,

    /// IEEE single precision float
    Float = 11,

    /// IEEE double precision float
    Double = 12,

    /// 32-bit offset to a sub-directory
    Ifd = 13,
}

impl FieldType {
    /// Size of a single value for a raw type code.
    ///
    /// Codes outside the table use the size of slot 0.
    #[inline]
    pub fn value_size(code: u16) -> u64 {
        let index = if (code as usize) < TYPE_SIZES.len() {
            code as usize
        } else {
            0
        };
        TYPE_SIZES[index] as u64
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            13 => Some(FieldType::Ifd),
            _ => None,
        }
    }
}

// =============================================================================
// Primary Directory Tags
// =============================================================================

/// Tags recognized in a primary tagged directory.
///
/// Several cameras store the same field under a private alias (Panasonic
/// uses 2/3 for the sensor size, the Fuji HS10 family uses 61440-61448).
/// [`TiffTag::from_u16`] folds every alias into one variant so the walker
/// dispatches on meaning, not number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    // -------------------------------------------------------------------------
    // Panasonic sensor block
    // -------------------------------------------------------------------------
    /// Sensor width (Panasonic)
    PanasonicWidth = 5,

    /// Sensor height (Panasonic)
    PanasonicHeight = 6,

    /// Added to the sensor width (Panasonic)
    PanasonicWidthAdjust = 7,

    /// Color filter pattern (Panasonic)
    PanasonicFilters = 9,

    /// ISO speed when stored as SHORT (Panasonic)
    PanasonicIso = 23,

    /// Embedded JPEG preview (Panasonic RW2)
    PanasonicJpeg = 46,

    // -------------------------------------------------------------------------
    // Image structure
    // -------------------------------------------------------------------------
    /// Image width (aliases 2, 61441)
    ImageWidth = 256,

    /// Image height (aliases 3, 61442)
    ImageLength = 257,

    /// Bits per sample (alias 61443)
    BitsPerSample = 258,

    /// Compression scheme
    Compression = 259,

    /// Photometric interpretation
    PhotometricInterpretation = 262,

    /// Orientation
    Orientation = 274,

    /// Samples per pixel
    SamplesPerPixel = 277,

    // -------------------------------------------------------------------------
    // Data location
    // -------------------------------------------------------------------------
    /// Strip offsets (aliases 513 JPEGInterchangeFormat, 61447)
    StripOffsets = 273,

    /// Strip byte counts (aliases 514 JPEGInterchangeFormatLength, 61448)
    StripByteCounts = 279,

    /// Panasonic RW2 raw data offset
    RawDataOffset = 280,

    /// Tile width
    TileWidth = 322,

    /// Tile length
    TileLength = 323,

    /// Tile offsets
    TileOffsets = 324,

    /// Sub-directory offsets
    SubIfds = 330,

    // -------------------------------------------------------------------------
    // Descriptive strings
    // -------------------------------------------------------------------------
    /// Free-form description
    ImageDescription = 270,

    /// Manufacturer
    Make = 271,

    /// Camera model
    Model = 272,

    /// Firmware or software name (alias 11)
    Software = 305,

    /// Date and time, "YYYY:MM:DD HH:MM:SS"
    DateTime = 306,

    /// Photographer
    Artist = 315,

    // -------------------------------------------------------------------------
    // Exposure
    // -------------------------------------------------------------------------
    /// Exposure time in seconds
    ExposureTime = 33434,

    /// F number
    FNumber = 33437,

    /// Focal length in millimetres
    FocalLength = 37386,

    /// Shot counter
    ImageNumber = 37393,

    // -------------------------------------------------------------------------
    // Sub-regions and vendor blocks
    // -------------------------------------------------------------------------
    /// Leaf marker tag
    LeafMarker = 34303,

    /// Leaf/Mos nested blocks
    LeafBlocks = 34310,

    /// Offset of the EXIF sub-directory
    ExifIfd = 34665,

    /// DNG version, four bytes
    DngVersion = 50706,

    /// DNG opcode list applied to the raw data
    OpcodeList2 = 51009,

    // -------------------------------------------------------------------------
    // Fuji HS10 family
    // -------------------------------------------------------------------------
    /// Nested directory
    FujiIfd = 61440,

    /// Loader flags
    FujiLoadFlags = 61446,
}

impl TiffTag {
    /// Resolve a numeric tag, folding vendor aliases.
    ///
    /// Returns `None` for tags the walker ignores.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            5 => Some(TiffTag::PanasonicWidth),
            6 => Some(TiffTag::PanasonicHeight),
            7 => Some(TiffTag::PanasonicWidthAdjust),
            9 => Some(TiffTag::PanasonicFilters),
            23 => Some(TiffTag::PanasonicIso),
            46 => Some(TiffTag::PanasonicJpeg),
            2 | 256 | 61441 => Some(TiffTag::ImageWidth),
            3 | 257 | 61442 => Some(TiffTag::ImageLength),
            258 | 61443 => Some(TiffTag::BitsPerSample),
            259 => Some(TiffTag::Compression),
            262 => Some(TiffTag::PhotometricInterpretation),
            274 => Some(TiffTag::Orientation),
            277 => Some(TiffTag::SamplesPerPixel),
            273 | 513 | 61447 => Some(TiffTag::StripOffsets),
            279 | 514 | 61448 => Some(TiffTag::StripByteCounts),
            280 => Some(TiffTag::RawDataOffset),
            322 => Some(TiffTag::TileWidth),
            323 => Some(TiffTag::TileLength),
            324 => Some(TiffTag::TileOffsets),
            330 => Some(TiffTag::SubIfds),
            270 => Some(TiffTag::ImageDescription),
            271 => Some(TiffTag::Make),
            272 => Some(TiffTag::Model),
            11 | 305 => Some(TiffTag::Software),
            306 => Some(TiffTag::DateTime),
            315 => Some(TiffTag::Artist),
            33434 => Some(TiffTag::ExposureTime),
            33437 => Some(TiffTag::FNumber),
            37386 => Some(TiffTag::FocalLength),
            37393 => Some(TiffTag::ImageNumber),
            34303 => Some(TiffTag::LeafMarker),
            34310 => Some(TiffTag::LeafBlocks),
            34665 => Some(TiffTag::ExifIfd),
            50706 => Some(TiffTag::DngVersion),
            51009 => Some(TiffTag::OpcodeList2),
            61440 => Some(TiffTag::FujiIfd),
            61446 => Some(TiffTag::FujiLoadFlags),
            _ => None,
        }
    }

    /// Get the numeric value of this tag.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

// =============================================================================
// EXIF Tags
// =============================================================================

/// Tags recognized in an EXIF sub-directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ExifTag {
    ExposureTime = 33434,
    FNumber = 33437,
    ExposureProgram = 34850,
    IsoSpeed = 34855,
    DateTimeOriginal = 36867,
    DateTimeDigitized = 36868,
    /// APEX shutter speed value
    ShutterSpeedValue = 37377,
    /// APEX aperture value
    ApertureValue = 37378,
    ExposureBias = 37380,
    Flash = 37385,
    FocalLength = 37386,
    MakerNote = 37500,
    /// Only honored for Kodak files
    PixelXDimension = 40962,
    /// Only honored for Kodak files
    PixelYDimension = 40963,
}

impl ExifTag {
    /// Resolve a numeric EXIF tag.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            33434 => Some(ExifTag::ExposureTime),
            33437 => Some(ExifTag::FNumber),
            34850 => Some(ExifTag::ExposureProgram),
            34855 => Some(ExifTag::IsoSpeed),
            36867 => Some(ExifTag::DateTimeOriginal),
            36868 => Some(ExifTag::DateTimeDigitized),
            37377 => Some(ExifTag::ShutterSpeedValue),
            37378 => Some(ExifTag::ApertureValue),
            37380 => Some(ExifTag::ExposureBias),
            37385 => Some(ExifTag::Flash),
            37386 => Some(ExifTag::FocalLength),
            37500 => Some(ExifTag::MakerNote),
            40962 => Some(ExifTag::PixelXDimension),
            40963 => Some(ExifTag::PixelYDimension),
            _ => None,
        }
    }
}

// =============================================================================
// Compression
// =============================================================================

/// Compression codes that influence candidate selection.
pub mod compression {
    /// Layered image with no compression field
    pub const NONE_LAYERED: u32 = 0;

    /// Uncompressed samples
    pub const UNCOMPRESSED: u32 = 1;

    /// Lossless JPEG, as found in CR2 and DNG raw data
    pub const LOSSLESS_JPEG: u32 = 6;

    /// Lossy JPEG inside a DNG container; never a thumbnail
    pub const LOSSY_DNG: u32 = 34892;

    /// Kodak proprietary; thumbnails in this encoding are disabled
    pub const KODAK_DISABLED: u32 = 65000;
}

// =============================================================================
// Tests
// =============================================================================
