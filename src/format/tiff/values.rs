//! Typed value decoding at the cursor.
//!
//! Entry handlers call these right after [`read_entry`](super::read_entry),
//! with the cursor at the entry's value. Every read goes through the
//! cursor's current byte order, so the same helpers serve big-endian TIFF,
//! little-endian maker notes and everything in between.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::IoError;
use crate::io::{RangeReader, SourceCursor};

use super::tags::FieldType;

/// Length of a "YYYY:MM:DD HH:MM:SS" string.
const TIMESTAMP_LEN: usize = 19;

/// Read an integer of the given field type: SHORT reads 2 bytes, anything
/// else reads 4.
pub async fn get_int<R: RangeReader>(
    cursor: &mut SourceCursor<R>,
    field_type: u16,
) -> Result<u32, IoError> {
    if field_type == FieldType::Short as u16 {
        Ok(cursor.get2().await? as u32)
    } else {
        cursor.get4().await
    }
}

/// Read a real number of the given field type.
///
/// Rationals with a zero denominator decode as 0. Unknown type codes read a
/// single byte.
pub async fn get_real<R: RangeReader>(
    cursor: &mut SourceCursor<R>,
    field_type: u16,
) -> Result<f64, IoError> {
    let value = match FieldType::from_u16(field_type) {
        Some(FieldType::Short) => cursor.get2().await? as f64,
        Some(FieldType::Long) => cursor.get4().await? as f64,
        Some(FieldType::Rational) => {
            let num = cursor.get4().await? as f64;
            let den = cursor.get4().await? as f64;
            ratio(num, den)
        }
        Some(FieldType::SShort) => cursor.get2().await? as i16 as f64,
        Some(FieldType::SLong) => cursor.get4().await? as i32 as f64,
        Some(FieldType::SRational) => {
            let num = cursor.get4().await? as i32 as f64;
            let den = cursor.get4().await? as i32 as f64;
            ratio(num, den)
        }
        Some(FieldType::Float) => f32::from_bits(cursor.get4().await?) as f64,
        Some(FieldType::Double) => {
            let raw = cursor.get8_raw().await?;
            cursor.byte_order().read_f64(raw)
        }
        _ => cursor.read_u8_or_fill().await? as f64,
    };
    Ok(value)
}

#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Read a 19-byte "YYYY:MM:DD HH:MM:SS" string at the cursor.
///
/// Returns `None` when the text does not hold six integers forming a valid
/// calendar date and time; callers keep their previous value in that case.
pub async fn get_timestamp<R: RangeReader>(
    cursor: &mut SourceCursor<R>,
) -> Result<Option<DateTime<Utc>>, IoError> {
    let bytes = cursor.read_bytes(TIMESTAMP_LEN).await?;
    Ok(parse_timestamp(&bytes))
}

/// Parse an EXIF-style date string.
pub fn parse_timestamp(raw: &[u8]) -> Option<DateTime<Utc>> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = std::str::from_utf8(&raw[..end]).ok()?.trim();

    let parts: Vec<u32> = text
        .split([' ', ':'])
        .filter(|part| !part.is_empty())
        .take(6)
        .map(|part| part.parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    if parts.len() < 6 {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(parts[0] as i32, parts[1], parts[2])?;
    let datetime = date.and_hms_opt(parts[3], parts[4], parts[5])?;
    Some(datetime.and_utc())
}

/// Convert Unix seconds to a UTC timestamp.
#[inline]
pub fn unix_timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

// =============================================================================
// Numeric text
// =============================================================================

/// The text before the first NUL, with leading whitespace removed.
fn numeric_text(raw: &[u8]) -> &[u8] {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let start = raw[..end]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(end);
    &raw[start..end]
}

/// Parse the integer at the start of a text field.
///
/// Leading whitespace and an optional sign are accepted; parsing stops at
/// the first non-digit. Returns `None` when no digit is present.
pub fn leading_int(raw: &[u8]) -> Option<i64> {
    let text = numeric_text(raw);
    let (negative, digits) = match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let count = digits.iter().take_while(|b| b.is_ascii_digit()).count();
    if count == 0 {
        return None;
    }

    let value = digits[..count]
        .iter()
        .fold(0i64, |acc, &d| acc.wrapping_mul(10).wrapping_add((d - b'0') as i64));
    Some(if negative { value.wrapping_neg() } else { value })
}

/// Parse the decimal number at the start of a text field, or 0.
pub fn leading_float(raw: &[u8]) -> f64 {
    let text = numeric_text(raw);
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;

    while end < text.len() {
        match text[end] {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 || matches!(text[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }

    // Back off a dangling exponent or sign until the prefix parses
    while end > 0 {
        if let Some(value) = std::str::from_utf8(&text[..end])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
        {
            return value;
        }
        end -= 1;
    }
    0.0
}

// =============================================================================
// Tests
// =============================================================================
