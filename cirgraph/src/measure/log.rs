//! Simulator Log Text
//!
//! LTspice writes its `.log` as UTF-16LE. This module turns the raw bytes
//! into text and offers the line lookups the per-analysis decoders share.

use super::{LogDecodeError, MeasurementError};

/// Token the simulator prints when a `.meas` statement could not be evaluated
pub const FAILED_TOKEN: &str = "FAIL'ed";

/// Decode raw log bytes.
///
/// UTF-16LE is detected by its byte-order mark or by NUL high bytes on most
/// code units; anything else is read as UTF-8.
pub fn decode_log_bytes(bytes: &[u8]) -> Result<String, LogDecodeError> {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16le(rest);
    }
    if looks_like_utf16le(bytes) {
        return decode_utf16le(bytes);
    }

    String::from_utf8(bytes.to_vec()).map_err(|e| LogDecodeError::MalformedEncoding(e.to_string()))
}

fn looks_like_utf16le(bytes: &[u8]) -> bool {
    let units = bytes.len() / 2;
    if units == 0 {
        return false;
    }
    let nul_high = bytes.chunks_exact(2).filter(|unit| unit[1] == 0).count();
    nul_high * 2 > units
}

fn decode_utf16le(bytes: &[u8]) -> Result<String, LogDecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(LogDecodeError::MalformedEncoding(format!(
            "odd byte count {} for UTF-16LE log",
            bytes.len()
        )));
    }

    let units = bytes
        .chunks_exact(2)
        .map(|unit| u16::from_le_bytes([unit[0], unit[1]]));

    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|e| LogDecodeError::MalformedEncoding(e.to_string()))
}

/// Encode text as UTF-16LE with a byte-order mark, the way the simulator writes logs
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Find the result line of a named `.meas` statement (`{name}: ...`).
///
/// A missing line or one carrying [`FAILED_TOKEN`] makes the metric
/// unavailable.
pub fn measurement_line<'a>(log: &'a str, name: &str) -> Result<&'a str, MeasurementError> {
    let marker = format!("{}:", name);
    let line = log
        .lines()
        .find(|line| line.contains(&marker))
        .ok_or_else(|| MeasurementError::unavailable(name, "marker not found in log"))?;

    if line.contains(FAILED_TOKEN) {
        return Err(MeasurementError::unavailable(name, "simulator reported FAIL'ed"));
    }

    Ok(line)
}

/// Strip a trailing unit or degree sign and parse the remaining number
pub(crate) fn parse_leading_number(token: &str) -> Option<f64> {
    let trimmed = token
        .trim()
        .trim_end_matches(|c: char| !(c.is_ascii_digit() || c == '.'));
    trimmed.parse().ok()
}
