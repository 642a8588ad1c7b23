//! Fixed-width ASCII field decoding shared by the header, signal table and
//! annotation parsers.

use crate::error::{EdfError, Result};
use crate::EDF_TIME_DIMENSION;

/// 检查字符串是否为有效的整数
pub fn is_integer_number(s: &str) -> bool {
    let s = s.trim();
    let digits = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// 检查字符串是否为有效的数字（包括浮点数）
///
/// Rejects the `inf`/`NaN` spellings that `str::parse::<f64>` would accept.
pub fn is_number(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && s.parse::<f64>().is_ok()
}

/// Decodes one fixed-width ASCII field, stripping space (and NUL) padding.
///
/// Fails with `MalformedHeaderField` if `span` is shorter than `width` or the
/// field holds non-ASCII bytes.
pub fn field_text(span: &[u8], width: usize, field: &'static str, offset: u64) -> Result<String> {
    let raw = span
        .get(..width)
        .ok_or_else(|| EdfError::malformed_field(field, offset, span))?;
    if !raw.is_ascii() {
        return Err(EdfError::malformed_field(field, offset, raw));
    }
    // ASCII 已验证，不会失败
    let text = String::from_utf8_lossy(raw);
    Ok(text.trim_matches(|c: char| c == ' ' || c == '\0').to_string())
}

/// Parses a trimmed field as a signed integer.
pub fn parse_int_field(text: &str, field: &'static str, offset: u64) -> Result<i64> {
    if !is_integer_number(text) {
        return Err(EdfError::malformed_field(field, offset, text.as_bytes()));
    }
    text.trim()
        .parse::<i64>()
        .map_err(|_| EdfError::malformed_field(field, offset, text.as_bytes()))
}

/// Parses a trimmed field as a decimal number.
pub fn parse_float_field(text: &str, field: &'static str, offset: u64) -> Result<f64> {
    if !is_number(text) {
        return Err(EdfError::malformed_field(field, offset, text.as_bytes()));
    }
    text.trim()
        .parse::<f64>()
        .map_err(|_| EdfError::malformed_field(field, offset, text.as_bytes()))
}

/// Sequential reader over a header buffer that knows the absolute file offset
/// of every field it hands out.
#[derive(Debug)]
pub struct FieldCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    base_offset: u64,
}

impl<'a> FieldCursor<'a> {
    pub fn new(buf: &'a [u8], base_offset: u64) -> Self {
        FieldCursor { buf, pos: 0, base_offset }
    }

    /// Absolute file offset of the next field.
    pub fn offset(&self) -> u64 {
        self.base_offset + self.pos as u64
    }

    /// Number of bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn text(&mut self, width: usize, field: &'static str) -> Result<String> {
        let offset = self.offset();
        let span = self.buf.get(self.pos..).unwrap_or(&[]);
        let text = field_text(span, width, field, offset)?;
        self.pos += width;
        Ok(text)
    }

    pub fn int(&mut self, width: usize, field: &'static str) -> Result<i64> {
        let offset = self.offset();
        let text = self.text(width, field)?;
        parse_int_field(&text, field, offset)
    }

    pub fn float(&mut self, width: usize, field: &'static str) -> Result<f64> {
        let offset = self.offset();
        let text = self.text(width, field)?;
        parse_float_field(&text, field, offset)
    }
}

/// 解析EDF时间字符串为100纳秒单位
///
/// Accepts an optional sign, digits and at most one decimal point. Fractions
/// beyond seven digits are truncated.
pub fn parse_edf_time(s: &str) -> Option<i64> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }

    let (integer_part, decimal_part) = match body.split_once('.') {
        Some((int, dec)) => (int, dec),
        None => (body, ""),
    };
    if decimal_part.contains('.') || (integer_part.is_empty() && decimal_part.is_empty()) {
        return None;
    }

    let mut value = 0i64;
    if !integer_part.is_empty() {
        value = integer_part.parse::<i64>().ok()?.checked_mul(EDF_TIME_DIMENSION)?;
    }

    // 解析小数部分（最多7位精度）
    if !decimal_part.is_empty() {
        let decimal_str = &decimal_part[..decimal_part.len().min(7)];
        let decimal_value = decimal_str.parse::<i64>().ok()?;
        let scale = 10i64.pow(7 - decimal_str.len() as u32);
        value = value.checked_add(decimal_value * scale)?;
    }

    Some(if negative { -value } else { value })
}

/// Converts 100 ns units into fractional seconds.
pub fn time_to_seconds(value: i64) -> f64 {
    value as f64 / EDF_TIME_DIMENSION as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_integer_number() {
        assert!(is_integer_number("123"));
        assert!(is_integer_number("-456"));
        assert!(is_integer_number("+789"));
        assert!(is_integer_number("0"));
        assert!(!is_integer_number("12.34"));
        assert!(!is_integer_number("abc"));
        assert!(!is_integer_number(""));
        assert!(!is_integer_number("-"));
    }

    #[test]
    fn test_is_number_rejects_special_values() {
        assert!(is_number("-200"));
        assert!(is_number("3.5e2"));
        assert!(!is_number("inf"));
        assert!(!is_number("NaN"));
        assert!(!is_number("   "));
    }

    #[test]
    fn test_field_text_trims_padding() {
        assert_eq!(field_text(b"0       ", 8, "version", 0).unwrap(), "0");
        assert_eq!(field_text(b"  EEG Fp1\0\0\0", 12, "label", 256).unwrap(), "EEG Fp1");
    }

    #[test]
    fn test_field_text_short_span() {
        let err = field_text(b"0   ", 8, "version", 0).unwrap_err();
        assert!(matches!(err, EdfError::MalformedHeaderField { field: "version", offset: 0, .. }));
    }

    #[test]
    fn test_field_text_rejects_non_ascii() {
        let err = field_text("Müller  ".as_bytes(), 8, "patient", 8).unwrap_err();
        assert!(matches!(err, EdfError::MalformedHeaderField { field: "patient", offset: 8, .. }));
    }

    #[test]
    fn test_numeric_fields() {
        assert_eq!(parse_int_field("-1", "num_records", 236).unwrap(), -1);
        assert_eq!(parse_float_field("0.5", "record_duration", 244).unwrap(), 0.5);
        assert!(matches!(
            parse_int_field("", "num_records", 236),
            Err(EdfError::MalformedHeaderField { field: "num_records", offset: 236, .. })
        ));
        assert!(parse_float_field("1,5", "record_duration", 244).is_err());
    }

    #[test]
    fn test_cursor_tracks_offsets() {
        let buf = b"12      abc     ";
        let mut cursor = FieldCursor::new(buf, 100);
        assert_eq!(cursor.int(8, "a").unwrap(), 12);
        assert_eq!(cursor.offset(), 108);
        let err = cursor.int(8, "b").unwrap_err();
        assert!(matches!(err, EdfError::MalformedHeaderField { field: "b", offset: 108, .. }));
    }

    #[test]
    fn test_parse_edf_time() {
        assert_eq!(parse_edf_time("1"), Some(10_000_000));
        assert_eq!(parse_edf_time("1.5"), Some(15_000_000));
        assert_eq!(parse_edf_time("-2.5"), Some(-25_000_000));
        assert_eq!(parse_edf_time("+0.0000001"), Some(1));
        assert_eq!(parse_edf_time("+.5"), Some(5_000_000));
        assert_eq!(parse_edf_time("+"), None);
        assert_eq!(parse_edf_time("+1.2.3"), None);
        assert_eq!(parse_edf_time("+-1"), None);
        assert_eq!(parse_edf_time("+1e3"), None);
    }
}
