//! Number rendering and date validation for user-facing text.

use chrono::NaiveDate;
use num_format::{CustomFormat, Grouping, ToFormattedString};

/// Thousands separator: U+00A0 NO-BREAK SPACE.
pub const GROUP_SEPARATOR: char = '\u{a0}';
pub const DECIMAL_SEPARATOR: char = ',';

/// Render with grouped thousands and at most two fractional digits, no zero padding.
/// Non-finite input renders as `"0"`.
///
/// `1234.5` → `"1 234,5"` (with a no-break space), `500` → `"500"`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let cents = (value.abs() * 100.0).round() as u128;
    let whole = u64::try_from(cents / 100).unwrap_or(u64::MAX);
    let frac = cents % 100;

    let mut out = String::new();
    if value < 0.0 && cents != 0 {
        out.push('-');
    }
    match grouping() {
        Ok(fmt) => out.push_str(&whole.to_formatted_string(&fmt)),
        Err(_) => out.push_str(&whole.to_string()),
    }
    if frac != 0 {
        out.push(DECIMAL_SEPARATOR);
        if frac % 10 == 0 {
            out.push_str(&(frac / 10).to_string());
        } else {
            out.push_str(&format!("{frac:02}"));
        }
    }
    out
}

fn grouping() -> Result<CustomFormat, num_format::Error> {
    CustomFormat::builder()
        .grouping(Grouping::Standard)
        .separator(GROUP_SEPARATOR.to_string())
        .build()
}

/// Integer counterpart of [`format_number`].
pub fn format_count(value: i64) -> String {
    format_number(value as f64)
}

/// Parse a strict `YYYY-MM-DD` string that names a real calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    let digits_ok = b
        .iter()
        .enumerate()
        .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    let year = s[0..4].parse().ok()?;
    let month = s[5..7].parse().ok()?;
    let day = s[8..10].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn is_valid_date(s: &str) -> bool {
    parse_date(s).is_some()
}
