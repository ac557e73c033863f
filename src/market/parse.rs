//! Field extraction from free text and loosely-typed venue JSON.
//!
//! Venue payloads carry numbers as JSON numbers, numeric strings, or buried
//! inside question text ("Will Bitcoin be above $100,000 on ..."). Every
//! function here returns `None` instead of guessing a default.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

const DATE_ONLY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

const LOCAL_DATETIME: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const LOCAL_DATETIME_FRACTIONAL: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// Extract the first decimal number from free text.
///
/// Grammar, scanned left to right:
///
/// ```text
/// number   := sign? (integer fraction? | fraction)
/// sign     := '+' | '-'            (only directly before a digit or '.')
/// integer  := digit+ (',' digit{3})*   (a group must not be followed by a digit)
/// fraction := '.' digit+
/// ```
///
/// Returns `None` when the text holds no number.
pub fn extract_number(text: &str) -> Option<Decimal> {
    let bytes = text.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        match scan_number(bytes, pos) {
            Some((literal, end)) => {
                if let Ok(value) = Decimal::from_str(&literal) {
                    return Some(value);
                }
                // Too many digits for a Decimal; keep looking past it.
                pos = end;
            }
            None => pos += 1,
        }
    }

    None
}

/// Try to read a number starting exactly at `start`.
///
/// Returns the normalized literal (separators removed) and the end offset.
fn scan_number(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let len = bytes.len();
    let mut pos = start;
    let mut literal = String::new();

    if matches!(bytes[pos], b'+' | b'-') {
        if bytes[pos] == b'-' {
            literal.push('-');
        }
        pos += 1;
    }

    let int_start = pos;
    while pos < len && bytes[pos].is_ascii_digit() {
        literal.push(bytes[pos] as char);
        pos += 1;
    }
    let has_integer = pos > int_start;

    if has_integer {
        while is_thousands_group(bytes, pos) {
            literal.extend(bytes[pos + 1..pos + 4].iter().map(|b| *b as char));
            pos += 4;
        }
    }

    let mut has_fraction = false;
    if pos + 1 < len && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
        if !has_integer {
            literal.push('0');
        }
        literal.push('.');
        pos += 1;
        while pos < len && bytes[pos].is_ascii_digit() {
            literal.push(bytes[pos] as char);
            pos += 1;
        }
        has_fraction = true;
    }

    if has_integer || has_fraction {
        Some((literal, pos))
    } else {
        None
    }
}

/// `,ddd` at `pos`, not followed by another digit.
fn is_thousands_group(bytes: &[u8], pos: usize) -> bool {
    pos + 4 <= bytes.len()
        && bytes[pos] == b','
        && bytes[pos + 1..pos + 4].iter().all(u8::is_ascii_digit)
        && bytes.get(pos + 4).map_or(true, |b| !b.is_ascii_digit())
}

/// Parse a venue expiration field into a calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (`Z` or numeric offset,
/// optional fractional seconds) and offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`.
/// The date is taken in the timestamp's own offset.
pub fn parse_expiration_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(timestamp.date());
    }

    if let Ok(timestamp) = PrimitiveDateTime::parse(raw, LOCAL_DATETIME)
        .or_else(|_| PrimitiveDateTime::parse(raw, LOCAL_DATETIME_FRACTIONAL))
    {
        return Some(timestamp.date());
    }

    Date::parse(raw, DATE_ONLY).ok()
}

/// Strict numeric conversion of a JSON number or numeric string.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_literal(&n.to_string()),
        Value::String(s) => parse_decimal_literal(s.trim()),
        _ => None,
    }
}

/// Strike conversion: JSON numbers directly, strings through [`extract_number`].
pub fn strike_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_literal(&n.to_string()),
        Value::String(s) => extract_number(s),
        _ => None,
    }
}

fn parse_decimal_literal(literal: &str) -> Option<Decimal> {
    Decimal::from_str(literal)
        .or_else(|_| Decimal::from_scientific(literal))
        .ok()
}

/// First entry of a JSON-encoded outcome price array such as `["0.42", "0.58"]`.
pub fn first_outcome_price(raw: &str) -> Option<Decimal> {
    let prices: Vec<Value> = serde_json::from_str(raw).ok()?;
    prices.first().and_then(decimal_from_value)
}

/// Venue identifier from a string or numeric JSON value.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
