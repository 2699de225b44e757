//! Decoding of quoted strings, durations, byte sizes and numbers

use std::time::Duration;

use miette::SourceSpan;

use super::error::ParseError;

/// Decode a complete quoted LogQL string literal (`"..."` or `` `...` ``).
///
/// Inverse of [`crate::translate::quote_string`].
pub fn unquote(literal: &str) -> Result<String, ParseError> {
    let invalid = || {
        ParseError::invalid_value(
            "quoted string",
            literal,
            (0, literal.len().max(1)).into(),
            literal,
        )
    };
    let quote = literal.chars().next().ok_or_else(invalid)?;
    if !matches!(quote, '"' | '`') || literal.len() < 2 || !literal.ends_with(quote) {
        return Err(invalid());
    }
    let inner = &literal[1..literal.len() - 1];
    match quote {
        '`' if !inner.contains('`') => Ok(inner.to_string()),
        '"' => unescape(inner, 1, literal),
        _ => Err(invalid()),
    }
}

/// Decode escapes inside a double-quoted string body.
///
/// `offset` is the position of `inner` within `src`, for error spans.
pub(super) fn unescape(inner: &str, offset: usize, src: &str) -> Result<String, ParseError> {
    let mut out: Vec<u8> = Vec::with_capacity(inner.len());
    let mut chars = inner.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let start = offset + i;
        let unterminated = || ParseError::UnterminatedEscape {
            span: (start, inner.len() - i).into(),
            src: src.to_string(),
        };
        let (_, esc) = chars.next().ok_or_else(unterminated)?;

        let simple = match esc {
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0c),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(0x0b),
            '\\' => Some(b'\\'),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(b) = simple {
            out.push(b);
            continue;
        }

        let mut take_digits = |n: usize, radix: u32| -> Result<u32, ParseError> {
            let mut value = 0u32;
            for _ in 0..n {
                let (_, d) = chars.next().ok_or_else(unterminated)?;
                let d = d.to_digit(radix).ok_or_else(|| ParseError::InvalidEscape {
                    char: esc,
                    span: (start, 2).into(),
                    src: src.to_string(),
                })?;
                value = value * radix + d;
            }
            Ok(value)
        };

        match esc {
            'x' => out.push(take_digits(2, 16)? as u8),
            '0'..='7' => {
                let rest = take_digits(2, 8)?;
                let value = (esc as u32 - '0' as u32) * 64 + rest;
                let byte = u8::try_from(value).map_err(|_| {
                    ParseError::invalid_value(
                        "octal escape up to \\377",
                        format!("\\{esc}{rest:02o}"),
                        (start, 4).into(),
                        src,
                    )
                })?;
                out.push(byte);
            }
            'u' | 'U' => {
                let width = if esc == 'u' { 4 } else { 8 };
                let value = take_digits(width, 16)?;
                let ch = char::from_u32(value).ok_or_else(|| {
                    ParseError::invalid_value(
                        "unicode scalar value",
                        format!("\\{esc}{value:0width$x}"),
                        (start, width + 2).into(),
                        src,
                    )
                })?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            other => {
                return Err(ParseError::InvalidEscape {
                    char: other,
                    span: (start, 1 + other.len_utf8()).into(),
                    src: src.to_string(),
                })
            }
        }
    }

    String::from_utf8(out).map_err(|_| {
        ParseError::invalid_value(
            "UTF-8 string",
            "invalid byte escapes",
            (offset, inner.len().max(1)).into(),
            src,
        )
    })
}

const NANOS_PER_SECOND: u128 = 1_000_000_000;

fn duration_unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SECOND,
        "m" => 60 * NANOS_PER_SECOND,
        "h" => 3_600 * NANOS_PER_SECOND,
        "d" => 86_400 * NANOS_PER_SECOND,
        "w" => 7 * 86_400 * NANOS_PER_SECOND,
        "y" => 365 * 86_400 * NANOS_PER_SECOND,
        _ => return None,
    })
}

/// Parse `1h30m`, `250ms`, `1.5s`, `7d`, ...
pub fn parse_duration(s: &str, span: SourceSpan, src: &str) -> Result<Duration, ParseError> {
    let invalid = || ParseError::invalid_value("duration", s, span, src);

    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(num_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit = duration_unit_nanos(unit).ok_or_else(invalid)?;

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        let whole: u128 = whole.parse().map_err(|_| invalid())?;
        let mut nanos = whole.checked_mul(unit).ok_or_else(invalid)?;
        if !frac.is_empty() {
            let scale = 10u128.checked_pow(frac.len() as u32).ok_or_else(invalid)?;
            let frac: u128 = frac.parse().map_err(|_| invalid())?;
            nanos += frac.checked_mul(unit).ok_or_else(invalid)? / scale;
        }
        total = total.checked_add(nanos).ok_or_else(invalid)?;
        rest = tail;
    }

    let total = u64::try_from(total).map_err(|_| invalid())?;
    Ok(Duration::from_nanos(total))
}

/// Parse `10KB` (powers of 1000) or `10KiB` (powers of 1024); case-insensitive
pub fn parse_bytes(s: &str, span: SourceSpan, src: &str) -> Result<u64, ParseError> {
    let invalid = || ParseError::invalid_value("byte size", s, span, src);

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(invalid)?;
    let (number, unit) = s.split_at(split);
    let unit = unit.to_ascii_lowercase();
    let (base, exp): (f64, i32) = match unit.as_str() {
        "b" => (1.0, 0),
        "kb" => (1000.0, 1),
        "mb" => (1000.0, 2),
        "gb" => (1000.0, 3),
        "tb" => (1000.0, 4),
        "pb" => (1000.0, 5),
        "eb" => (1000.0, 6),
        "kib" => (1024.0, 1),
        "mib" => (1024.0, 2),
        "gib" => (1024.0, 3),
        "tib" => (1024.0, 4),
        "pib" => (1024.0, 5),
        "eib" => (1024.0, 6),
        _ => return Err(invalid()),
    };
    let number: f64 = number.parse().map_err(|_| invalid())?;
    let value = number * base.powi(exp);
    if !value.is_finite() || value >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(value as u64)
}

pub fn parse_number(s: &str, span: SourceSpan, src: &str) -> Result<f64, ParseError> {
    s.parse::<f64>()
        .map_err(|_| ParseError::invalid_value("number", s, span, src))
}
