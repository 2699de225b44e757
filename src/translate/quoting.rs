//! Quoting policy for LogsQL field names and values

use std::fmt::Write;

/// Field names made only of ASCII alphanumerics, `_` and `.` need no quoting
pub fn is_bare_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.')
}

/// Values may additionally contain `-`, `:` and `/` (numbers, durations, paths)
pub fn is_bare_scalar(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'-' | b':' | b'/')
        })
}

pub fn quote_identifier_if_needed(s: &str) -> String {
    if is_bare_identifier(s) {
        s.to_string()
    } else {
        quote_string(s)
    }
}

/// The empty string always renders as `""`
pub fn quote_scalar_if_needed(s: &str) -> String {
    if is_bare_scalar(s) {
        s.to_string()
    } else {
        quote_string(s)
    }
}

/// Double-quoted string literal.
///
/// Quotes, backslashes and control characters are backslash-escaped; every
/// other character is written as-is. The escapes are exactly the ones
/// [`crate::parser::unquote`] decodes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if c.is_control() => {
                let code = c as u32;
                if code < 0x80 {
                    write!(out, "\\x{code:02x}").ok();
                } else {
                    write!(out, "\\u{code:04x}").ok();
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
