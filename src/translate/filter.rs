//! Label filter trees to LogsQL boolean expressions

use crate::ast::duration::format_canonical;
use crate::ast::{CompareOp, LabelFilter, MatchOp, Matcher};
use crate::error::{Result, TranslationError};

use super::quoting::{quote_identifier_if_needed, quote_scalar_if_needed, quote_string};

/// Translate a label filter tree.
///
/// `Noop` yields an empty string, which callers skip. Trees nested deeper
/// than `max_depth` binary levels are rejected.
pub fn translate_label_filter(filter: &LabelFilter, max_depth: usize) -> Result<String> {
    translate_at(filter, 1, max_depth)
}

fn translate_at(filter: &LabelFilter, depth: usize, max_depth: usize) -> Result<String> {
    match filter {
        LabelFilter::Noop => Ok(String::new()),
        LabelFilter::Binary { and, left, right } => {
            if depth > max_depth {
                return Err(TranslationError::filter_too_deep(max_depth));
            }
            let left = translate_at(left, depth + 1, max_depth)?;
            let right = translate_at(right, depth + 1, max_depth)?;
            // a noop side matches everything
            match (left.is_empty(), right.is_empty()) {
                (true, true) => Ok(String::new()),
                (true, false) | (false, true) if !and => Ok(String::new()),
                (true, false) => Ok(right),
                (false, true) => Ok(left),
                (false, false) => {
                    let op = if *and { " AND " } else { " OR " };
                    Ok(format!("({left}{op}{right})"))
                }
            }
        }
        LabelFilter::String(m) => Ok(translate_matcher(m)),
        LabelFilter::Numeric { name, op, value } => {
            Ok(translate_scalar(name, *op, &format_float(*value)))
        }
        LabelFilter::Duration { name, op, value } => {
            Ok(translate_scalar(name, *op, &format_canonical(*value)))
        }
        LabelFilter::Bytes { name, op, value } => {
            Ok(translate_scalar(name, *op, &value.to_string()))
        }
        LabelFilter::Ip { name, op, pattern } => translate_ip(name, *op, pattern),
    }
}

/// `name="v"` → `name:=v`, `name=~"re"` → `name:~"re"`; negations get a `-` prefix
pub fn translate_matcher(m: &Matcher) -> String {
    let name = quote_identifier_if_needed(&m.name);
    match m.op {
        MatchOp::Eq => format!("{name}:={}", quote_scalar_if_needed(&m.value)),
        MatchOp::Ne => format!("-{name}:={}", quote_scalar_if_needed(&m.value)),
        MatchOp::Re => format!("{name}:~{}", quote_string(&m.value)),
        MatchOp::Nre => format!("-{name}:~{}", quote_string(&m.value)),
    }
}

fn translate_scalar(field: &str, op: CompareOp, value: &str) -> String {
    let name = quote_identifier_if_needed(field);
    let value = quote_scalar_if_needed(value);
    match op {
        CompareOp::Eq => format!("{name}:={value}"),
        CompareOp::Ne => format!("-{name}:={value}"),
        CompareOp::Gt => format!("{name}:>{value}"),
        CompareOp::Ge => format!("{name}:>={value}"),
        CompareOp::Lt => format!("{name}:<{value}"),
        CompareOp::Le => format!("{name}:<={value}"),
    }
}

fn translate_ip(field: &str, op: CompareOp, pattern: &str) -> Result<String> {
    let filter = format!(
        "{}:ipv4_range({})",
        quote_identifier_if_needed(field),
        quote_string(pattern)
    );
    match op {
        CompareOp::Eq => Ok(filter),
        CompareOp::Ne => Ok(format!("-{filter}")),
        other => Err(TranslationError::unsupported(format!(
            "only '=' and '!=' are supported for LogQL ip() label filter, got '{other}'"
        ))),
    }
}

/// Shortest decimal form without exponent: `5`, `0.25`, `1000000`
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let sign = if v > 0.0 { '+' } else { '-' };
        format!("{sign}Inf")
    } else {
        format!("{v}")
    }
}
