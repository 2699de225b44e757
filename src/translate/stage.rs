//! Pipeline stages to LogsQL filters and pipes

use std::collections::HashSet;
use std::iter;

use itertools::Itertools;

use crate::ast::{
    FieldExtraction, LabelFormatEntry, LabelItem, LineFilter, LineFilterValue, LineMatchType,
    LogfmtFlags, Matcher, ParserKind, Stage,
};
use crate::error::{Result, TranslationError};

use super::builder::PipelineBuilder;
use super::filter::{translate_label_filter, translate_matcher};
use super::quoting::{quote_identifier_if_needed, quote_string};
use super::template::convert_template;
use super::TranslateOptions;

const FIELD_EXTRACTION_HELP: &str =
    "use plain '| json' or '| logfmt' and then filter by the extracted fields";

/// Translate one stage onto the builder
pub fn apply_stage(
    b: PipelineBuilder,
    stage: &Stage,
    options: &TranslateOptions,
) -> Result<PipelineBuilder> {
    match stage {
        Stage::LineFilter(chain) => Ok(b.filters(translate_line_filter_chain(chain)?)),
        Stage::LabelFilter(filter) => {
            Ok(b.filter(translate_label_filter(filter, options.max_filter_depth)?))
        }
        Stage::LineParser { kind, param } => Ok(b.pipe(translate_line_parser(*kind, param)?)),
        Stage::LogfmtParser(flags) => {
            check_logfmt_flags(flags)?;
            Ok(b.pipe("unpack_logfmt"))
        }
        Stage::Decolorize => Ok(b.pipe("decolorize")),
        Stage::DropLabels(items) => Ok(apply_drop(b, items)),
        Stage::KeepLabels(items) => apply_keep(b, items),
        Stage::LineFormat(template) => {
            let pattern = convert_template(template)?;
            Ok(b.pipe(format!("format {}", quote_string(&pattern))))
        }
        Stage::LabelFormat(entries) => apply_label_format(b, entries),
        Stage::JsonFieldParser(fields) => apply_field_extraction(b, "unpack_json", fields),
        Stage::LogfmtFieldParser { flags, fields } => {
            check_logfmt_flags(flags)?;
            apply_field_extraction(b, "unpack_logfmt", fields)
        }
    }
}

// ============================================================================
// Line filters
// ============================================================================

/// One filter per chain element, in the order written
pub fn translate_line_filter_chain(chain: &[LineFilter]) -> Result<Vec<String>> {
    chain.iter().map(translate_line_filter_group).collect()
}

fn translate_line_filter_group(filter: &LineFilter) -> Result<String> {
    if filter.or.is_empty() {
        return translate_line_filter_leaf(filter.ty, &filter.value);
    }
    if !filter.ty.can_or() {
        return Err(TranslationError::unsupported_with_help(
            "LogQL line filter 'or' for negative matches isn't supported yet",
            "rewrite the query without 'or', e.g. as consecutive negative filters",
        ));
    }

    let parts = iter::once(&filter.value)
        .chain(&filter.or)
        .map(|value| translate_line_filter_leaf(filter.ty, value))
        .collect::<Result<Vec<_>>>()?;
    // `|= ""` matches every line, and so does any `or` group containing it
    if parts.iter().any(String::is_empty) {
        return Ok(String::new());
    }
    Ok(format!("({})", parts.join(" OR ")))
}

fn translate_line_filter_leaf(ty: LineMatchType, value: &LineFilterValue) -> Result<String> {
    let s = match value {
        LineFilterValue::Literal(s) => s,
        LineFilterValue::Ip(_) => {
            return Err(TranslationError::unsupported(
                "unsupported LogQL line filter function \"ip\"",
            ))
        }
    };
    match ty {
        LineMatchType::Equal if s.is_empty() => Ok(String::new()),
        LineMatchType::Equal => Ok(quote_string(s)),
        LineMatchType::NotEqual => Ok(format!("-{}", quote_string(s))),
        LineMatchType::Regexp => Ok(format!("~{}", quote_string(s))),
        LineMatchType::NotRegexp => Ok(format!("NOT ~{}", quote_string(s))),
        LineMatchType::Pattern | LineMatchType::NotPattern => Err(
            TranslationError::unsupported_with_help(
                "LogQL pattern line filters (|> / !>) aren't supported yet",
                "use '|~' with an equivalent regular expression",
            ),
        ),
    }
}

// ============================================================================
// Parsers
// ============================================================================

fn translate_line_parser(kind: ParserKind, param: &Option<String>) -> Result<String> {
    match kind {
        ParserKind::Json | ParserKind::Unpack => Ok("unpack_json".to_string()),
        ParserKind::Logfmt => Ok("unpack_logfmt".to_string()),
        ParserKind::Regexp => Ok(format!("extract_regexp {}", quote_string(parser_param(kind, param)?))),
        ParserKind::Pattern => Ok(format!("extract {}", quote_string(parser_param(kind, param)?))),
    }
}

fn parser_param(kind: ParserKind, param: &Option<String>) -> Result<&str> {
    param.as_deref().ok_or_else(|| {
        TranslationError::invalid(format!("LogQL {} parser requires an expression", kind.name()))
    })
}

fn check_logfmt_flags(flags: &LogfmtFlags) -> Result<()> {
    if *flags == LogfmtFlags::default() {
        return Ok(());
    }
    Err(TranslationError::unsupported_with_help(
        format!("LogQL logfmt flags ({}) aren't supported", flags.to_string().trim()),
        "remove the flags; unpack_logfmt always extracts every key",
    ))
}

fn apply_field_extraction(
    b: PipelineBuilder,
    unpack: &str,
    fields: &[FieldExtraction],
) -> Result<PipelineBuilder> {
    for field in fields {
        if !is_simple_field_path(&field.expression) {
            return Err(TranslationError::unsupported_with_help(
                format!(
                    "json/logfmt field extraction with expression {:?} isn't supported; only simple field paths are",
                    field.expression
                ),
                FIELD_EXTRACTION_HELP,
            ));
        }
    }

    let expressions: Vec<&str> = fields.iter().map(|f| f.expression.as_str()).unique().collect();
    let mut b = if expressions.is_empty() {
        b.pipe(unpack)
    } else {
        b.pipe(format!(
            "{unpack} fields ({})",
            expressions.iter().map(|e| quote_identifier_if_needed(e)).join(", ")
        ))
    };

    let renames = fields
        .iter()
        .filter(|f| f.identifier != f.expression)
        .map(|f| (f.expression.as_str(), f.identifier.as_str()))
        .unique();
    for (expression, identifier) in renames {
        b = b.pipe(format!(
            "format {} as {}",
            quote_string(&format!("<{expression}>")),
            quote_identifier_if_needed(identifier)
        ));
    }

    // a source field survives only if some entry writes a field of that name
    let identifiers: HashSet<&str> = fields.iter().map(|f| f.identifier.as_str()).collect();
    let dropped: Vec<String> = expressions
        .iter()
        .filter(|e| !identifiers.contains(*e))
        .map(|e| quote_identifier_if_needed(e))
        .collect();
    if !dropped.is_empty() {
        b = b.pipe(format!("delete {}", dropped.join(", ")));
    }
    Ok(b)
}

fn is_simple_field_path(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'-'))
}

// ============================================================================
// Label manipulation
// ============================================================================

fn apply_drop(b: PipelineBuilder, items: &[LabelItem]) -> PipelineBuilder {
    let mut b = b;
    let mut batch: Vec<String> = Vec::new();
    for item in items {
        match item {
            LabelItem::Name(name) => batch.push(quote_identifier_if_needed(name)),
            LabelItem::Matcher(m) => {
                if !batch.is_empty() {
                    b = b.pipe(format!("delete {}", batch.join(", ")));
                    batch.clear();
                }
                b = b.pipe(conditional_format(m, ""));
            }
        }
    }
    if !batch.is_empty() {
        b = b.pipe(format!("delete {}", batch.join(", ")));
    }
    b
}

fn apply_keep(b: PipelineBuilder, items: &[LabelItem]) -> Result<PipelineBuilder> {
    let mut names: Vec<&str> = Vec::new();
    for item in items {
        let name = match item {
            LabelItem::Name(name) => {
                if name.contains(['=', '~', '!', '"', '`']) {
                    return Err(TranslationError::unsupported_with_help(
                        format!("LogQL keep item {name:?} isn't a label name or a matcher"),
                        "use 'name' or 'name=\"value\"' items",
                    ));
                }
                name.as_str()
            }
            LabelItem::Matcher(m) => m.name.as_str(),
        };
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let mut b = b;
    if !names.is_empty() {
        b = b.pipe(format!(
            "keep {}",
            names.iter().map(|n| quote_identifier_if_needed(n)).join(", ")
        ));
    }
    for item in items {
        if let LabelItem::Matcher(m) = item {
            b = b.pipe(conditional_format(m, &format!("<{}>", m.name)));
        }
    }
    Ok(b)
}

/// `format if (<cond>) "<pattern>" as <name>`
fn conditional_format(m: &Matcher, pattern: &str) -> String {
    format!(
        "format if ({}) {} as {}",
        translate_matcher(m),
        quote_string(pattern),
        quote_identifier_if_needed(&m.name)
    )
}

fn apply_label_format(b: PipelineBuilder, entries: &[LabelFormatEntry]) -> Result<PipelineBuilder> {
    let mut b = b;
    let mut renames = Vec::new();
    for entry in entries {
        if entry.rename {
            renames.push(format!(
                "{} as {}",
                quote_identifier_if_needed(&entry.value),
                quote_identifier_if_needed(&entry.name)
            ));
            continue;
        }
        let pattern = convert_template(&entry.value)?;
        b = b.pipe(format!(
            "format {} as {}",
            quote_string(&pattern),
            quote_identifier_if_needed(&entry.name)
        ));
    }
    if !renames.is_empty() {
        b = b.pipe(format!("rename {}", renames.join(", ")));
    }
    Ok(b)
}
