//! Pipeline stages

use std::fmt;

use itertools::Itertools;

use super::label_filter::{LabelFilter, Matcher};
use super::operators::LineMatchType;
use super::quote;

/// Right-hand side of a line filter
#[derive(Debug, Clone, PartialEq)]
pub enum LineFilterValue {
    Literal(String),
    /// `ip("...")` line filter function
    Ip(String),
}

/// One line filter with its `or` siblings, e.g. `|= "a" or "b"`.
/// Siblings share the filter kind of the first leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFilter {
    pub ty: LineMatchType,
    pub value: LineFilterValue,
    pub or: Vec<LineFilterValue>,
}

impl LineFilter {
    pub fn new(ty: LineMatchType, value: impl Into<String>) -> Self {
        Self {
            ty,
            value: LineFilterValue::Literal(value.into()),
            or: Vec::new(),
        }
    }

    pub fn or(mut self, value: impl Into<String>) -> Self {
        self.or.push(LineFilterValue::Literal(value.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Json,
    Logfmt,
    Regexp,
    Pattern,
    Unpack,
}

impl ParserKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParserKind::Json => "json",
            ParserKind::Logfmt => "logfmt",
            ParserKind::Regexp => "regexp",
            ParserKind::Pattern => "pattern",
            ParserKind::Unpack => "unpack",
        }
    }
}

/// `logfmt` parser flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogfmtFlags {
    pub strict: bool,
    pub keep_empty: bool,
}

/// `drop`/`keep` item: a bare label name or a conditional matcher
#[derive(Debug, Clone, PartialEq)]
pub enum LabelItem {
    Name(String),
    Matcher(Matcher),
}

/// `label_format` entry: `dst=src` (rename) or `dst="template"`
#[derive(Debug, Clone, PartialEq)]
pub struct LabelFormatEntry {
    pub name: String,
    pub value: String,
    pub rename: bool,
}

/// `json`/`logfmt` field parameter: `identifier="expression"`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExtraction {
    pub identifier: String,
    pub expression: String,
}

impl FieldExtraction {
    pub fn new(identifier: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            expression: expression.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Consecutive line filters, in source order, joined by implicit AND
    LineFilter(Vec<LineFilter>),
    LabelFilter(LabelFilter),
    /// `json`, `logfmt`, `regexp "..."`, `pattern "..."`, `unpack`
    LineParser {
        kind: ParserKind,
        param: Option<String>,
    },
    /// `logfmt` carrying flags
    LogfmtParser(LogfmtFlags),
    Decolorize,
    DropLabels(Vec<LabelItem>),
    KeepLabels(Vec<LabelItem>),
    LineFormat(String),
    LabelFormat(Vec<LabelFormatEntry>),
    JsonFieldParser(Vec<FieldExtraction>),
    LogfmtFieldParser {
        flags: LogfmtFlags,
        fields: Vec<FieldExtraction>,
    },
}

impl Stage {
    /// Short name of the stage kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stage::LineFilter(_) => "line filter",
            Stage::LabelFilter(_) => "label filter",
            Stage::LineParser { .. } => "parser",
            Stage::LogfmtParser(_) => "logfmt",
            Stage::Decolorize => "decolorize",
            Stage::DropLabels(_) => "drop",
            Stage::KeepLabels(_) => "keep",
            Stage::LineFormat(_) => "line_format",
            Stage::LabelFormat(_) => "label_format",
            Stage::JsonFieldParser(_) => "json field extraction",
            Stage::LogfmtFieldParser { .. } => "logfmt field extraction",
        }
    }
}

impl fmt::Display for LineFilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineFilterValue::Literal(s) => f.write_str(&quote(s)),
            LineFilterValue::Ip(s) => write!(f, "ip({})", quote(s)),
        }
    }
}

impl fmt::Display for LineFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.value)?;
        for value in &self.or {
            write!(f, " or {value}")?;
        }
        Ok(())
    }
}

impl fmt::Display for LabelItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelItem::Name(name) => f.write_str(name),
            LabelItem::Matcher(m) => write!(f, "{m}"),
        }
    }
}

impl fmt::Display for FieldExtraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.identifier, quote(&self.expression))
    }
}

impl fmt::Display for LogfmtFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.strict {
            f.write_str(" --strict")?;
        }
        if self.keep_empty {
            f.write_str(" --keep-empty")?;
        }
        Ok(())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::LineFilter(filters) => write!(f, "{}", filters.iter().join(" ")),
            Stage::LabelFilter(filter) => write!(f, "| {filter}"),
            Stage::LineParser { kind, param } => match param {
                Some(p) => write!(f, "| {} {}", kind.name(), quote(p)),
                None => write!(f, "| {}", kind.name()),
            },
            Stage::LogfmtParser(flags) => write!(f, "| logfmt{flags}"),
            Stage::Decolorize => f.write_str("| decolorize"),
            Stage::DropLabels(items) => write!(f, "| drop {}", items.iter().join(", ")),
            Stage::KeepLabels(items) => write!(f, "| keep {}", items.iter().join(", ")),
            Stage::LineFormat(template) => write!(f, "| line_format {}", quote(template)),
            Stage::LabelFormat(entries) => {
                let entries = entries.iter().map(|e| {
                    if e.rename {
                        format!("{}={}", e.name, e.value)
                    } else {
                        format!("{}={}", e.name, quote(&e.value))
                    }
                });
                write!(f, "| label_format {}", entries.format(", "))
            }
            Stage::JsonFieldParser(fields) => write!(f, "| json {}", fields.iter().join(", ")),
            Stage::LogfmtFieldParser { flags, fields } => {
                write!(f, "| logfmt{flags} {}", fields.iter().join(", "))
            }
        }
    }
}
