use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use super::query::Rule;

/// Parse failure with source location, rendered through miette
#[allow(dead_code)] // Fields are used by miette's derive macros
#[derive(Debug, Clone, Diagnostic, Error)]
pub enum ParseError {
    #[error("Syntax error at line {line}, column {col}")]
    #[diagnostic(code(logql::syntax))]
    Syntax {
        #[source_code]
        src: String,
        #[label("{expected_msg}")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
        expected_msg: String,
        line: usize,
        col: usize,
    },

    #[error("Invalid escape sequence '\\{char}'")]
    #[diagnostic(
        code(logql::invalid_escape),
        help("Valid escapes: \\a \\b \\f \\n \\r \\t \\v \\\\ \\\" \\xNN \\uNNNN \\UNNNNNNNN \\NNN, or use a `backtick` string")
    )]
    InvalidEscape {
        char: char,
        #[label("invalid escape")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("Unterminated escape sequence")]
    #[diagnostic(code(logql::unterminated_escape))]
    UnterminatedEscape {
        #[label("escape sequence not completed")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("Expected {expected}, found: {found}")]
    #[diagnostic(code(logql::invalid_value))]
    InvalidValue {
        expected: String,
        found: String,
        #[label("invalid value")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("Brackets nested deeper than {limit} levels")]
    #[diagnostic(code(logql::nesting_too_deep))]
    NestingTooDeep {
        limit: usize,
        #[label("too deep")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("Label filter nesting exceeds the maximum depth of {limit}")]
    #[diagnostic(code(logql::filter_too_deep))]
    FilterTooDeep {
        limit: usize,
        #[label("nested too deep")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },

    #[error("Internal parser error: {message}")]
    #[diagnostic(code(logql::internal))]
    Internal {
        message: String,
        #[source_code]
        src: String,
    },
}

pub trait SpanExt {
    fn to_source_span(&self) -> SourceSpan;
}

impl SpanExt for pest::Span<'_> {
    #[inline]
    fn to_source_span(&self) -> SourceSpan {
        (self.start(), self.end() - self.start()).into()
    }
}

/// Convert pest Rule enum to user-friendly names
fn rule_to_friendly_name(rule: &Rule) -> &'static str {
    match rule {
        Rule::query => "query",
        Rule::log_expr => "log query",
        Rule::selector => "stream selector '{...}'",
        Rule::matcher => "label matcher",
        Rule::match_op => "match operator (=, !=, =~, !~)",
        Rule::label_name => "label name",
        Rule::string => "quoted string",
        Rule::dq_inner | Rule::bq_inner => "string content",
        Rule::number => "number",
        Rule::duration => "duration (e.g. 5m)",
        Rule::bytes => "byte size (e.g. 10KB)",
        Rule::line_filter => "line filter",
        Rule::line_filter_op => "line filter (|=, !=, |~, !~)",
        Rule::line_filter_value => "line filter value",
        Rule::ip_fn => "ip(\"...\")",
        Rule::json_parser
        | Rule::logfmt_parser
        | Rule::regexp_parser
        | Rule::pattern_parser
        | Rule::unpack_parser => "parser stage",
        Rule::field_params | Rule::field_param => "field extraction",
        Rule::logfmt_flag => "logfmt flag",
        Rule::label_filter | Rule::label_filter_expr => "label filter",
        Rule::lf_and => "and",
        Rule::lf_or | Rule::kw_or => "or",
        Rule::ip_filter
        | Rule::duration_filter
        | Rule::bytes_filter
        | Rule::number_filter
        | Rule::string_filter => "label comparison",
        Rule::cmp_op | Rule::filter_match_op => "comparison operator",
        Rule::range_agg => "range aggregation",
        Rule::range_op => "range function (rate, count_over_time, ...)",
        Rule::vector_agg => "vector aggregation",
        Rule::vector_op => "aggregation operator (sum, topk, ...)",
        Rule::log_range => "log range",
        Rule::range => "range '[...]'",
        Rule::offset | Rule::kw_offset => "offset",
        Rule::unwrap | Rule::kw_unwrap => "unwrap",
        Rule::unwrap_target => "unwrap label",
        Rule::grouping => "grouping (by/without)",
        Rule::EOI => "end of input",
        _ => "token",
    }
}

/// Generate contextual help text based on error patterns
fn generate_help_text(positives: &[Rule], found_eoi: bool) -> Option<String> {
    if positives.is_empty() {
        return None;
    }

    if positives.contains(&Rule::string) {
        if found_eoi {
            return Some("Add a quoted value, like: app=\"nginx\"".to_string());
        }
        return Some("Values must be quoted with \"...\" or `...`".to_string());
    }

    if positives.contains(&Rule::range) {
        return Some("Range functions need a window, like: rate({app=\"x\"}[5m])".to_string());
    }

    if positives.contains(&Rule::selector) {
        return Some("Queries start with a stream selector, like: {app=\"nginx\"}".to_string());
    }

    if positives.contains(&Rule::EOI) {
        return Some(
            "Unexpected input. Check for unbalanced parentheses, braces or quotes.".to_string(),
        );
    }

    None
}

impl ParseError {
    /// Create a syntax error from pest error with diagnostic information
    pub fn from_pest(pest_err: Box<pest::error::Error<Rule>>, src: String) -> Self {
        use pest::error::{ErrorVariant, InputLocation};

        // miette needs a non-zero width to draw the arrow
        let span: SourceSpan = match pest_err.location {
            InputLocation::Pos(pos) => {
                if pos >= src.len() && pos > 0 {
                    (pos - 1, 1).into()
                } else if pos < src.len() {
                    (pos, 1).into()
                } else {
                    (0, 0).into()
                }
            }
            InputLocation::Span((start, end)) => (start, end.saturating_sub(start).max(1)).into(),
        };

        let (line, col) = match pest_err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };

        let (expected_msg, help) = match &pest_err.variant {
            ErrorVariant::ParsingError {
                positives,
                negatives: _,
            } => {
                let found_eoi = match pest_err.location {
                    InputLocation::Pos(p) => p >= src.len(),
                    InputLocation::Span((_, end)) => end >= src.len(),
                };

                let mut names: Vec<&str> = positives.iter().map(rule_to_friendly_name).collect();
                names.dedup();
                let expected_msg = match names.len() {
                    0 => "Unexpected input".to_string(),
                    1 => format!("Expected {}", names[0]),
                    2..=3 => format!("Expected one of: {}", names.join(", ")),
                    _ => format!("Expected one of: {}, ...", names[..3].join(", ")),
                };

                (expected_msg, generate_help_text(positives, found_eoi))
            }
            ErrorVariant::CustomError { message } => (message.clone(), None),
        };

        ParseError::Syntax {
            src,
            span,
            help,
            expected_msg,
            line,
            col,
        }
    }

    pub fn invalid_value(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: SourceSpan,
        src: &str,
    ) -> Self {
        ParseError::InvalidValue {
            expected: expected.into(),
            found: found.into(),
            span,
            src: src.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        ParseError::Internal {
            message: msg.into(),
            src: String::new(),
        }
    }
}
