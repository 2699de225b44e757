//! LogQL text → expression tree
//!
//! A pest grammar (`grammar.pest`) produces the parse tree, which is
//! lowered into [`crate::ast::Expr`]. Syntax errors carry the source text
//! and a labelled span for miette rendering.

pub mod error;
mod literal;
mod query;

pub use error::ParseError;
pub use literal::{parse_bytes, parse_duration, unquote};
pub use query::{QueryParser, Rule, MAX_NESTING_DEPTH};

use crate::ast::Expr;
use crate::error::TranslationError;
use crate::translate::DEFAULT_MAX_FILTER_DEPTH;

/// Parse a LogQL query.
///
/// A query starting with `|` has no stream selector; it is parsed as if it
/// began with `{}`.
pub fn parse_query(query: &str) -> Result<Expr, TranslationError> {
    parse_query_with_depth(query, DEFAULT_MAX_FILTER_DEPTH)
}

/// [`parse_query`] with a custom ceiling on label filter `and`/`or` nesting
pub fn parse_query_with_depth(
    query: &str,
    max_filter_depth: usize,
) -> Result<Expr, TranslationError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(TranslationError::parse("logql query is required", None));
    }

    let expr = if query.starts_with('|') {
        QueryParser::parse_expr_with_depth(&format!("{{}} {query}"), max_filter_depth)?
    } else {
        QueryParser::parse_expr_with_depth(query, max_filter_depth)?
    };
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LogSelectorExpr, Stage};
    use crate::error::ErrorKind;

    #[test]
    fn test_empty_query_is_rejected() {
        for q in ["", "   ", "\n\t"] {
            let err = parse_query(q).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ParseFailure);
            assert_eq!(err.message(), "logql query is required");
            assert!(err.parse_cause().is_none());
        }
    }

    #[test]
    fn test_leading_pipe_gets_empty_selector() {
        let expr = parse_query(r#"|= "error""#).unwrap();
        let Expr::Log(LogSelectorExpr::Pipeline(p)) = expr else {
            panic!("expected a pipeline, got {expr:?}");
        };
        assert!(p.selector.matchers.is_empty());
        assert!(matches!(p.stages.as_slice(), [Stage::LineFilter(_)]));
    }

    #[test]
    fn test_filter_depth_is_checked_while_parsing() {
        let chain = format!(r#"{{}} | a="1"{}"#, r#" and a="1""#.repeat(200_000));
        let err = parse_query(&chain).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert_eq!(
            err.message(),
            "label filter nesting exceeds the maximum depth of 64"
        );

        let err = parse_query_with_depth(&chain, usize::MAX).unwrap_err();
        assert_eq!(
            err.message(),
            format!("label filter nesting exceeds the maximum depth of {MAX_NESTING_DEPTH}")
        );

        assert!(parse_query_with_depth(r#"{} | a="1" and (b="2" or c="3")"#, 2).is_ok());
        assert!(parse_query_with_depth(r#"{} | a="1" and (b="2" or c="3")"#, 1).is_err());
    }

    #[test]
    fn test_deep_brackets_are_rejected_before_parsing() {
        let depth = 10 * MAX_NESTING_DEPTH;
        let nested = format!(r#"{{}} | {}a="1"{}"#, "(".repeat(depth), ")".repeat(depth));
        let err = parse_query(&nested).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(matches!(
            err.parse_cause(),
            Some(ParseError::NestingTooDeep { limit: MAX_NESTING_DEPTH, .. })
        ));

        let depth = MAX_NESTING_DEPTH - 1;
        let nested = format!(r#"{{}} | {}a="1"{}"#, "(".repeat(depth), ")".repeat(depth));
        assert!(parse_query(&nested).is_ok());

        let quoted = format!(r#"{{app="{}"}}"#, "(".repeat(depth * 2));
        assert!(parse_query(&quoted).is_ok());
    }

    #[test]
    fn test_syntax_error_has_cause() {
        let err = parse_query(r#"{app="nginx""#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(matches!(err.parse_cause(), Some(ParseError::Syntax { .. })));
    }
}
