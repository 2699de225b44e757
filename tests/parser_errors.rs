use logql_to_logsql::parser::{ParseError, QueryParser};
use logql_to_logsql::{parse_query, ErrorKind};
use miette::SourceSpan;

fn span_of(err: &ParseError) -> SourceSpan {
    match err {
        ParseError::Syntax { span, .. }
        | ParseError::InvalidEscape { span, .. }
        | ParseError::UnterminatedEscape { span, .. }
        | ParseError::InvalidValue { span, .. }
        | ParseError::NestingTooDeep { span, .. }
        | ParseError::FilterTooDeep { span, .. } => *span,
        ParseError::Internal { message, .. } => panic!("internal error: {message}"),
    }
}

// ==============================================================================

#[test]
fn test_malformed_queries_fail_to_parse() {
    let examples = [
        r#"{app="nginx""#,
        r#"{app=nginx}"#,
        r#"{app="nginx"} |= error"#,
        r#"{app="nginx"} | json |"#,
        r#"{app="nginx"} | unknown_stage"#,
        r#"{app="nginx"} | status >"#,
        r#"rate({app="nginx"})"#,
        r#"rate({app="nginx"}[5m]"#,
        r#"sum by (a (rate({app="x"}[5m]))"#,
        r#"count_over_time({app="x"}[5x])"#,
        r#"app="nginx""#,
    ];
    for input in examples {
        let err = parse_query(input).expect_err(&format!("{input:?} should fail"));
        assert_eq!(err.kind(), ErrorKind::ParseFailure, "{input}");
        assert_eq!(err.status_code(), 400);
        assert!(err.parse_cause().is_some(), "{input}: no parse cause");
    }
}

#[test]
fn test_unterminated_string() {
    let err = QueryParser::parse_expr(r#"{app="nginx}"#).unwrap_err();
    let ParseError::Syntax { line, col, .. } = &err else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert_eq!(*line, 1);
    assert!(*col > 1);
}

#[test]
fn test_syntax_error_span_is_never_empty() {
    for input in [r#"{app="x"} |"#, r#"{app="x"} | json | a >"#, "{", "rate("] {
        let err = QueryParser::parse_expr(input).unwrap_err();
        let span = span_of(&err);
        assert!(span.len() >= 1, "{input}: empty span");
        assert!(span.offset() + span.len() <= input.len(), "{input}: span past end");
    }
}

#[test]
fn test_syntax_error_help() {
    let err = QueryParser::parse_expr(r#"{app=}"#).unwrap_err();
    let ParseError::Syntax {
        help, expected_msg, ..
    } = &err
    else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert!(expected_msg.contains("quoted string"), "{expected_msg}");
    assert!(help.is_some());
}

#[test]
fn test_invalid_escape_points_at_backslash() {
    let input = r#"{app="a\qb"}"#;
    let err = QueryParser::parse_expr(input).unwrap_err();
    assert!(matches!(err, ParseError::InvalidEscape { char: 'q', .. }), "{err:?}");
    let span = span_of(&err);
    assert_eq!(&input[span.offset()..span.offset() + span.len()], r"\q");
}

#[test]
fn test_invalid_literals() {
    let examples = [
        // K must be an integer
        r#"topk(2.5, rate({app="x"}[5m]))"#,
        // only quantile_over_time takes a parameter
        r#"rate(0.5, {app="x"}[5m])"#,
        r#"sum(3, rate({app="x"}[5m]))"#,
        // octal escape out of range
        r#"{app="\777"}"#,
        r#"{app="\uD800"}"#,
    ];
    for input in examples {
        let err = QueryParser::parse_expr(input).unwrap_err();
        assert!(
            matches!(err, ParseError::InvalidValue { .. }),
            "{input}: {err:?}"
        );
    }
}

#[test]
fn test_parse_failure_wraps_cause() {
    let err = parse_query(r#"{app="x"} |= ip(10)"#).unwrap_err();
    assert_eq!(err.message(), "failed to parse LogQL");
    assert!(std::error::Error::source(&err).is_some());
}
