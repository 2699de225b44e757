use logql_to_logsql::{translate_query, ErrorKind, QueryKind};

fn check_stats(examples: Vec<(&str, &str)>) {
    for (input, expected) in examples.into_iter() {
        let info = translate_query(input)
            .unwrap_or_else(|e| panic!("failed to translate {input:?}: {e}"));
        assert_eq!(info.kind, QueryKind::Stats, "kind for {input:?}");
        assert_eq!(info.text, expected, "translation of {input:?}");
    }
}

#[test]
fn test_range_aggregations() {
    check_stats(vec![
        (
            r#"rate({app="nginx"}[5m])"#,
            r#"{app="nginx"} _time:5m | stats by (_stream) rate() as value"#,
        ),
        (
            r#"count_over_time({app="nginx"}[1h])"#,
            r#"{app="nginx"} _time:1h | stats by (_stream) count() as value"#,
        ),
        (
            r#"count_over_time({app="nginx"}[1h] offset 30m)"#,
            r#"{app="nginx"} _time:1h offset 30m | stats by (_stream) count() as value"#,
        ),
        (
            r#"count_over_time({app="nginx"} |= "error" | json [5m])"#,
            r#"{app="nginx"} _time:5m "error" | unpack_json | stats by (_stream) count() as value"#,
        ),
        (
            r#"count_over_time({app="nginx"}[5m] |= "error")"#,
            r#"{app="nginx"} _time:5m "error" | stats by (_stream) count() as value"#,
        ),
        (
            r#"count_over_time({app="nginx"}[5m]) by (host)"#,
            r#"{app="nginx"} _time:5m | stats by (host) count() as value"#,
        ),
        (
            r#"avg_over_time({app="x"} | json | unwrap latency [5m])"#,
            r#"{app="x"} _time:5m | unpack_json | stats by (_stream) avg(latency) as value"#,
        ),
        (
            r#"max_over_time({app="x"} | logfmt | unwrap duration(took) [1m])"#,
            r#"{app="x"} _time:1m | unpack_logfmt | stats by (_stream) max(took) as value"#,
        ),
        (
            r#"sum_over_time({app="x"} | json | unwrap bytes | __error__="" [5m])"#,
            r#"{app="x"} _time:5m | unpack_json | filter __error__:="" | stats by (_stream) sum(bytes) as value"#,
        ),
        (
            r#"quantile_over_time(0.99, {app="x"} | json | unwrap latency [10m]) by (path)"#,
            r#"{app="x"} _time:10m | unpack_json | stats by (path) quantile(0.99, latency) as value"#,
        ),
    ]);
}

#[test]
fn test_vector_aggregations() {
    check_stats(vec![
        (
            r#"sum(rate({app="nginx"}[5m]))"#,
            r#"{app="nginx"} _time:5m | stats rate() as value"#,
        ),
        (
            r#"sum by (severity) (rate({app="nginx"}[5m]))"#,
            r#"{app="nginx"} _time:5m | stats by (severity) rate() as value"#,
        ),
        (
            r#"sum(rate({app="nginx"}[5m])) by (severity, host)"#,
            r#"{app="nginx"} _time:5m | stats by (severity, host) rate() as value"#,
        ),
        (
            r#"sum by () (count_over_time({app="nginx"}[5m]))"#,
            r#"{app="nginx"} _time:5m | stats count() as value"#,
        ),
        (
            r#"sum without () (count_over_time({app="nginx"}[5m]))"#,
            r#"{app="nginx"} _time:5m | stats by (_stream) count() as value"#,
        ),
        (
            r#"topk(5, sum by (severity) (rate({app="nginx"}[5m])))"#,
            r#"{app="nginx"} _time:5m | stats by (severity) rate() as value | first 5 (value desc)"#,
        ),
        (
            r#"bottomk(3, count_over_time({app="nginx"}[5m]))"#,
            r#"{app="nginx"} _time:5m | stats by (_stream) count() as value | first 3 (value)"#,
        ),
        (
            r#"(sum by (level) ((rate({app="nginx"}[5m]))))"#,
            r#"{app="nginx"} _time:5m | stats by (level) rate() as value"#,
        ),
    ]);
}

#[test]
fn test_invalid_semantics() {
    let examples = vec![
        r#"topk(0, rate({app="x"}[5m]))"#,
        r#"bottomk(-2, rate({app="x"}[5m]))"#,
        r#"topk(rate({app="x"}[5m]))"#,
        r#"quantile_over_time({app="x"} | unwrap latency [5m])"#,
    ];
    for input in examples {
        let err = translate_query(input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSemantics, "{input}: {err}");
        assert_eq!(err.status_code(), 400);
    }
}
