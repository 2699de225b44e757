//! Range and vector aggregations to LogsQL `stats` pipes

use std::time::Duration;

use itertools::Itertools;

use crate::ast::duration::format_compact;
use crate::ast::{Grouping, RangeAggregation, RangeOp, SampleExpr, VectorAggregation, VectorOp};
use crate::error::{Result, TranslationError};

use super::builder::PipelineBuilder;
use super::filter::{format_float, translate_label_filter};
use super::quoting::quote_identifier_if_needed;
use super::selector::render_stream_selector;
use super::stage::apply_stage;
use super::TranslateOptions;

pub fn translate_sample_expr(expr: &SampleExpr, options: &TranslateOptions) -> Result<String> {
    match expr {
        SampleExpr::Range(r) => translate_range_aggregation(r, None, options),
        SampleExpr::Vector(v) => translate_vector_aggregation(v, options),
    }
}

fn translate_vector_aggregation(
    v: &VectorAggregation,
    options: &TranslateOptions,
) -> Result<String> {
    match v.operation {
        VectorOp::Sum => match v.inner.as_ref() {
            SampleExpr::Range(r) => translate_range_aggregation(r, v.grouping.as_ref(), options),
            SampleExpr::Vector(_) => Err(TranslationError::unsupported_with_help(
                "only sum(<range_aggregation>) is supported for now",
                "apply the grouping directly to the range aggregation, e.g. sum by (x) (rate(...))",
            )),
        },
        VectorOp::Topk | VectorOp::Bottomk => {
            let inner = translate_sample_expr(&v.inner, options)?;
            if let Some(grouping) = &v.grouping {
                if !grouping.is_singleton() {
                    return Err(TranslationError::unsupported(format!(
                        "topk/bottomk with grouping '{grouping}' isn't supported yet"
                    )));
                }
            }
            let k = match v.param {
                Some(k) if k > 0 => k,
                Some(k) => {
                    return Err(TranslationError::invalid(format!(
                        "{} requires a positive K, got {k}",
                        v.operation.name()
                    )))
                }
                None => {
                    return Err(TranslationError::invalid(format!(
                        "{} requires a K parameter",
                        v.operation.name()
                    )))
                }
            };
            // ties keep whatever order LogsQL gives equal `value`s
            let order = if v.operation == VectorOp::Topk {
                "value desc"
            } else {
                "value"
            };
            Ok(format!("{inner} | first {k} ({order})"))
        }
        other => Err(TranslationError::unsupported(format!(
            "unsupported LogQL vector aggregation {:?}",
            other.name()
        ))),
    }
}

/// `_time` filters take whole milliseconds at most
fn time_window(d: Duration, what: &str) -> Result<String> {
    if d.subsec_nanos() % 1_000_000 != 0 {
        return Err(TranslationError::unsupported(format!(
            "{what} {} is finer than a millisecond",
            format_compact(d)
        )));
    }
    Ok(format_compact(d))
}

/// `grouping` overrides the aggregation's own `by (...)`, if any
fn translate_range_aggregation(
    r: &RangeAggregation,
    grouping: Option<&Grouping>,
    options: &TranslateOptions,
) -> Result<String> {
    let range = &r.range;
    let mut time_filter = format!("_time:{}", time_window(range.interval, "range")?);
    if let Some(offset) = range.offset {
        time_filter.push_str(&format!(" offset {}", time_window(offset, "offset")?));
    }

    let b = PipelineBuilder::new(render_stream_selector(range.selector.selector()))
        .filter(time_filter);
    let b = range
        .selector
        .stages()
        .iter()
        .try_fold(b, |b, stage| apply_stage(b, stage, options))?;

    let post_filters = range
        .unwrap
        .iter()
        .flat_map(|u| &u.post_filters)
        .map(|f| translate_label_filter(f, options.max_filter_depth))
        .collect::<Result<Vec<_>>>()?;
    let b = b.filters(post_filters);

    let by = group_by_fields(grouping.or(r.grouping.as_ref()))?;
    let stats = stats_function(r)?;

    let b = match by {
        Some(fields) => b.pipe(format!("stats by ({}) {stats}", fields.join(", "))),
        None => b.pipe(format!("stats {stats}")),
    };
    Ok(b.finish())
}

/// `None` means a single group over everything
fn group_by_fields(grouping: Option<&Grouping>) -> Result<Option<Vec<String>>> {
    match grouping {
        None | Some(Grouping::Noop) => Ok(Some(vec!["_stream".to_string()])),
        Some(Grouping::Singleton) => Ok(None),
        Some(Grouping::By(names)) if names.is_empty() => Ok(None),
        Some(Grouping::By(names)) => Ok(Some(
            names.iter().map(|n| quote_identifier_if_needed(n)).collect(),
        )),
        Some(Grouping::Without(names)) => Err(TranslationError::unsupported_with_help(
            format!(
                "grouping 'without({})' isn't supported yet",
                names.iter().join(", ")
            ),
            "list the labels to keep with 'by (...)' instead",
        )),
    }
}

fn stats_function(r: &RangeAggregation) -> Result<String> {
    let unwrap = r.range.unwrap.as_ref();
    let op = r.operation;
    match op {
        RangeOp::Rate | RangeOp::Count => {
            if unwrap.is_some() {
                return Err(TranslationError::unsupported(format!(
                    "{}(...| unwrap ...) isn't supported yet",
                    op.name()
                )));
            }
            Ok(if op == RangeOp::Rate {
                "rate() as value".to_string()
            } else {
                "count() as value".to_string()
            })
        }
        RangeOp::Avg | RangeOp::Sum | RangeOp::Min | RangeOp::Max => {
            let unwrap = unwrap.ok_or_else(|| {
                TranslationError::unsupported_with_help(
                    format!("{} without unwrap isn't supported", op.name()),
                    "add '| unwrap <field>' before the range",
                )
            })?;
            let func = match op {
                RangeOp::Avg => "avg",
                RangeOp::Sum => "sum",
                RangeOp::Min => "min",
                _ => "max",
            };
            Ok(format!(
                "{func}({}) as value",
                quote_identifier_if_needed(&unwrap.identifier)
            ))
        }
        RangeOp::Quantile => {
            let unwrap = unwrap.ok_or_else(|| {
                TranslationError::unsupported_with_help(
                    "quantile_over_time without unwrap isn't supported",
                    "add '| unwrap <field>' before the range",
                )
            })?;
            let phi = r.param.ok_or_else(|| {
                TranslationError::invalid("quantile_over_time requires a quantile parameter")
            })?;
            Ok(format!(
                "quantile({}, {}) as value",
                format_float(phi),
                quote_identifier_if_needed(&unwrap.identifier)
            ))
        }
        other => Err(TranslationError::unsupported(format!(
            "unsupported LogQL range aggregation {:?}",
            other.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LogRange, LogSelectorExpr, MatchOp, Matcher, StreamSelector, Unwrap};
    use crate::error::ErrorKind;
    use std::time::Duration;

    fn nginx_range(operation: RangeOp, unwrap: Option<Unwrap>) -> RangeAggregation {
        RangeAggregation {
            operation,
            param: None,
            range: LogRange {
                selector: LogSelectorExpr::Matchers(StreamSelector::new(vec![Matcher::new(
                    "app",
                    MatchOp::Eq,
                    "nginx",
                )])),
                interval: Duration::from_secs(300),
                offset: None,
                unwrap,
            },
            grouping: None,
        }
    }

    fn translate(r: RangeAggregation) -> Result<String> {
        translate_sample_expr(&SampleExpr::Range(r), &TranslateOptions::default())
    }

    #[test]
    fn test_rate_groups_by_stream() {
        assert_eq!(
            translate(nginx_range(RangeOp::Rate, None)).unwrap(),
            r#"{app="nginx"} _time:5m | stats by (_stream) rate() as value"#
        );
    }

    #[test]
    fn test_offset_extends_time_filter() {
        let mut r = nginx_range(RangeOp::Count, None);
        r.range.offset = Some(Duration::from_secs(3600));
        assert_eq!(
            translate(r).unwrap(),
            r#"{app="nginx"} _time:5m offset 1h | stats by (_stream) count() as value"#
        );
    }

    #[test]
    fn test_sub_millisecond_windows_are_rejected() {
        let mut r = nginx_range(RangeOp::Count, None);
        r.range.interval = Duration::from_micros(500);
        let err = translate(r.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert_eq!(err.message(), "range 500us is finer than a millisecond");

        r.range.interval = Duration::from_millis(1500);
        r.range.offset = Some(Duration::from_nanos(1_000_100));
        let err = translate(r).unwrap_err();
        assert_eq!(err.message(), "offset 1ms100ns is finer than a millisecond");
    }

    #[test]
    fn test_unwrap_functions() {
        for (op, func) in [
            (RangeOp::Avg, "avg"),
            (RangeOp::Sum, "sum"),
            (RangeOp::Min, "min"),
            (RangeOp::Max, "max"),
        ] {
            let r = nginx_range(op, Some(Unwrap::new("latency")));
            assert_eq!(
                translate(r).unwrap(),
                format!(r#"{{app="nginx"}} _time:5m | stats by (_stream) {func}(latency) as value"#)
            );
            let err = translate(nginx_range(op, None)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        }
        let err = translate(nginx_range(RangeOp::Rate, Some(Unwrap::new("x")))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn test_quantile_requirements() {
        let mut r = nginx_range(RangeOp::Quantile, Some(Unwrap::new("latency")));
        let err = translate(r.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSemantics);

        r.param = Some(0.99);
        assert_eq!(
            translate(r).unwrap(),
            r#"{app="nginx"} _time:5m | stats by (_stream) quantile(0.99, latency) as value"#
        );

        let mut r = nginx_range(RangeOp::Quantile, None);
        r.param = Some(0.5);
        assert_eq!(translate(r).unwrap_err().kind(), ErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn test_grouping_modes() {
        assert_eq!(group_by_fields(None).unwrap(), Some(vec!["_stream".to_string()]));
        assert_eq!(
            group_by_fields(Some(&Grouping::Noop)).unwrap(),
            Some(vec!["_stream".to_string()])
        );
        assert_eq!(group_by_fields(Some(&Grouping::Singleton)).unwrap(), None);
        assert_eq!(
            group_by_fields(Some(&Grouping::By(vec!["a".into(), "b-c".into()]))).unwrap(),
            Some(vec!["a".to_string(), "\"b-c\"".to_string()])
        );
        assert!(group_by_fields(Some(&Grouping::Without(vec!["a".into()]))).is_err());
    }

    #[test]
    fn test_vector_aggregations() {
        let sum = |grouping| {
            SampleExpr::Vector(VectorAggregation {
                operation: VectorOp::Sum,
                param: None,
                grouping,
                inner: Box::new(SampleExpr::Range(nginx_range(RangeOp::Rate, None))),
            })
        };
        let options = TranslateOptions::default();
        assert_eq!(
            translate_sample_expr(&sum(Some(Grouping::Singleton)), &options).unwrap(),
            r#"{app="nginx"} _time:5m | stats rate() as value"#
        );

        let bottomk = SampleExpr::Vector(VectorAggregation {
            operation: VectorOp::Bottomk,
            param: Some(3),
            grouping: None,
            inner: Box::new(sum(Some(Grouping::By(vec!["host".into()])))),
        });
        assert_eq!(
            translate_sample_expr(&bottomk, &options).unwrap(),
            r#"{app="nginx"} _time:5m | stats by (host) rate() as value | first 3 (value)"#
        );

        let nested_sum = SampleExpr::Vector(VectorAggregation {
            operation: VectorOp::Sum,
            param: None,
            grouping: None,
            inner: Box::new(sum(None)),
        });
        assert!(translate_sample_expr(&nested_sum, &options).is_err());

        let avg = SampleExpr::Vector(VectorAggregation {
            operation: VectorOp::Avg,
            param: None,
            grouping: None,
            inner: Box::new(sum(None)),
        });
        assert!(translate_sample_expr(&avg, &options).is_err());
    }

    #[test]
    fn test_topk_validation() {
        let topk = |param, grouping| {
            SampleExpr::Vector(VectorAggregation {
                operation: VectorOp::Topk,
                param,
                grouping,
                inner: Box::new(SampleExpr::Range(nginx_range(RangeOp::Count, None))),
            })
        };
        let options = TranslateOptions::default();
        assert_eq!(
            translate_sample_expr(&topk(Some(0), None), &options).unwrap_err().kind(),
            ErrorKind::InvalidSemantics
        );
        assert_eq!(
            translate_sample_expr(&topk(None, None), &options).unwrap_err().kind(),
            ErrorKind::InvalidSemantics
        );
        assert_eq!(
            translate_sample_expr(&topk(Some(2), Some(Grouping::By(vec!["a".into()]))), &options)
                .unwrap_err()
                .kind(),
            ErrorKind::UnsupportedConstruct
        );
    }
}
