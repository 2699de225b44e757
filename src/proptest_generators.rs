#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use crate::ast::{
        CompareOp, Grouping, LabelFilter, LogRange, LogSelectorExpr, MatchOp, Matcher,
        RangeAggregation, RangeOp, SampleExpr, StreamSelector, VectorAggregation, VectorOp,
    };
    use crate::error::ErrorKind;
    use crate::parser::unquote;
    use crate::translate::{
        is_bare_identifier, is_bare_scalar, quote_identifier_if_needed, quote_scalar_if_needed,
        quote_string, translate_label_filter, PipelineBuilder, TranslateOptions,
    };
    use crate::translate_query;

    // Strategy for label names as the grammar accepts them
    fn label_name() -> impl Strategy<Value = String> {
        "[a-zA-Z_][a-zA-Z0-9_]{0,12}"
    }

    // Mostly near-bare text, so both quoting branches get exercised
    fn field_text() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => "[a-zA-Z0-9_.:/ -]{0,10}",
            1 => any::<String>(),
        ]
    }

    fn arb_match_op() -> impl Strategy<Value = MatchOp> {
        prop_oneof![
            Just(MatchOp::Eq),
            Just(MatchOp::Ne),
            Just(MatchOp::Re),
            Just(MatchOp::Nre),
        ]
    }

    fn arb_compare_op() -> impl Strategy<Value = CompareOp> {
        prop_oneof![
            Just(CompareOp::Eq),
            Just(CompareOp::Ne),
            Just(CompareOp::Gt),
            Just(CompareOp::Ge),
            Just(CompareOp::Lt),
            Just(CompareOp::Le),
        ]
    }

    fn arb_leaf_filter() -> impl Strategy<Value = LabelFilter> {
        prop_oneof![
            (label_name(), arb_match_op(), any::<String>())
                .prop_map(|(name, op, value)| LabelFilter::String(Matcher::new(name, op, value))),
            (label_name(), arb_compare_op(), -1e9f64..1e9)
                .prop_map(|(name, op, value)| LabelFilter::Numeric { name, op, value }),
            (label_name(), arb_compare_op(), 0u64..100_000_000).prop_map(|(name, op, ms)| {
                LabelFilter::Duration {
                    name,
                    op,
                    value: Duration::from_millis(ms),
                }
            }),
            (label_name(), arb_compare_op(), any::<u64>())
                .prop_map(|(name, op, value)| LabelFilter::Bytes { name, op, value }),
            Just(LabelFilter::Noop),
        ]
    }

    fn arb_label_filter() -> impl Strategy<Value = LabelFilter> {
        arb_leaf_filter().prop_recursive(6, 64, 2, |inner| {
            (any::<bool>(), inner.clone(), inner).prop_map(|(and, left, right)| {
                if and {
                    LabelFilter::and(left, right)
                } else {
                    LabelFilter::or(left, right)
                }
            })
        })
    }

    fn binary_depth(filter: &LabelFilter) -> usize {
        match filter {
            LabelFilter::Binary { left, right, .. } => {
                1 + binary_depth(left).max(binary_depth(right))
            }
            _ => 0,
        }
    }

    fn arb_grouping() -> impl Strategy<Value = Option<Grouping>> {
        prop_oneof![
            Just(None),
            Just(Some(Grouping::Singleton)),
            Just(Some(Grouping::Noop)),
            prop::collection::vec(label_name(), 0..4).prop_map(|n| Some(Grouping::By(n))),
            prop::collection::vec(label_name(), 0..4).prop_map(|n| Some(Grouping::Without(n))),
        ]
    }

    fn count_over_time(grouping: Option<Grouping>) -> SampleExpr {
        SampleExpr::Range(RangeAggregation {
            operation: RangeOp::Count,
            param: None,
            range: LogRange {
                selector: LogSelectorExpr::Matchers(StreamSelector::new(vec![Matcher::new(
                    "app",
                    MatchOp::Eq,
                    "api",
                )])),
                interval: Duration::from_secs(300),
                offset: None,
                unwrap: None,
            },
            grouping,
        })
    }

    #[derive(Debug, Clone)]
    enum BuilderOp {
        Filter(String),
        Pipe(String),
    }

    fn arb_builder_op() -> impl Strategy<Value = BuilderOp> {
        prop_oneof![
            "[a-z ]{0,6}".prop_map(BuilderOp::Filter),
            "[a-z]{1,6}".prop_map(BuilderOp::Pipe),
        ]
    }

    proptest! {
        #[test]
        fn quoting_is_reversible(s in any::<String>()) {
            prop_assert_eq!(unquote(&quote_string(&s)).unwrap(), s);
        }

        #[test]
        fn bare_text_stays_bare_and_quoted_text_unquotes(s in field_text()) {
            let ident = quote_identifier_if_needed(&s);
            if is_bare_identifier(&s) {
                prop_assert_eq!(&ident, &s);
            } else {
                prop_assert_eq!(unquote(&ident).unwrap(), s.clone());
            }

            let scalar = quote_scalar_if_needed(&s);
            if is_bare_scalar(&s) {
                prop_assert_eq!(&scalar, &s);
            } else {
                prop_assert_eq!(unquote(&scalar).unwrap(), s.clone());
            }
        }

        #[test]
        fn label_filters_translate_deterministically(filter in arb_label_filter()) {
            let first = translate_label_filter(&filter, 64);
            let second = translate_label_filter(&filter, 64);
            prop_assert_eq!(first.unwrap(), second.unwrap());
        }

        #[test]
        fn depth_guard_matches_tree_depth(filter in arb_label_filter(), max in 0usize..6) {
            let result = translate_label_filter(&filter, max);
            if binary_depth(&filter) > max {
                prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::UnsupportedConstruct);
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn filters_are_bare_until_the_first_pipe(ops in prop::collection::vec(arb_builder_op(), 0..12)) {
            let mut expected = String::from("{}");
            let mut piped = false;
            for op in &ops {
                match op {
                    BuilderOp::Filter(f) if f.trim().is_empty() => {}
                    BuilderOp::Filter(f) if piped => {
                        expected.push_str(&format!(" | filter {}", f.trim()))
                    }
                    BuilderOp::Filter(f) => expected.push_str(&format!(" {}", f.trim())),
                    BuilderOp::Pipe(p) => {
                        piped = true;
                        expected.push_str(&format!(" | {p}"));
                    }
                }
            }

            let built = ops.iter().fold(PipelineBuilder::new("{}"), |b, op| match op {
                BuilderOp::Filter(f) => b.filter(f),
                BuilderOp::Pipe(p) => b.pipe(p),
            });
            prop_assert_eq!(built.has_pipe(), piped);
            prop_assert_eq!(built.finish(), expected);
        }

        #[test]
        fn every_grouping_is_translated_or_rejected(outer in arb_grouping(), own in arb_grouping()) {
            let expr = match outer.clone() {
                Some(grouping) => SampleExpr::Vector(VectorAggregation {
                    operation: VectorOp::Sum,
                    param: None,
                    grouping: Some(grouping),
                    inner: Box::new(count_over_time(own.clone())),
                }),
                None => count_over_time(own.clone()),
            };
            let result = crate::translate::translate(
                &crate::ast::Expr::Sample(expr),
                &TranslateOptions::default(),
            );

            match outer.or(own) {
                Some(Grouping::Without(_)) => {
                    prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::UnsupportedConstruct);
                }
                None | Some(Grouping::Noop) => {
                    prop_assert!(result.unwrap().text.ends_with("| stats by (_stream) count() as value"));
                }
                Some(Grouping::Singleton) => {
                    prop_assert!(result.unwrap().text.ends_with("| stats count() as value"));
                }
                Some(Grouping::By(names)) if names.is_empty() => {
                    prop_assert!(result.unwrap().text.ends_with("| stats count() as value"));
                }
                Some(Grouping::By(names)) => {
                    let text = result.unwrap().text;
                    let expected = format!("| stats by ({}) count() as value", names.join(", "));
                    prop_assert!(text.ends_with(&expected), "{} does not end with {}", text, expected);
                }
            }
        }

        #[test]
        fn line_filter_values_survive_parse_and_translate(value in "[^\u{0}-\u{1f}]{1,20}") {
            let query = format!("{{app=\"api\"}} |= {}", quote_string(&value));
            let first = translate_query(&query).unwrap();
            let second = translate_query(&query).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.text, format!("{{app=\"api\"}} {}", quote_string(&value)));
        }
    }
}
