use pest::{
    iterators::Pair,
    pratt_parser::{Assoc::*, Op, PrattParser},
    Parser,
};
use pest_derive::Parser;

use crate::ast::{
    CompareOp, Expr, FieldExtraction, Grouping, LabelFilter, LabelFormatEntry, LabelItem,
    LineFilter, LineFilterValue, LineMatchType, LogRange, LogSelectorExpr, LogfmtFlags, MatchOp,
    Matcher, ParserKind, PipelineExpr, RangeAggregation, RangeOp, SampleExpr, Stage,
    StreamSelector, Unwrap, UnwrapConversion, VectorAggregation, VectorOp,
};

use super::error::{ParseError, SpanExt};
use super::literal::{parse_bytes, parse_duration, parse_number, unescape};
use crate::translate::DEFAULT_MAX_FILTER_DEPTH;

/// Deepest bracket nesting handed to the grammar, and the ceiling on label
/// filter depth
pub const MAX_NESTING_DEPTH: usize = 128;

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
pub struct QueryParser;

impl QueryParser {
    /// Parse LogQL text into an expression tree
    pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
        Self::parse_expr_with_depth(input, DEFAULT_MAX_FILTER_DEPTH)
    }

    /// Parse, rejecting label filters with more than `max_filter_depth`
    /// nested `and`/`or` levels before their tree is built
    pub fn parse_expr_with_depth(
        input: &str,
        max_filter_depth: usize,
    ) -> Result<Expr, ParseError> {
        check_nesting(input)?;

        let mut pairs = Self::parse(Rule::query, input)
            .map_err(|e| ParseError::from_pest(Box::new(e), input.to_string()))?;

        let query = pairs
            .next()
            .ok_or_else(|| ParseError::internal("Grammar guarantees query exists"))?;
        let body = query
            .into_inner()
            .next()
            .ok_or_else(|| ParseError::internal("Grammar guarantees query has a body"))?;

        let lower = Lowering {
            src: input,
            max_filter_depth: max_filter_depth.min(MAX_NESTING_DEPTH),
        };
        match body.as_rule() {
            Rule::log_expr => Ok(Expr::Log(lower.log_expr(body)?)),
            Rule::range_agg | Rule::vector_agg => Ok(Expr::Sample(lower.sample_expr(body)?)),
            rule => Err(ParseError::internal(format!("Unexpected query rule: {rule:?}"))),
        }
    }
}

/// Reject bracket nesting the recursive grammar can't safely descend into
fn check_nesting(input: &str) -> Result<(), ParseError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '`' => quote = Some(c),
                '(' | '{' | '[' => {
                    depth += 1;
                    if depth > MAX_NESTING_DEPTH {
                        return Err(ParseError::NestingTooDeep {
                            limit: MAX_NESTING_DEPTH,
                            span: (i, 1).into(),
                            src: input.to_string(),
                        });
                    }
                }
                ')' | '}' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
    }
    Ok(())
}

fn expect<'i>(
    pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    what: &str,
) -> Result<Pair<'i, Rule>, ParseError> {
    pairs
        .next()
        .ok_or_else(|| ParseError::internal(format!("Grammar guarantees {what}")))
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_or
            | Rule::kw_and
            | Rule::kw_offset
            | Rule::kw_unwrap
            | Rule::kw_json
            | Rule::kw_logfmt
            | Rule::kw_regexp
            | Rule::kw_pattern
            | Rule::kw_unpack
            | Rule::kw_decolorize
            | Rule::kw_line_format
            | Rule::kw_label_format
            | Rule::kw_drop
            | Rule::kw_keep
            | Rule::kw_ip
    )
}

/// Children of `pair` without the keyword tokens
fn operands(pair: Pair<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn unexpected(context: &str, pair: &Pair<'_, Rule>) -> ParseError {
    ParseError::internal(format!("Unexpected {context} rule: {:?}", pair.as_rule()))
}

/// Pest pairs → expression tree; holds the source for error spans
struct Lowering<'s> {
    src: &'s str,
    max_filter_depth: usize,
}

impl Lowering<'_> {
    fn log_expr(&self, pair: Pair<'_, Rule>) -> Result<LogSelectorExpr, ParseError> {
        let mut inner = pair.into_inner();
        let selector = self.selector(expect(&mut inner, "log query has a selector")?)?;
        let stages = self.stages(inner)?;
        Ok(log_selector(selector, stages))
    }

    fn selector(&self, pair: Pair<'_, Rule>) -> Result<StreamSelector, ParseError> {
        let matchers = pair
            .into_inner()
            .map(|p| self.matcher(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StreamSelector::new(matchers))
    }

    fn matcher(&self, pair: Pair<'_, Rule>) -> Result<Matcher, ParseError> {
        let mut inner = pair.into_inner();
        let name = expect(&mut inner, "matcher has a label")?.as_str();
        let op_pair = expect(&mut inner, "matcher has an operator")?;
        let op = MatchOp::from_token(op_pair.as_str()).ok_or_else(|| unexpected("match op", &op_pair))?;
        let value = self.string(expect(&mut inner, "matcher has a value")?)?;
        Ok(Matcher::new(name, op, value))
    }

    fn string(&self, pair: Pair<'_, Rule>) -> Result<String, ParseError> {
        match pair.into_inner().next() {
            None => Ok(String::new()),
            Some(inner) if inner.as_rule() == Rule::bq_inner => Ok(inner.as_str().to_string()),
            Some(inner) => unescape(inner.as_str(), inner.as_span().start(), self.src),
        }
    }

    fn duration(&self, pair: Pair<'_, Rule>) -> Result<std::time::Duration, ParseError> {
        parse_duration(pair.as_str(), pair.as_span().to_source_span(), self.src)
    }

    fn number(&self, pair: Pair<'_, Rule>) -> Result<f64, ParseError> {
        parse_number(pair.as_str(), pair.as_span().to_source_span(), self.src)
    }

    /// Stages in source order; adjacent line filters share one chain
    fn stages<'i>(
        &self,
        pairs: impl IntoIterator<Item = Pair<'i, Rule>>,
    ) -> Result<Vec<Stage>, ParseError> {
        let mut stages: Vec<Stage> = Vec::new();
        for pair in pairs {
            if pair.as_rule() == Rule::line_filter {
                let filter = self.line_filter(pair)?;
                if let Some(Stage::LineFilter(chain)) = stages.last_mut() {
                    chain.push(filter);
                } else {
                    stages.push(Stage::LineFilter(vec![filter]));
                }
            } else {
                stages.push(self.stage(pair)?);
            }
        }
        Ok(stages)
    }

    fn line_filter(&self, pair: Pair<'_, Rule>) -> Result<LineFilter, ParseError> {
        let mut inner = operands(pair);
        let op_pair = expect(&mut inner, "line filter has an operator")?;
        let ty = LineMatchType::from_token(op_pair.as_str())
            .ok_or_else(|| unexpected("line filter op", &op_pair))?;
        let value = self.line_filter_value(expect(&mut inner, "line filter has a value")?)?;
        let or = inner
            .map(|p| self.line_filter_value(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LineFilter { ty, value, or })
    }

    fn line_filter_value(&self, pair: Pair<'_, Rule>) -> Result<LineFilterValue, ParseError> {
        let value = expect(&mut pair.into_inner(), "line filter value is not empty")?;
        match value.as_rule() {
            Rule::string => Ok(LineFilterValue::Literal(self.string(value)?)),
            Rule::ip_fn => Ok(LineFilterValue::Ip(self.ip_fn(value)?)),
            _ => Err(unexpected("line filter value", &value)),
        }
    }

    fn ip_fn(&self, pair: Pair<'_, Rule>) -> Result<String, ParseError> {
        self.string(expect(&mut operands(pair), "ip() has an argument")?)
    }

    fn stage(&self, pair: Pair<'_, Rule>) -> Result<Stage, ParseError> {
        match pair.as_rule() {
            Rule::json_parser => match operands(pair).next() {
                Some(params) => Ok(Stage::JsonFieldParser(self.field_params(params)?)),
                None => Ok(Stage::LineParser {
                    kind: ParserKind::Json,
                    param: None,
                }),
            },
            Rule::logfmt_parser => self.logfmt_parser(pair),
            Rule::regexp_parser => Ok(Stage::LineParser {
                kind: ParserKind::Regexp,
                param: Some(self.string(expect(&mut operands(pair), "regexp has a pattern")?)?),
            }),
            Rule::pattern_parser => Ok(Stage::LineParser {
                kind: ParserKind::Pattern,
                param: Some(self.string(expect(&mut operands(pair), "pattern has a pattern")?)?),
            }),
            Rule::unpack_parser => Ok(Stage::LineParser {
                kind: ParserKind::Unpack,
                param: None,
            }),
            Rule::decolorize => Ok(Stage::Decolorize),
            Rule::line_format => Ok(Stage::LineFormat(
                self.string(expect(&mut operands(pair), "line_format has a template")?)?,
            )),
            Rule::label_format => Ok(Stage::LabelFormat(
                operands(pair)
                    .map(|p| self.label_format_entry(p))
                    .collect::<Result<_, _>>()?,
            )),
            Rule::drop_labels => Ok(Stage::DropLabels(self.label_items(pair)?)),
            Rule::keep_labels => Ok(Stage::KeepLabels(self.label_items(pair)?)),
            Rule::label_filter => Ok(Stage::LabelFilter(self.label_filter_expr(expect(
                &mut pair.into_inner(),
                "label filter has an expression",
            )?)?)),
            _ => Err(unexpected("stage", &pair)),
        }
    }

    fn logfmt_parser(&self, pair: Pair<'_, Rule>) -> Result<Stage, ParseError> {
        let mut flags = LogfmtFlags::default();
        let mut fields = None;
        for p in operands(pair) {
            match p.as_rule() {
                Rule::logfmt_flag if p.as_str() == "--strict" => flags.strict = true,
                Rule::logfmt_flag => flags.keep_empty = true,
                Rule::field_params => fields = Some(self.field_params(p)?),
                _ => return Err(unexpected("logfmt", &p)),
            }
        }
        Ok(match fields {
            Some(fields) => Stage::LogfmtFieldParser { flags, fields },
            None if flags == LogfmtFlags::default() => Stage::LineParser {
                kind: ParserKind::Logfmt,
                param: None,
            },
            None => Stage::LogfmtParser(flags),
        })
    }

    /// `a="x.y", b` where a bare `b` extracts the field of the same name
    fn field_params(&self, pair: Pair<'_, Rule>) -> Result<Vec<FieldExtraction>, ParseError> {
        pair.into_inner()
            .map(|param| {
                let mut inner = param.into_inner();
                let identifier = expect(&mut inner, "field param has a name")?.as_str();
                let expression = match inner.next() {
                    Some(s) => self.string(s)?,
                    None => identifier.to_string(),
                };
                Ok(FieldExtraction::new(identifier, expression))
            })
            .collect()
    }

    fn label_format_entry(&self, pair: Pair<'_, Rule>) -> Result<LabelFormatEntry, ParseError> {
        let mut inner = pair.into_inner();
        let name = expect(&mut inner, "label_format entry has a name")?
            .as_str()
            .to_string();
        let value = expect(&mut inner, "label_format entry has a value")?;
        Ok(match value.as_rule() {
            Rule::label_name => LabelFormatEntry {
                name,
                value: value.as_str().to_string(),
                rename: true,
            },
            _ => LabelFormatEntry {
                name,
                value: self.string(value)?,
                rename: false,
            },
        })
    }

    fn label_items(&self, pair: Pair<'_, Rule>) -> Result<Vec<LabelItem>, ParseError> {
        operands(pair)
            .map(|item| {
                let inner = expect(&mut item.into_inner(), "label item is not empty")?;
                match inner.as_rule() {
                    Rule::matcher => Ok(LabelItem::Matcher(self.matcher(inner)?)),
                    Rule::label_name => Ok(LabelItem::Name(inner.as_str().to_string())),
                    _ => Err(unexpected("label item", &inner)),
                }
            })
            .collect()
    }

    fn label_filter_expr(&self, pair: Pair<'_, Rule>) -> Result<LabelFilter, ParseError> {
        self.label_filter_tree(pair).map(|(filter, _)| filter)
    }

    /// Filter tree and its and/or height
    fn label_filter_tree(
        &self,
        pair: Pair<'_, Rule>,
    ) -> Result<(LabelFilter, usize), ParseError> {
        let pratt = PrattParser::new()
            .op(Op::infix(Rule::lf_or, Left))
            .op(Op::infix(Rule::lf_and, Left));

        pratt
            .map_primary(|p| match p.as_rule() {
                Rule::label_filter_expr => self.label_filter_tree(p),
                _ => Ok((self.label_filter_primary(p)?, 0)),
            })
            .map_infix(|lhs, op, rhs| {
                let (lhs, lhs_height) = lhs?;
                let (rhs, rhs_height) = rhs?;
                let height = lhs_height.max(rhs_height) + 1;
                if height > self.max_filter_depth {
                    return Err(ParseError::FilterTooDeep {
                        limit: self.max_filter_depth,
                        span: op.as_span().to_source_span(),
                        src: self.src.to_string(),
                    });
                }
                let filter = match op.as_rule() {
                    Rule::lf_and => LabelFilter::and(lhs, rhs),
                    Rule::lf_or => LabelFilter::or(lhs, rhs),
                    _ => return Err(unexpected("infix", &op)),
                };
                Ok((filter, height))
            })
            .parse(pair.into_inner())
    }

    fn label_filter_primary(&self, pair: Pair<'_, Rule>) -> Result<LabelFilter, ParseError> {
        let rule = pair.as_rule();
        let mut inner = pair.into_inner();
        let name = expect(&mut inner, "comparison has a label")?
            .as_str()
            .to_string();
        let op_pair = expect(&mut inner, "comparison has an operator")?;
        let value = expect(&mut inner, "comparison has a value")?;

        if rule == Rule::string_filter {
            let op = MatchOp::from_token(op_pair.as_str())
                .ok_or_else(|| unexpected("match op", &op_pair))?;
            return Ok(LabelFilter::String(Matcher::new(name, op, self.string(value)?)));
        }

        let op = CompareOp::from_token(op_pair.as_str())
            .ok_or_else(|| unexpected("comparison op", &op_pair))?;
        match rule {
            Rule::ip_filter => Ok(LabelFilter::Ip {
                name,
                op,
                pattern: self.ip_fn(value)?,
            }),
            Rule::duration_filter => Ok(LabelFilter::Duration {
                name,
                op,
                value: self.duration(value)?,
            }),
            Rule::bytes_filter => Ok(LabelFilter::Bytes {
                name,
                op,
                value: parse_bytes(value.as_str(), value.as_span().to_source_span(), self.src)?,
            }),
            Rule::number_filter => Ok(LabelFilter::Numeric {
                name,
                op,
                value: self.number(value)?,
            }),
            _ => Err(ParseError::internal(format!(
                "Unexpected label filter rule: {rule:?}"
            ))),
        }
    }

    fn sample_expr(&self, pair: Pair<'_, Rule>) -> Result<SampleExpr, ParseError> {
        match pair.as_rule() {
            Rule::range_agg => Ok(SampleExpr::Range(self.range_agg(pair)?)),
            Rule::vector_agg => Ok(SampleExpr::Vector(self.vector_agg(pair)?)),
            _ => Err(unexpected("sample expression", &pair)),
        }
    }

    fn range_agg(&self, pair: Pair<'_, Rule>) -> Result<RangeAggregation, ParseError> {
        let mut inner = pair.into_inner();
        let op_pair = expect(&mut inner, "range aggregation has an operator")?;
        let operation =
            RangeOp::from_name(op_pair.as_str()).ok_or_else(|| unexpected("range op", &op_pair))?;

        let mut param = None;
        let mut range = None;
        let mut grouping = None;
        for p in inner {
            match p.as_rule() {
                Rule::number if operation != RangeOp::Quantile => {
                    return Err(ParseError::invalid_value(
                        format!("no parameter for {}", operation.name()),
                        p.as_str(),
                        p.as_span().to_source_span(),
                        self.src,
                    ))
                }
                Rule::number => param = Some(self.number(p)?),
                Rule::log_range => range = Some(self.log_range(p)?),
                Rule::grouping => grouping = Some(self.grouping(p)?),
                _ => return Err(unexpected("range aggregation", &p)),
            }
        }

        Ok(RangeAggregation {
            operation,
            param,
            range: range
                .ok_or_else(|| ParseError::internal("Grammar guarantees a log range"))?,
            grouping,
        })
    }

    fn log_range(&self, pair: Pair<'_, Rule>) -> Result<LogRange, ParseError> {
        let mut inner = pair.into_inner();
        let first = expect(&mut inner, "log range is not empty")?;
        if first.as_rule() == Rule::log_range {
            return self.log_range(first);
        }
        let selector = self.selector(first)?;

        let mut interval = None;
        let mut offset = None;
        let mut unwrap = None;
        let mut stage_pairs = Vec::new();
        for p in inner {
            match p.as_rule() {
                Rule::range => {
                    interval = Some(self.duration(expect(&mut p.into_inner(), "range has a duration")?)?)
                }
                Rule::offset => {
                    offset = Some(self.duration(expect(&mut operands(p), "offset has a duration")?)?)
                }
                Rule::unwrap => unwrap = Some(self.unwrap(p)?),
                _ => stage_pairs.push(p),
            }
        }

        Ok(LogRange {
            selector: log_selector(selector, self.stages(stage_pairs)?),
            interval: interval.ok_or_else(|| ParseError::internal("Grammar guarantees a range"))?,
            offset,
            unwrap,
        })
    }

    fn unwrap(&self, pair: Pair<'_, Rule>) -> Result<Unwrap, ParseError> {
        let mut inner = operands(pair);
        let target = expect(&mut inner, "unwrap has a target")?;

        let mut conversion = None;
        let mut identifier = "";
        for p in target.into_inner() {
            match p.as_rule() {
                Rule::unwrap_conv => {
                    conversion = Some(match p.as_str() {
                        "duration" => UnwrapConversion::Duration,
                        "duration_seconds" => UnwrapConversion::DurationSeconds,
                        "bytes" => UnwrapConversion::Bytes,
                        _ => return Err(unexpected("unwrap conversion", &p)),
                    })
                }
                Rule::label_name => identifier = p.as_str(),
                _ => return Err(unexpected("unwrap", &p)),
            }
        }

        let post_filters = inner
            .map(|p| self.label_filter_expr(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Unwrap {
            identifier: identifier.to_string(),
            conversion,
            post_filters,
        })
    }

    fn vector_agg(&self, pair: Pair<'_, Rule>) -> Result<VectorAggregation, ParseError> {
        let mut inner = pair.into_inner();
        let op_pair = expect(&mut inner, "vector aggregation has an operator")?;
        let operation = VectorOp::from_name(op_pair.as_str())
            .ok_or_else(|| unexpected("vector op", &op_pair))?;

        let mut param = None;
        let mut grouping = None;
        let mut argument = None;
        for p in inner {
            match p.as_rule() {
                Rule::number => param = Some(self.k_param(operation, &p)?),
                Rule::grouping => grouping = Some(self.grouping(p)?),
                Rule::range_agg | Rule::vector_agg => argument = Some(self.sample_expr(p)?),
                _ => return Err(unexpected("vector aggregation", &p)),
            }
        }

        Ok(VectorAggregation {
            operation,
            param,
            // `sum(...)` aggregates everything into one series
            grouping: Some(grouping.unwrap_or(Grouping::Singleton)),
            inner: Box::new(
                argument.ok_or_else(|| ParseError::internal("Grammar guarantees an argument"))?,
            ),
        })
    }

    /// K of `topk`/`bottomk`: an integer literal
    fn k_param(&self, operation: VectorOp, pair: &Pair<'_, Rule>) -> Result<i64, ParseError> {
        let span = pair.as_span().to_source_span();
        if !matches!(operation, VectorOp::Topk | VectorOp::Bottomk) {
            return Err(ParseError::invalid_value(
                format!("no parameter for {}", operation.name()),
                pair.as_str(),
                span,
                self.src,
            ));
        }
        pair.as_str()
            .parse::<i64>()
            .map_err(|_| ParseError::invalid_value("integer K", pair.as_str(), span, self.src))
    }

    fn grouping(&self, pair: Pair<'_, Rule>) -> Result<Grouping, ParseError> {
        let mut inner = pair.into_inner();
        let kind = expect(&mut inner, "grouping has by/without")?;
        let names: Vec<String> = inner.map(|p| p.as_str().to_string()).collect();
        Ok(match (kind.as_rule(), names.is_empty()) {
            (Rule::kw_by, true) => Grouping::Singleton,
            (Rule::kw_by, false) => Grouping::By(names),
            (Rule::kw_without, true) => Grouping::Noop,
            (Rule::kw_without, false) => Grouping::Without(names),
            _ => return Err(unexpected("grouping", &kind)),
        })
    }
}

fn log_selector(selector: StreamSelector, stages: Vec<Stage>) -> LogSelectorExpr {
    if stages.is_empty() {
        LogSelectorExpr::Matchers(selector)
    } else {
        LogSelectorExpr::Pipeline(PipelineExpr { selector, stages })
    }
}
