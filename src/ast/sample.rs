//! Metric (sample) expressions: range and vector aggregations

use std::fmt;
use std::time::Duration;

use itertools::Itertools;

use super::duration::format_compact;
use super::label_filter::LabelFilter;
use super::LogSelectorExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Rate,
    Count,
    Avg,
    Sum,
    Min,
    Max,
    Quantile,
    // parsed, but without a LogsQL counterpart
    Bytes,
    BytesRate,
    RateCounter,
    Stddev,
    Stdvar,
    First,
    Last,
    Absent,
}

impl RangeOp {
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "rate" => RangeOp::Rate,
            "count_over_time" => RangeOp::Count,
            "avg_over_time" => RangeOp::Avg,
            "sum_over_time" => RangeOp::Sum,
            "min_over_time" => RangeOp::Min,
            "max_over_time" => RangeOp::Max,
            "quantile_over_time" => RangeOp::Quantile,
            "bytes_over_time" => RangeOp::Bytes,
            "bytes_rate" => RangeOp::BytesRate,
            "rate_counter" => RangeOp::RateCounter,
            "stddev_over_time" => RangeOp::Stddev,
            "stdvar_over_time" => RangeOp::Stdvar,
            "first_over_time" => RangeOp::First,
            "last_over_time" => RangeOp::Last,
            "absent_over_time" => RangeOp::Absent,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RangeOp::Rate => "rate",
            RangeOp::Count => "count_over_time",
            RangeOp::Avg => "avg_over_time",
            RangeOp::Sum => "sum_over_time",
            RangeOp::Min => "min_over_time",
            RangeOp::Max => "max_over_time",
            RangeOp::Quantile => "quantile_over_time",
            RangeOp::Bytes => "bytes_over_time",
            RangeOp::BytesRate => "bytes_rate",
            RangeOp::RateCounter => "rate_counter",
            RangeOp::Stddev => "stddev_over_time",
            RangeOp::Stdvar => "stdvar_over_time",
            RangeOp::First => "first_over_time",
            RangeOp::Last => "last_over_time",
            RangeOp::Absent => "absent_over_time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOp {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    Stddev,
    Stdvar,
    Topk,
    Bottomk,
    Sort,
    SortDesc,
}

impl VectorOp {
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "sum" => VectorOp::Sum,
            "avg" => VectorOp::Avg,
            "min" => VectorOp::Min,
            "max" => VectorOp::Max,
            "count" => VectorOp::Count,
            "stddev" => VectorOp::Stddev,
            "stdvar" => VectorOp::Stdvar,
            "topk" => VectorOp::Topk,
            "bottomk" => VectorOp::Bottomk,
            "sort" => VectorOp::Sort,
            "sort_desc" => VectorOp::SortDesc,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            VectorOp::Sum => "sum",
            VectorOp::Avg => "avg",
            VectorOp::Min => "min",
            VectorOp::Max => "max",
            VectorOp::Count => "count",
            VectorOp::Stddev => "stddev",
            VectorOp::Stdvar => "stdvar",
            VectorOp::Topk => "topk",
            VectorOp::Bottomk => "bottomk",
            VectorOp::Sort => "sort",
            VectorOp::SortDesc => "sort_desc",
        }
    }
}

/// Aggregation grouping.
///
/// `sum(...)` and `sum by () (...)` are `Singleton`; `without ()` is `Noop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    By(Vec<String>),
    Without(Vec<String>),
    Noop,
    Singleton,
}

impl Grouping {
    pub fn is_singleton(&self) -> bool {
        matches!(self, Grouping::Singleton)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapConversion {
    Duration,
    DurationSeconds,
    Bytes,
}

impl UnwrapConversion {
    pub fn name(&self) -> &'static str {
        match self {
            UnwrapConversion::Duration => "duration",
            UnwrapConversion::DurationSeconds => "duration_seconds",
            UnwrapConversion::Bytes => "bytes",
        }
    }
}

/// `| unwrap [conv(]field[)]` followed by optional post filters
#[derive(Debug, Clone, PartialEq)]
pub struct Unwrap {
    pub identifier: String,
    pub conversion: Option<UnwrapConversion>,
    pub post_filters: Vec<LabelFilter>,
}

impl Unwrap {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            conversion: None,
            post_filters: Vec::new(),
        }
    }
}

/// Log query evaluated over a time window: `{...} | stages [5m] offset 1h`
#[derive(Debug, Clone, PartialEq)]
pub struct LogRange {
    pub selector: LogSelectorExpr,
    pub interval: Duration,
    pub offset: Option<Duration>,
    pub unwrap: Option<Unwrap>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeAggregation {
    pub operation: RangeOp,
    /// quantile for `quantile_over_time`
    pub param: Option<f64>,
    pub range: LogRange,
    pub grouping: Option<Grouping>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorAggregation {
    pub operation: VectorOp,
    /// K for `topk`/`bottomk`
    pub param: Option<i64>,
    pub grouping: Option<Grouping>,
    pub inner: Box<SampleExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleExpr {
    Range(RangeAggregation),
    Vector(VectorAggregation),
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grouping::By(names) => write!(f, "by ({})", names.iter().join(", ")),
            Grouping::Without(names) => write!(f, "without ({})", names.iter().join(", ")),
            Grouping::Noop => f.write_str("without ()"),
            Grouping::Singleton => Ok(()),
        }
    }
}

impl fmt::Display for Unwrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conversion {
            Some(conv) => write!(f, "| unwrap {}({})", conv.name(), self.identifier)?,
            None => write!(f, "| unwrap {}", self.identifier)?,
        }
        for filter in &self.post_filters {
            write!(f, " | {filter}")?;
        }
        Ok(())
    }
}

impl fmt::Display for LogRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(unwrap) = &self.unwrap {
            write!(f, " {unwrap}")?;
        }
        write!(f, " [{}]", format_compact(self.interval))?;
        if let Some(offset) = self.offset {
            write!(f, " offset {}", format_compact(offset))?;
        }
        Ok(())
    }
}

impl fmt::Display for SampleExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleExpr::Range(r) => {
                write!(f, "{}(", r.operation.name())?;
                if let Some(p) = r.param {
                    write!(f, "{p}, ")?;
                }
                write!(f, "{})", r.range)?;
                match &r.grouping {
                    Some(g) if !g.is_singleton() => write!(f, " {g}"),
                    _ => Ok(()),
                }
            }
            SampleExpr::Vector(v) => {
                f.write_str(v.operation.name())?;
                match &v.grouping {
                    Some(g) if !g.is_singleton() => write!(f, " {g} (")?,
                    _ => f.write_str("(")?,
                }
                if let Some(k) = v.param {
                    write!(f, "{k}, ")?;
                }
                write!(f, "{})", v.inner)
            }
        }
    }
}
