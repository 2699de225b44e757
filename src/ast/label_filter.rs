//! Label filter boolean trees

use std::fmt;
use std::time::Duration;

use super::duration::format_canonical;
use super::operators::{CompareOp, MatchOp};
use super::quote;

/// `name op "value"` used by stream selectors, string label filters and
/// conditional `drop`/`keep` items
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
}

impl Matcher {
    pub fn new(name: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, self.op, quote(&self.value))
    }
}

/// Boolean tree of label comparisons applied after stream selection
#[derive(Debug, Clone, PartialEq)]
pub enum LabelFilter {
    Noop,
    Binary {
        and: bool,
        left: Box<LabelFilter>,
        right: Box<LabelFilter>,
    },
    String(Matcher),
    Numeric {
        name: String,
        op: CompareOp,
        value: f64,
    },
    Duration {
        name: String,
        op: CompareOp,
        value: Duration,
    },
    Bytes {
        name: String,
        op: CompareOp,
        value: u64,
    },
    Ip {
        name: String,
        op: CompareOp,
        pattern: String,
    },
}

impl LabelFilter {
    pub fn and(left: Self, right: Self) -> Self {
        Self::Binary {
            and: true,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Self, right: Self) -> Self {
        Self::Binary {
            and: false,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Short name of the node kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            LabelFilter::Noop => "noop",
            LabelFilter::Binary { .. } => "binary",
            LabelFilter::String(_) => "string",
            LabelFilter::Numeric { .. } => "numeric",
            LabelFilter::Duration { .. } => "duration",
            LabelFilter::Bytes { .. } => "bytes",
            LabelFilter::Ip { .. } => "ip",
        }
    }
}

impl fmt::Display for LabelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelFilter::Noop => Ok(()),
            LabelFilter::Binary { and, left, right } => {
                let op = if *and { "and" } else { "or" };
                write!(f, "({left} {op} {right})")
            }
            LabelFilter::String(m) => write!(f, "{m}"),
            LabelFilter::Numeric { name, op, value } => write!(f, "{name}{op}{value}"),
            LabelFilter::Duration { name, op, value } => {
                write!(f, "{name}{op}{}", format_canonical(*value))
            }
            LabelFilter::Bytes { name, op, value } => write!(f, "{name}{op}{value}B"),
            LabelFilter::Ip { name, op, pattern } => {
                write!(f, "{name}{op}ip({})", quote(pattern))
            }
        }
    }
}
