//! Typed LogQL expression tree
//!
//! Produced by [`crate::parser`] (or built directly) and consumed read-only
//! by [`crate::translate`]. Every node renders back to LogQL text via
//! `Display`, which is what log lines and error messages show.

pub mod duration;

mod operators;
pub use operators::{CompareOp, LineMatchType, MatchOp};

mod label_filter;
pub use label_filter::{LabelFilter, Matcher};

mod stage;
pub use stage::{
    FieldExtraction, LabelFormatEntry, LabelItem, LineFilter, LineFilterValue, LogfmtFlags,
    ParserKind, Stage,
};

mod sample;
pub use sample::{
    Grouping, LogRange, RangeAggregation, RangeOp, SampleExpr, Unwrap, UnwrapConversion,
    VectorAggregation, VectorOp,
};

use std::fmt;

use itertools::Itertools;

pub(crate) use crate::translate::quote_string as quote;

/// `{name="value", ...}`; matchers keep their written order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSelector {
    pub matchers: Vec<Matcher>,
}

impl StreamSelector {
    pub fn new(matchers: Vec<Matcher>) -> Self {
        Self { matchers }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineExpr {
    pub selector: StreamSelector,
    pub stages: Vec<Stage>,
}

/// A plain log query
#[derive(Debug, Clone, PartialEq)]
pub enum LogSelectorExpr {
    Matchers(StreamSelector),
    Pipeline(PipelineExpr),
}

impl LogSelectorExpr {
    pub fn selector(&self) -> &StreamSelector {
        match self {
            LogSelectorExpr::Matchers(s) => s,
            LogSelectorExpr::Pipeline(p) => &p.selector,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        match self {
            LogSelectorExpr::Matchers(_) => &[],
            LogSelectorExpr::Pipeline(p) => &p.stages,
        }
    }
}

/// Root of a parsed query
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Log(LogSelectorExpr),
    Sample(SampleExpr),
}

impl fmt::Display for StreamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.matchers.iter().join(", "))
    }
}

impl fmt::Display for LogSelectorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector())?;
        for stage in self.stages() {
            write!(f, " {stage}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Log(e) => write!(f, "{e}"),
            Expr::Sample(e) => write!(f, "{e}"),
        }
    }
}
