//! LogQL expression tree → LogsQL query text
//!
//! Pure and synchronous: no I/O, no logging, no state kept between calls.
//! Identical trees always produce byte-identical output.
//!
//! - `quoting` - when field names and values need quoting
//! - `filter` - label filter trees → boolean expressions
//! - `selector` - stream selectors
//! - `stage` - pipeline stages → filters and pipes
//! - `builder` - bare-filter-before-first-pipe accumulator
//! - `aggregation` - range/vector aggregations → `stats` pipes

mod aggregation;
mod builder;
mod filter;
mod quoting;
mod selector;
mod stage;
mod template;

pub use builder::PipelineBuilder;
pub use filter::translate_label_filter;
pub use quoting::{
    is_bare_identifier, is_bare_scalar, quote_identifier_if_needed, quote_scalar_if_needed,
    quote_string,
};
pub use selector::render_stream_selector;

use serde::Serialize;

use crate::ast::{Expr, LogSelectorExpr};
use crate::error::Result;

use self::aggregation::translate_sample_expr;
use self::stage::apply_stage;

pub const DEFAULT_MAX_FILTER_DEPTH: usize = 64;

/// Knobs for a translation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Maximum nesting of `and`/`or` in a single label filter.
    ///
    /// Parsing caps it at [`crate::parser::MAX_NESTING_DEPTH`].
    pub max_filter_depth: usize,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            max_filter_depth: DEFAULT_MAX_FILTER_DEPTH,
        }
    }
}

/// Which LogsQL endpoint family the query is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Logs,
    Stats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryInfo {
    pub kind: QueryKind,
    #[serde(rename = "logsql")]
    pub text: String,
}

/// Translate a parsed expression
pub fn translate(expr: &Expr, options: &TranslateOptions) -> Result<QueryInfo> {
    match expr {
        Expr::Sample(e) => Ok(QueryInfo {
            kind: QueryKind::Stats,
            text: translate_sample_expr(e, options)?,
        }),
        Expr::Log(e) => Ok(QueryInfo {
            kind: QueryKind::Logs,
            text: translate_log_selector(e, options)?,
        }),
    }
}

pub fn translate_log_selector(expr: &LogSelectorExpr, options: &TranslateOptions) -> Result<String> {
    let b = PipelineBuilder::new(render_stream_selector(expr.selector()));
    let b = expr
        .stages()
        .iter()
        .try_fold(b, |b, stage| apply_stage(b, stage, options))?;
    Ok(b.finish())
}
