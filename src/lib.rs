//! LogQL → LogsQL query translation
//!
//! ```
//! use logql_to_logsql::{translate_query, QueryKind};
//!
//! let info = translate_query(r#"sum(rate({app="nginx"}[5m]))"#).unwrap();
//! assert_eq!(info.kind, QueryKind::Stats);
//! assert_eq!(info.text, r#"{app="nginx"} _time:5m | stats rate() as value"#);
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod translate;

#[cfg(test)]
mod proptest_generators;

pub use error::{ErrorKind, Result, TranslationError};
pub use parser::{parse_query, parse_query_with_depth};
pub use translate::{translate, QueryInfo, QueryKind, TranslateOptions};

use slog::{debug, o, Logger};

/// Parse-and-translate entry point with logging.
///
/// The translation itself never logs; this wrapper records the parsed
/// expression and the outcome at `debug`.
#[derive(Clone)]
pub struct Translator {
    logger: Logger,
    options: TranslateOptions,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(TranslateOptions::default())
    }
}

impl Translator {
    pub fn new(options: TranslateOptions) -> Self {
        Self {
            logger: Logger::root(slog::Discard, o!()),
            options,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn translate_query(&self, query: &str) -> Result<QueryInfo> {
        let logger = self.logger.new(o!("query" => query.to_string()));

        let expr = parse_query_with_depth(query, self.options.max_filter_depth)
            .map_err(|err| {
                debug!(logger, "parse failed"; "error" => %err);
                err
            })?;
        debug!(logger, "parsed query"; "expr" => %expr);

        match translate(&expr, &self.options) {
            Ok(info) => {
                debug!(logger, "translated"; "kind" => ?info.kind, "logsql" => %info.text);
                Ok(info)
            }
            Err(err) => {
                debug!(logger, "translation failed"; "kind" => ?err.kind(), "error" => %err);
                Err(err)
            }
        }
    }
}

/// Translate LogQL text with default options
pub fn translate_query(query: &str) -> Result<QueryInfo> {
    Translator::default().translate_query(query)
}
