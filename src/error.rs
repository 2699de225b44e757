use miette::Diagnostic;
use thiserror::Error;

use crate::parser::ParseError;

/// Classification of a translation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Query text could not be parsed
    ParseFailure,
    /// Well-formed query using a construct without a LogsQL translation
    UnsupportedConstruct,
    /// Structurally impossible combination, e.g. a quantile without its parameter
    InvalidSemantics,
}

/// Structured error type for translation.
///
/// Built where the failure is detected and returned unchanged to the caller;
/// no partial query text is ever produced alongside it.
#[derive(Debug, Diagnostic, Error)]
pub enum TranslationError {
    #[error("{message}")]
    #[diagnostic(code(logql::parse))]
    ParseFailure {
        message: String,
        #[source]
        cause: Option<ParseError>,
    },

    #[error("{message}")]
    #[diagnostic(code(logql::unsupported))]
    UnsupportedConstruct {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(logql::invalid_semantics))]
    InvalidSemantics { message: String },
}

pub type Result<T> = std::result::Result<T, TranslationError>;

impl TranslationError {
    pub fn parse(message: impl Into<String>, cause: Option<ParseError>) -> Self {
        TranslationError::ParseFailure {
            message: message.into(),
            cause,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        TranslationError::UnsupportedConstruct {
            message: message.into(),
            help: None,
        }
    }

    /// Unsupported construct with a suggested manual rewrite
    pub fn unsupported_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        TranslationError::UnsupportedConstruct {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// A label filter with more nested `and`/`or` levels than `limit`
    pub fn filter_too_deep(limit: usize) -> Self {
        Self::unsupported_with_help(
            format!("label filter nesting exceeds the maximum depth of {limit}"),
            "split the filter into several consecutive `| ...` stages",
        )
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        TranslationError::InvalidSemantics {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslationError::ParseFailure { .. } => ErrorKind::ParseFailure,
            TranslationError::UnsupportedConstruct { .. } => ErrorKind::UnsupportedConstruct,
            TranslationError::InvalidSemantics { .. } => ErrorKind::InvalidSemantics,
        }
    }

    /// HTTP-equivalent status for the calling layer.
    ///
    /// Every classification is a client error: none of them is a server fault.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::ParseFailure
            | ErrorKind::UnsupportedConstruct
            | ErrorKind::InvalidSemantics => 400,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TranslationError::ParseFailure { message, .. }
            | TranslationError::UnsupportedConstruct { message, .. }
            | TranslationError::InvalidSemantics { message } => message,
        }
    }

    /// Underlying parse diagnostic, if any
    pub fn parse_cause(&self) -> Option<&ParseError> {
        match self {
            TranslationError::ParseFailure { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }
}

impl From<ParseError> for TranslationError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::FilterTooDeep { limit, .. } => TranslationError::filter_too_deep(limit),
            err => TranslationError::ParseFailure {
                message: "failed to parse LogQL".to_string(),
                cause: Some(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_status() {
        let err = TranslationError::unsupported("pattern line filters aren't supported");
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "pattern line filters aren't supported");

        let err = TranslationError::invalid("quantile_over_time requires a quantile parameter");
        assert_eq!(err.kind(), ErrorKind::InvalidSemantics);
        assert_eq!(err.status_code(), 400);

        let err = TranslationError::parse("logql query is required", None);
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.parse_cause().is_none());
    }

    #[test]
    fn test_help_is_exposed_as_diagnostic() {
        let err = TranslationError::unsupported_with_help("no", "rewrite it");
        let help = err.help().map(|h| h.to_string());
        assert_eq!(help.as_deref(), Some("rewrite it"));
    }
}
