//! `{{ .field }}` template substitution to LogsQL `<field>` placeholders

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, TranslationError};

static TEMPLATE_VAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*\.\s*([a-zA-Z0-9_.:-]+)\s*\}\}").expect("template variable regex")
});

/// Rewrite every `{{ .field }}` into `<field>`.
///
/// Anything else left inside `{{ }}` is a template function or pipeline,
/// which LogsQL `format` cannot express.
pub fn convert_template(template: &str) -> Result<String> {
    let converted = TEMPLATE_VAR_RE.replace_all(template, "<$1>");
    if converted.contains("{{") {
        return Err(TranslationError::unsupported_with_help(
            format!("template functions aren't supported in {template:?}"),
            "use only plain {{ .field }} substitutions; apply other transformations after the query runs",
        ));
    }
    Ok(converted.into_owned())
}
