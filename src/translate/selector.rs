//! Stream selector rendering

use itertools::Itertools;

use crate::ast::StreamSelector;

use super::quoting::quote_string;

/// `{}` when empty, otherwise `{name="value",...}` in written order.
///
/// LogsQL accepts the same stream filter syntax, so operators are kept as-is.
pub fn render_stream_selector(selector: &StreamSelector) -> String {
    let matchers = selector
        .matchers
        .iter()
        .map(|m| format!("{}{}{}", m.name, m.op, quote_string(&m.value)))
        .join(",");
    format!("{{{matchers}}}")
}
