//! Accumulator for LogsQL query text

/// LogsQL query under construction.
///
/// Filters written before the first pipe are appended bare after the
/// selector (implicit AND); once a pipe has been emitted every further
/// filter becomes an explicit `| filter ...` pipe.
///
/// Each call consumes the builder and returns it, so stages fold over it
/// left to right and an error anywhere drops the partial text.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    text: String,
    has_pipe: bool,
}

impl PipelineBuilder {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            text: selector.into(),
            has_pipe: false,
        }
    }

    pub fn has_pipe(&self) -> bool {
        self.has_pipe
    }

    pub fn pipe(mut self, pipe: impl AsRef<str>) -> Self {
        self.has_pipe = true;
        self.text.push_str(" | ");
        self.text.push_str(pipe.as_ref());
        self
    }

    /// Append a boolean condition; empty conditions are skipped
    pub fn filter(mut self, filter: impl AsRef<str>) -> Self {
        let f = filter.as_ref().trim();
        if f.is_empty() {
            return self;
        }
        if self.has_pipe {
            return self.pipe(format!("filter {f}"));
        }
        self.text.push(' ');
        self.text.push_str(f);
        self
    }

    pub fn filters<I>(self, filters: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        filters.into_iter().fold(self, |b, f| b.filter(f))
    }

    pub fn finish(self) -> String {
        self.text.trim().to_string()
    }
}
