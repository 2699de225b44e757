use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use logql_to_logsql::translate::DEFAULT_MAX_FILTER_DEPTH;
use logql_to_logsql::{TranslateOptions, TranslationError, Translator};
use slog::{o, Drain, Level, Logger};

/// Translate a LogQL query into LogsQL
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// LogQL query; `-` or nothing reads it from stdin
    query: Option<String>,

    /// Deepest and/or nesting accepted in one label filter
    #[arg(long, default_value_t = DEFAULT_MAX_FILTER_DEPTH)]
    max_filter_depth: usize,

    /// Print {"kind": ..., "logsql": ...} instead of the bare query
    #[arg(long)]
    json: bool,

    /// Log parsing and translation steps to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let query = match args.query.as_deref() {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read query from stdin")?;
            buf
        }
        Some(q) => q.to_string(),
    };

    let translator = Translator::new(TranslateOptions {
        max_filter_depth: args.max_filter_depth,
    })
    .with_logger(build_logger(args.verbose));

    match translator.translate_query(&query) {
        Ok(info) if args.json => {
            println!("{}", serde_json::to_string(&info)?);
            Ok(ExitCode::SUCCESS)
        }
        Ok(info) => {
            println!("{}", info.text);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report(err);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build_logger(verbose: bool) -> Logger {
    let level = if verbose { Level::Debug } else { Level::Warning };
    let decorator = slog_term::PlainSyncDecorator::new(std::io::stderr());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    Logger::root(drain, o!())
}

/// Parse failures render the underlying diagnostic so the source span shows
fn report(err: TranslationError) {
    let report = match err.parse_cause().cloned() {
        Some(cause) => miette::Report::new(cause),
        None => miette::Report::new(err),
    };
    eprintln!("{report:?}");
}
