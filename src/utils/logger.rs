use crate::utils::error::{Result, ScrapeError};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{Dispatch, Level};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("amazon_scraper=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("amazon_scraper=info"))
    }
}

fn console_layer(verbose: bool, json: bool) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        layer.json().with_filter(default_filter(verbose)).boxed()
    } else {
        layer.compact().with_filter(default_filter(verbose)).boxed()
    }
}

pub fn init_cli_logger(verbose: bool, json: bool) {
    tracing_subscriber::registry()
        .with(vec![console_layer(verbose, json)])
        .init();
}

/// Maps configured level names to tracing levels. `success` is an INFO alias.
pub fn parse_level(name: &str) -> Result<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" | "success" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "critical" => Ok(Level::ERROR),
        other => Err(ScrapeError::InvalidConfigValueError {
            field: "options.log_levels".to_string(),
            value: other.to_string(),
            reason: "Unknown log level. Valid levels: trace, debug, info, success, warning, error"
                .to_string(),
        }),
    }
}

/// Builds a dispatcher for a single scrape run: console output plus one
/// `<level>.log` file per configured level inside `output_dir`.
pub fn run_dispatch(
    verbose: bool,
    json: bool,
    output_dir: &Path,
    levels: &[String],
) -> Result<Dispatch> {
    if !levels.is_empty() {
        std::fs::create_dir_all(output_dir)?;
    }

    let mut layers = vec![console_layer(verbose, json)];
    let mut seen = HashSet::new();

    for name in levels {
        let level = parse_level(name)?;
        let name = name.trim().to_ascii_lowercase();
        // 同一等級只開一個檔案，否則每行會寫兩次
        if !seen.insert(name.clone()) {
            continue;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(output_dir.join(format!("{}.log", name)))?;

        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_filter(Targets::new().with_target("amazon_scraper", level))
                .boxed(),
        );
    }

    Ok(Dispatch::new(tracing_subscriber::registry().with(layers)))
}
