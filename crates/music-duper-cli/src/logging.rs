use std::env;
use std::path::Path;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "warn,music_duper=info,music_duper_core=info";
const DEFAULT_LOG_FILE: &str = "./logs/music-duper.log";

/// Console output for the user plus a plain-text log file for every run.
///
/// `TRACING_LEVEL` takes an `EnvFilter` directive (default: info for this
/// tool, warn for dependencies). `LOG_FILE_PATH` names the log file. Keep the
/// returned guard alive until exit so buffered lines reach the file.
pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let filter_layer = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let log_file_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let log_file = Path::new(&log_file_path);
    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .map(|f| f.to_os_string())
        .unwrap_or_else(|| "music-duper.log".into());

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_thread_names(true),
        )
        .with(filter_layer)
        .init();

    debug!("Logging to stdout and {}", log_file.display());

    guard
}
