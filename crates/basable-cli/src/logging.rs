//! Logging setup for the `basable` binary
//!
//! Console logs go to stderr so table output on stdout stays clean. An
//! optional JSON layer writes daily-rotated files under the data directory.
//! `RUST_LOG` overrides the configured filter.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for JSON log files
    pub log_dir: PathBuf,

    pub enable_json_logs: bool,

    pub enable_console_logs: bool,

    /// Include file/line in console output
    pub include_location: bool,

    /// Log span open/close (request timings)
    pub enable_spans: bool,

    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LoggingConfig {
    /// Warnings only on the console, no files
    pub fn production() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: false,
            enable_spans: false,
            default_filter: "warn".to_string(),
        }
    }

    /// Verbose console output with request spans
    pub fn development() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: true,
            enable_spans: true,
            default_filter: "info,basable_core=debug,basable_http=debug,basable_services=debug"
                .to_string(),
        }
    }

    /// Console only, everything
    #[allow(dead_code)]
    pub fn testing() -> Self {
        Self {
            log_dir: std::env::temp_dir().join("basable-tests"),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: true,
            enable_spans: true,
            default_filter: "debug".to_string(),
        }
    }

    /// Preset for `-v` count: 0 warn, 1 info, 2+ development
    pub fn for_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::production(),
            1 => Self {
                default_filter: "warn,basable_http=info,basable_services=info".to_string(),
                ..Self::production()
            },
            _ => Self::development(),
        }
    }

    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.enable_json_logs = enabled;
        self
    }
}

/// Install the global subscriber.
///
/// With JSON logs enabled the returned guard must live until the process
/// exits; dropping it flushes the file writer.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let span_events = if config.enable_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_location)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .compact()
            .with_filter(env_filter.clone())
            .boxed();

        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "basable.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).init();

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        "Logging initialized"
    );

    Ok(guard)
}

/// `<data dir>/basable/logs`
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("basable")
        .join("logs")
}
