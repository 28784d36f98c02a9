// Logging System for Kestrel
//
// A thin configuration layer over the `tracing` ecosystem. The runtime itself
// only emits `tracing` events; applications pick how they are rendered by
// calling one of the initializers below once at startup.
//
// # Usage Examples
//
// ```rust
// use kestrel::logging;
//
// // INFO level, human-readable console output
// logging::init_default();
//
// // Or DEBUG level with runtime internals at TRACE
// logging::init_development();
//
// // Or JSON lines for log shippers
// logging::init_production();
// ```
//
// ## Runtime Macros
//
// ```rust
// use kestrel::{log_lifecycle, runtime_span};
//
// let span = runtime_span!("summarizer-1");
// let _guard = span.enter();
// log_lifecycle!("summarizer-1", "created");
// ```

use std::io;
use std::sync::Once;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Configuration for the Kestrel logging system
///
/// # Examples
///
/// ```rust
/// use kestrel::logging::LogConfig;
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     target_filters: Some("kestrel::runtime=trace".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

// Initialization guard to ensure we only initialize once
static INIT: Once = Once::new();

fn env_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());

    if let Some(filters) = &config.target_filters {
        for filter in filters.split(',') {
            if let Ok(directive) = filter.trim().parse() {
                env_filter = env_filter.add_directive(directive);
            }
        }
    }
    env_filter
}

/// Initialize the logging system with the given configuration
///
/// Sets up the global tracing subscriber. Safe to call multiple times; only
/// the first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(output_layer(&config, atty::is(atty::Stream::Stdout), io::stdout));

        set_global_subscriber(subscriber);
    });
}

// Builds one output layer honouring the format, timestamp, file/line and thread settings
fn output_layer<S, W>(config: &LogConfig, ansi: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi && !config.json_format)
        .with_file(config.show_file_line)
        .with_line_number(config.show_file_line)
        .with_thread_names(config.show_thread_info)
        .with_thread_ids(config.show_thread_info);

    match (config.json_format, config.show_time) {
        (true, true) => layer.json().flatten_event(true).boxed(),
        (true, false) => layer.json().flatten_event(true).without_time().boxed(),
        (false, true) => layer.boxed(),
        (false, false) => layer.without_time().boxed(),
    }
}

// Helper function to set the global subscriber
fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Opens `path` in append mode, creating it if needed.
pub fn file_writer(path: &str) -> io::Result<Box<dyn io::Write + Send + Sync + 'static>> {
    use std::fs::OpenOptions;

    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(Box::new(file))
}

/// Initialize logging with both console and file output
///
/// Both outputs follow `config`; only the console uses ANSI colors.
///
/// # Errors
/// Returns an error if the log file cannot be opened.
pub fn init_with_file(config: LogConfig, log_file: &str) -> Result<(), io::Error> {
    // Fail early on an unusable path instead of silently falling back later.
    drop(file_writer(log_file)?);

    INIT.call_once(|| {
        let log_file_path = log_file.to_string();
        let file_sink = move || match file_writer(&log_file_path) {
            Ok(writer) => writer,
            Err(_) => Box::new(io::stderr()),
        };

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(output_layer(&config, atty::is(atty::Stream::Stdout), io::stdout))
            .with(output_layer(&config, false, file_sink));

        set_global_subscriber(subscriber);
    });

    Ok(())
}

/// INFO level, human-readable console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// Detailed logs for development
///
/// - DEBUG level for all Kestrel modules
/// - TRACE level for the runtime loop
/// - Colorized console output with file/line information
pub fn init_development() {
    let config = LogConfig {
        level: Level::DEBUG,
        json_format: false,
        show_file_line: true,
        show_thread_info: true,
        show_time: true,
        target_filters: Some("kestrel=debug,kestrel::runtime=trace".to_string()),
    };
    init(config);
}

/// INFO level JSON output without file/line information.
pub fn init_production() {
    let config = LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: false,
        show_time: true,
        target_filters: None,
    };
    init(config);
}

/// Quiet logging for tests: warnings and errors only, no timestamps.
pub fn init_test() {
    let config = LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    };
    init(config);
}

/// Create a span for work done on behalf of one runtime instance
///
/// ```rust
/// use kestrel::runtime_span;
///
/// let span = runtime_span!("summarizer-1");
/// let span = runtime_span!("summarizer-1", activity_id = "a-17");
/// ```
#[macro_export]
macro_rules! runtime_span {
    ($runtime_id:expr) => {
        tracing::info_span!("runtime", id = %$runtime_id)
    };
    ($runtime_id:expr, $($fields:tt)*) => {
        tracing::info_span!("runtime", id = %$runtime_id, $($fields)*)
    };
}

/// Log runtime instance lifecycle events (created, terminated, ...)
///
/// ```rust
/// use kestrel::log_lifecycle;
///
/// log_lifecycle!("summarizer-1", "terminated");
/// log_lifecycle!("summarizer-1", "created", prioritized = true);
/// ```
#[macro_export]
macro_rules! log_lifecycle {
    ($runtime_id:expr, $event:expr) => {
        tracing::info!(runtime_id = %$runtime_id, event = $event)
    };
    ($runtime_id:expr, $event:expr, $($fields:tt)*) => {
        tracing::info!(runtime_id = %$runtime_id, event = $event, $($fields)*)
    };
}

/// Log activity processing steps
///
/// ```rust
/// use kestrel::log_activity;
///
/// log_activity!("COMMAND", "processed", duration_ms = 4.5);
/// ```
#[macro_export]
macro_rules! log_activity {
    ($kind:expr, $status:expr) => {
        tracing::debug!(kind = %$kind, status = $status)
    };
    ($kind:expr, $status:expr, $($fields:tt)*) => {
        tracing::debug!(kind = %$kind, status = $status, $($fields)*)
    };
}
