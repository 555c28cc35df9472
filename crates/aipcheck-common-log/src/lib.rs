//! Logging infrastructure for aipcheck.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum level, used unless `directives` parse.
    pub level: LogLevel,
    /// `RUST_LOG`-style directives, taken from `RUST_LOG` only when
    /// `AIPCHECK_LOG_LEVEL` is unset.
    pub directives: Option<String>,
    pub format: LogFormat,
    /// Extra sink; events are appended without ANSI colors.
    pub file_path: Option<PathBuf>,
    pub timestamps: bool,
    /// Emit file and line of each event.
    pub source_location: bool,
    /// Emit span open/close events, useful for timing rule runs.
    pub span_events: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
    ];

    /// Case-insensitive; `warning` is accepted for `warn`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("warning") {
            return Some(Self::Warn);
        }
        Self::ALL
            .into_iter()
            .find(|level| level.as_directive().eq_ignore_ascii_case(s))
    }

    fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse from string. Unknown values fall back to pretty.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            directives: None,
            format: LogFormat::Pretty,
            timestamps: true,
            file_path: None,
            span_events: false,
            source_location: false,
        }
    }
}

/// Environment variable names read by [`LogConfig::from_env`].
pub mod vars {
    pub const AIPCHECK_LOG_LEVEL: &str = "AIPCHECK_LOG_LEVEL";
    pub const AIPCHECK_LOG_FORMAT: &str = "AIPCHECK_LOG_FORMAT";
    pub const AIPCHECK_LOG_FILE: &str = "AIPCHECK_LOG_FILE";
    pub const AIPCHECK_LOG_SOURCE: &str = "AIPCHECK_LOG_SOURCE";
    pub const AIPCHECK_LOG_SPANS: &str = "AIPCHECK_LOG_SPANS";
    pub const RUST_LOG: &str = "RUST_LOG";
}

fn flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

impl LogConfig {
    /// Defaults overridden by the `AIPCHECK_LOG_*` variables.
    pub fn from_env() -> Self {
        let mut config = LogConfig::default();

        let explicit = std::env::var(vars::AIPCHECK_LOG_LEVEL).ok();
        if let Some(level) = explicit.as_deref().and_then(LogLevel::parse) {
            config.level = level;
        } else if let Ok(directives) = std::env::var(vars::RUST_LOG) {
            if let Some(level) = LogLevel::parse(&directives) {
                config.level = level;
            }
            config.directives = Some(directives).filter(|d| !d.trim().is_empty());
        }

        if let Ok(format) = std::env::var(vars::AIPCHECK_LOG_FORMAT) {
            config.format = LogFormat::parse(&format);
        }

        if let Ok(file_path) = std::env::var(vars::AIPCHECK_LOG_FILE) {
            config.file_path = Some(file_path.into());
        }

        if let Ok(source_location) = std::env::var(vars::AIPCHECK_LOG_SOURCE) {
            config.source_location = flag(&source_location);
        }

        if let Ok(span_events) = std::env::var(vars::AIPCHECK_LOG_SPANS) {
            config.span_events = flag(&span_events);
        }

        config
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn format_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(span_events);

    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => base.boxed(),
        (LogFormat::Pretty, false) => base.without_time().boxed(),
        (LogFormat::Compact, true) => base.compact().boxed(),
        (LogFormat::Compact, false) => base.compact().without_time().boxed(),
        (LogFormat::Json, true) => base.json().boxed(),
        (LogFormat::Json, false) => base.json().without_time().boxed(),
    }
}

fn env_filter(config: &LogConfig) -> EnvFilter {
    config
        .directives
        .as_deref()
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(config.level.as_directive()))
}

/// Install the global subscriber. Fails if one is already installed.
///
/// Output always goes to stderr; when `file_path` is set the same events are
/// appended to that file without ANSI colors.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = env_filter(&config);

    let mut layers: Vec<BoxedLayer> = vec![format_layer(&config, io::stderr, true)];

    if let Some(file_path) = &config.file_path {
        let file = File::options().create(true).append(true).open(file_path)?;
        layers.push(format_layer(&config, Mutex::new(file), false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(String),

    #[error("cannot open log file: {0}")]
    LogFile(#[from] io::Error),
}

pub use tracing::{debug, error, info, trace, warn};

/// Validation spans and timing.
pub mod spans;
