//! Tracing setup for structured logging.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit filter is usable.
///
/// The Postgres driver logs every statement at debug; keep it at warn.
pub const DEFAULT_FILTER: &str = "info,tokio_postgres=warn";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, one line per event
    #[default]
    Text,
    /// One JSON object per event, with the current span's fields
    Json,
}

impl LogFormat {
    /// `json` (or a truthy `LOG_JSON`-style value) selects JSON.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" | "1" | "true" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// `EnvFilter` directives, e.g. "info,worker=debug"
    pub filter: String,
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Text,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `RUST_LOG`, then `LOG_FORMAT` or `LOG_JSON`.
    pub fn from_env() -> Self {
        let filter = env_value("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = env_value("LOG_FORMAT")
            .or_else(|| env_value("LOG_JSON"))
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();
        Self { filter, format }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_tracing(config: TracingConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(filter = %config.filter, format = ?config.format, "Tracing initialized");
    }
}

/// Initialize tracing from `RUST_LOG` and `LOG_FORMAT`/`LOG_JSON`.
pub fn init_tracing_from_env() {
    init_tracing(TracingConfig::from_env());
}

/// Quiet tracing for tests, captured per test. Honors `RUST_LOG`.
pub fn init_test_tracing() {
    let filter = env_value("RUST_LOG").unwrap_or_else(|| "warn".to_string());
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_test_writer())
        .try_init();
}
