//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Default directives when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,tower_http=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable lines for local development.
    Text,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value. Unknown values fall back to JSON.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directives; `None` means `RUST_LOG` or [`DEFAULT_FILTER`].
    pub filter: Option<String>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self {
            format: std::env::var("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            filter: None,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: None,
        }
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(settings: LogSettings) -> bool {
    let filter = settings.env_filter();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    match settings.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Text => builder.try_init().is_ok(),
    }
}
