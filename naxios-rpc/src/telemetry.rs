//! Tracing subscriber setup.
//!
//! Libraries only emit events; applications call [`init_tracing`] once at
//! startup to see them.

use naxios_core::{ConfigError, NaxiosResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `NAXIOS_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "naxios=info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                field: "NAXIOS_LOG_FORMAT".to_string(),
                value: other.to_string(),
                reason: "expected 'json' or 'pretty'".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `naxios=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl TelemetryConfig {
    /// Read `NAXIOS_LOG` and `NAXIOS_LOG_FORMAT`, falling back to defaults.
    pub fn from_env() -> NaxiosResult<Self> {
        let filter = std::env::var("NAXIOS_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        let format = match std::env::var("NAXIOS_LOG_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => LogFormat::default(),
        };
        Ok(Self { filter, format })
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

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Fails if the filter directive does not parse or a global subscriber is
/// already installed.
pub fn init_tracing(config: &TelemetryConfig) -> NaxiosResult<()> {
    let env_filter = EnvFilter::try_new(&config.filter).map_err(|e| ConfigError::InvalidValue {
        field: "NAXIOS_LOG".to_string(),
        value: config.filter.clone(),
        reason: e.to_string(),
    })?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    installed.map_err(|e| ConfigError::InvalidValue {
        field: "tracing subscriber".to_string(),
        value: "global".to_string(),
        reason: format!("Failed to init subscriber: {}", e),
    })?;

    tracing::info!(
        filter = %config.filter,
        format = ?config.format,
        "Telemetry initialized"
    );

    Ok(())
}
