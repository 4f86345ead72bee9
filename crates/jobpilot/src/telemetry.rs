//! Tracing setup for the autopilot binaries. `RUST_LOG` wins when set;
//! otherwise the configured level applies with the HTTP stack capped at warn
//! so oracle retries do not drown the pipeline logs.

use crate::config::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{value}'")]
    Filter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("telemetry init failed: {0}")]
    Init(Box<dyn std::error::Error + Send + Sync>),
}

fn fallback_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    let value = format!("{log_level},hyper=warn,reqwest=warn");
    EnvFilter::try_new(&value).map_err(|source| TelemetryError::Filter { value, source })
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => fallback_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Init)
}
