pub mod config;
pub mod error;

pub use config::{
    Config, ConfigResult, DatabaseConfig, LoggingConfig, ServerConfig, Units, ValidationResult,
    WeatherConfig,
};
pub use error::{
    AppError, ConfigError, DatabaseError, ReqwestErrorExt, RusqliteErrorExt, ValidationError,
    WeatherError,
};

use anyhow::Result;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` is used as the filter.
pub fn init(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("wxlog core initialized");
    Ok(())
}
