use std::sync::Arc;

use anyhow::Result;
use wxlog_core::Config;
use wxlog_services::WeatherRequestService;

use crate::web;

/// Application state and lifecycle.
pub struct App {
    config: Arc<Config>,
    service: WeatherRequestService,
}

impl App {
    /// Open the store and build the weather clients from `config`.
    pub fn new(config: Config) -> Result<Self> {
        let service = WeatherRequestService::from_config(&config)?;
        tracing::info!("Using database at {}", config.database.path);

        Ok(Self {
            config: Arc::new(config),
            service,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serve the HTTP API until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.bind_address();
        web::run(&addr, self.service).await?;
        tracing::info!("Shutting down application");
        Ok(())
    }
}
