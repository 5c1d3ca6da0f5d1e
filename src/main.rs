mod api;
mod app;
mod web;

use anyhow::Result;
use wxlog_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, validation) = Config::load_validated()?;

    wxlog_core::init(&config.logging.level)?;

    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let app = app::App::new(config)?;
    tracing::info!(
        "wxlog starting with {} units by default",
        app.config().weather.default_units
    );

    app.run().await
}
