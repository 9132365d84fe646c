pub mod cli;
pub mod core;
pub mod providers;
pub mod render;
pub mod widget;

use crate::core::config::AppConfig;
use crate::core::rates::RateProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Convert(cli::convert::ConvertOptions),
    Rates { base: Option<String> },
    Watch {
        from: Option<String>,
        to: Option<String>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxconv starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider: Arc<dyn RateProvider> = Arc::new(
        providers::ExchangeRateApiProvider::new(&config.provider.base_url)?,
    );

    match command {
        AppCommand::Convert(options) => cli::convert::run(&config, provider, options).await,
        AppCommand::Rates { base } => {
            let base = base.unwrap_or_else(|| config.base_currency.clone());
            cli::rates::run(provider.as_ref(), &base, &config.target_currency).await
        }
        AppCommand::Watch { from, to } => cli::watch::run(&config, provider, from, to).await,
    }
}
