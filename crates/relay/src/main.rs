use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use alert_relay::{
    config::Config,
    convert::Converter,
    metrics,
    notify::{Notifier, TelephoneNotifier},
    server::Server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    metrics::register_metrics();

    // Load configuration from a YAML file if one is given, else from the environment
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    info!("Loaded configuration: {:?}", config);

    let converter = Converter::new(config.converter.clone());

    // One notifier for the process lifetime, shared with every request
    let telephone: Option<Arc<dyn Notifier>> = match config.telephone.clone() {
        Some(telephone_config) => Some(Arc::new(TelephoneNotifier::new(telephone_config).await?)),
        None => {
            warn!("TELEPHONE_BASE_URL is not set. The telephone channel is disabled.");
            None
        }
    };

    let server = Server::new(converter, telephone);

    info!("Starting server on {}", config.server.addr);
    server.start(&config.server.addr).await?;

    Ok(())
}
