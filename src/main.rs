use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use royale_bot::api::{self, AppState};
use royale_bot::clash::ClashClient;
use royale_bot::config::Config;
use royale_bot::metrics;
use royale_bot::store::Store;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    metrics::register_metrics();

    let store = Store::open(config.data_file.clone())
        .await
        .expect("Failed to open registration store");
    let store = Arc::new(store);

    let stats = Arc::new(ClashClient::new(
        config.api_base.clone(),
        config.api_token.clone(),
    ));

    let app = api::router(AppState::new(config.public_key, store, stats));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("royale-bot listening on {addr}");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
