mod app;
mod config;
mod db;
mod error;
mod events;
mod identity;
mod orders;
mod state;
#[cfg(test)]
mod testing;
mod users;
mod utils;
mod webhooks;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "evently=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    info!(clerk_api = %app_state.config.clerk.api_url, "state initialised");

    let mut revalidations = app_state.subscribe_revalidation();
    tokio::spawn(async move {
        loop {
            match revalidations.recv().await {
                Ok(path) => info!(%path, "revalidate cached views"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "revalidation signals dropped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    app::serve(app::build_app(app_state)).await
}
