use std::sync::Arc;

use anyhow::{Context, Result};
use recipe_runner::agent::VoltAgentClient;
use recipe_runner::config::Config;
use recipe_runner::server;
use recipe_runner::service::RecipeService;
use recipe_runner::session::InMemorySessionStore;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the process environment still applies.
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;

    tracing::info!("Using agent runtime: {}", config.agent.base_url);
    tracing::info!("Using agent: {}", config.agent.agent_name);
    if !config.agent.has_platform_credentials() {
        tracing::info!("VOLTAGENT_PUBLIC_KEY/VOLTAGENT_SECRET_KEY not set");
    }

    let agent = Arc::new(VoltAgentClient::new(&config.agent));
    let sessions = Arc::new(InMemorySessionStore::with_capacity(config.session_capacity));
    let service = Arc::new(RecipeService::new(agent, sessions, config.agent.options()));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("recipe-runner listening on {}", listener.local_addr()?);

    axum::serve(listener, server::app(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
