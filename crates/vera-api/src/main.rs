//! # vera-api: Binary Entry Point
//!
//! Composes an agent from `VERA_*` environment variables, starts the
//! periodic sync task, and serves the HTTP routes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vera_agent::{compose, Agent, AgentConfig};
use vera_api::AppState;
use vera_msg::DataStore;

/// Vera agent HTTP host.
#[derive(Parser, Debug)]
#[command(name = "vera-api", version, about, long_about = None)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Public hostname. Overrides VERA_HOSTNAME.
    #[arg(long)]
    hostname: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Run one sync pass every `period`, resuming from the newest stored message
/// of each source.
fn spawn_sync(agent: Arc<Agent>, store: Arc<dyn DataStore>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let latest = match store.latest_message_timestamps().await {
                Ok(latest) => latest,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read sync positions");
                    continue;
                }
            };
            match agent.sync_services(&latest).await {
                Ok(report) => tracing::debug!(?report, "sync pass finished"),
                Err(e) => tracing::warn!(error = %e, "sync pass failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = AgentConfig::from_env()?;
    if let Some(hostname) = cli.hostname {
        config.hostname = hostname;
    }
    tracing::info!(?config, "starting agent");

    let services = compose(&config, Vec::new()).await.map_err(|e| {
        tracing::error!("agent composition failed: {e}");
        e
    })?;
    services.agent.start_sync().await?;
    spawn_sync(
        services.agent.clone(),
        services.store.clone(),
        config.sync_interval,
    );

    let app = vera_api::app(AppState::new(services));

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!("Vera agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
