use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use coordinator::{serve, AppState, CoordinatorConfig, Scheduler, ServeOptions};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("coordinator=info,mrcoordinator=info,tower_http=info")
        }))
        .init();

    let config = CoordinatorConfig::parse();
    let spec = config.job_spec()?;
    let scheduler = Scheduler::new(spec)?;
    let state = AppState::new(scheduler);

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", config.listen))?;

    serve(
        listener,
        state,
        ServeOptions {
            sweep_interval: config.sweep_interval(),
            linger: config.linger(),
        },
    )
    .await
}
