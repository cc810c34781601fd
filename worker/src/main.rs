use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::apps::{app_by_name, APP_NAMES};
use worker::{run_worker, HttpCoordinator, WorkerConfig, WorkerOptions};

async fn run(config: WorkerConfig) -> Result<()> {
    let app = app_by_name(&config.app).ok_or_else(|| {
        anyhow!(
            "app desconocida '{}', opciones: {}",
            config.app,
            APP_NAMES.join(", ")
        )
    })?;

    // Nombre de host (solo para info)
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let client = HttpCoordinator::new(&config.master_url, config.rpc_timeout())?;
    let opts = WorkerOptions {
        worker_id: config.worker_id(),
        poll_interval: config.poll_interval(),
    };

    info!(
        "worker {} en {} (app={}) contra {}",
        opts.worker_id,
        hostname,
        config.app,
        client.base_url()
    );

    run_worker(&client, app, opts).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("worker=info,mrworker=info,common=info,reqwest=info")
        }))
        .init();

    let config = WorkerConfig::parse();

    if let Err(e) = run(config).await {
        error!("worker termina con error: {:#}", e);
        std::process::exit(1);
    }
}
