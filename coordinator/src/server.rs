use std::time::Duration;

use anyhow::Result;
use tokio::{net::TcpListener, time::sleep};
use tracing::info;

use crate::{handlers, state::AppState, sweeper};

#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    pub sweep_interval: Duration,
    /// Cuánto seguir atendiendo después de que el job terminó.
    pub linger: Duration,
}

/// Atiende RPCs hasta que el job termina (más `linger`) o llega Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState, opts: ServeOptions) -> Result<()> {
    let app = handlers::build_router(state.clone());

    // barrido de leases en segundo plano
    tokio::spawn(sweeper::run_lease_sweeper(
        state.clone(),
        opts.sweep_interval,
    ));

    info!("coordinator escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state, opts.linger))
        .await?;

    info!("coordinator detenido");
    Ok(())
}

async fn shutdown_signal(state: AppState, linger: Duration) {
    tokio::select! {
        _ = wait_until_done(state, linger) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C recibido, cerrando");
        }
    }
}

// Igual que el driver externo: pregunta cada segundo si el job terminó.
async fn wait_until_done(state: AppState, linger: Duration) {
    while !state.scheduler.is_done() {
        sleep(Duration::from_secs(1)).await;
    }
    info!("job completo, se sigue atendiendo {:?} más", linger);
    sleep(linger).await;
}
