use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use common::{FetchStatus, MapReduceApp, ReportJobRequest, TaskKind, WorkerId};

use crate::{client::CoordinatorClient, executor};

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub worker_id: WorkerId,
    /// Espera entre pedidos cuando el coordinator responde NO_PENDING.
    pub poll_interval: Duration,
}

/// Lo que hizo el worker hasta recibir ALL_DONE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub maps_done: u32,
    pub reduces_done: u32,
    pub failed: u32,
}

/// Loop principal del worker:
/// - pide tarea; si no hay, duerme `poll_interval` y vuelve a pedir
/// - ejecuta map o reduce en un hilo de bloqueo
/// - reporta el resultado
///
/// Sale con `Ok` al recibir ALL_DONE y con `Err` ante cualquier fallo de
/// transporte.
pub async fn run_worker<C: CoordinatorClient>(
    client: &C,
    app: Arc<dyn MapReduceApp>,
    opts: WorkerOptions,
) -> Result<WorkerSummary> {
    let worker_id = opts.worker_id;
    let mut summary = WorkerSummary::default();

    loop {
        let resp = client.get_job(worker_id).await.context("GetJob falló")?;

        match resp.status {
            FetchStatus::AllDone => {
                info!("worker {}: no quedan tareas, saliendo ({:?})", worker_id, summary);
                return Ok(summary);
            }
            FetchStatus::NoPending => {
                debug!(
                    "worker {}: no hay tareas libres, esperando {:?}",
                    worker_id, opts.poll_interval
                );
                sleep(opts.poll_interval).await;
                continue;
            }
            FetchStatus::Success => {}
        }

        let Some(task) = resp.task() else {
            warn!("worker {}: respuesta SUCCESS sin tipo de tarea, se ignora", worker_id);
            sleep(opts.poll_interval).await;
            continue;
        };

        info!(
            "worker {}: tengo tarea {} {} (input={} output={})",
            worker_id, task.kind, task.id, task.input, task.output
        );

        let reducers = resp.reducer_count;
        let app_cloned = app.clone();
        let task_cloned = task.clone();
        let handle = tokio::task::spawn_blocking(move || {
            executor::execute(app_cloned.as_ref(), &task_cloned, reducers)
        });

        let success = match handle.await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("worker {}: error en tarea {} {}: {:#}", worker_id, task.kind, task.id, e);
                false
            }
            Err(e) => {
                warn!(
                    "worker {}: panic o join error en tarea {} {}: {:?}",
                    worker_id, task.kind, task.id, e
                );
                false
            }
        };

        let ack = client
            .report_job(ReportJobRequest {
                worker_id,
                job_type: task.kind,
                job_id: task.id,
                success,
            })
            .await
            .context("ReportJob falló")?;
        debug!(
            "worker {}: reporte de {} {} -> status {}",
            worker_id, task.kind, task.id, ack.status
        );

        match (success, task.kind) {
            (false, _) => summary.failed += 1,
            (true, TaskKind::Map) => summary.maps_done += 1,
            (true, TaskKind::Reduce) => summary.reduces_done += 1,
        }
    }
}
