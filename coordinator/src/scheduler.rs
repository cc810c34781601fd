use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use common::{
    GetJobResponse, JobStatusResponse, LocalIntermediateStore, Phase, ReportJobRequest,
    ReportJobResponse, TaskKind, WorkerId,
};

use crate::registry::{JobError, JobSpec, ReportOutcome, TaskRegistry};

/// Estado mutable del coordinator. Sólo se toca con el lock del `Scheduler`.
#[derive(Debug)]
struct SchedulerState {
    registry: TaskRegistry,
    phase: Phase,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl SchedulerState {
    /// Avanza Mapping -> Reducing -> Done mientras la fase actual esté completa.
    fn advance_phase(&mut self) {
        loop {
            let next = match self.phase {
                Phase::Mapping if self.registry.phase_complete(TaskKind::Map) => Phase::Reducing,
                Phase::Reducing if self.registry.phase_complete(TaskKind::Reduce) => Phase::Done,
                _ => return,
            };

            info!("fase {:?} -> {:?}", self.phase, next);
            self.phase = next;
            if next == Phase::Done {
                self.finished_at = Some(Utc::now());
            }
        }
    }

    fn offered_kind(&self) -> Option<TaskKind> {
        match self.phase {
            Phase::Mapping => Some(TaskKind::Map),
            Phase::Reducing => Some(TaskKind::Reduce),
            Phase::Done => None,
        }
    }
}

/// Servicio del coordinator: registry + máquina de fases detrás de un único lock.
#[derive(Debug)]
pub struct Scheduler {
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    /// Arma el job y limpia los intermedios de corridas anteriores: el reduce
    /// lee todo `mr-*-<p>` del directorio y no distingue de qué job vienen.
    pub fn new(spec: JobSpec) -> Result<Self, JobError> {
        let registry = TaskRegistry::new(&spec)?;

        let removed = LocalIntermediateStore::new(&spec.intermediate_dir).clear()?;
        if removed > 0 {
            warn!(
                "se borraron {} archivos intermedios viejos de {}",
                removed,
                spec.intermediate_dir.display()
            );
        }
        info!(
            "job creado: {} tareas map, {} reducers, lease de {:?}",
            registry.list_tasks(TaskKind::Map).len(),
            registry.reducer_count(),
            spec.lease_duration
        );

        let mut state = SchedulerState {
            registry,
            phase: Phase::Mapping,
            started_at: Utc::now(),
            finished_at: None,
        };
        // sin archivos de entrada el map ya está completo
        state.advance_phase();

        Ok(Self {
            state: Mutex::new(state),
        })
    }

    // Ninguna operación deja el estado a medias, así que un lock envenenado
    // se puede seguir usando.
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// GetJob: recupera leases vencidos y ofrece una tarea de la fase actual.
    pub fn fetch_task(&self, worker_id: WorkerId, now: Instant) -> GetJobResponse {
        let mut state = self.lock();
        state.registry.reclaim_expired(now);

        let reducers = state.registry.reducer_count();
        let Some(kind) = state.offered_kind() else {
            debug!("worker {} pidió tarea pero el job terminó", worker_id);
            return GetJobResponse::all_done(reducers);
        };

        match state.registry.try_assign(kind, worker_id, now) {
            Ok(task) => {
                info!(
                    "asignando tarea {} {} (input={} output={}) al worker {}",
                    task.kind, task.id, task.input, task.output, worker_id
                );
                GetJobResponse::assigned(task, reducers)
            }
            Err(e) => {
                debug!("worker {} pidió tarea: {}", worker_id, e);
                GetJobResponse::no_pending(reducers)
            }
        }
    }

    /// ReportJob: aplica el resultado y, si corresponde, cambia de fase.
    pub fn report_job(&self, req: &ReportJobRequest) -> ReportJobResponse {
        let mut state = self.lock();
        let outcome = state
            .registry
            .report_result(req.job_type, req.job_id, req.worker_id, req.success);

        match outcome {
            ReportOutcome::Completed => info!(
                "tarea {} {} completada por el worker {}",
                req.job_type, req.job_id, req.worker_id
            ),
            ReportOutcome::Failed => warn!(
                "tarea {} {} falló en el worker {}, vuelve a la cola",
                req.job_type, req.job_id, req.worker_id
            ),
            ReportOutcome::Stale => debug!(
                "reporte viejo de la tarea {} {} (worker {}), se ignora",
                req.job_type, req.job_id, req.worker_id
            ),
            ReportOutcome::UnknownTask => debug!(
                "reporte de tarea desconocida {} {} (worker {})",
                req.job_type, req.job_id, req.worker_id
            ),
        }

        if outcome == ReportOutcome::Completed {
            state.advance_phase();
        }

        ReportJobResponse {
            status: if outcome.changed_state() {
                ReportJobResponse::ACCEPTED
            } else {
                ReportJobResponse::IGNORED
            },
        }
    }

    /// Barrido de leases vencidos sin esperar a que un worker pida tarea.
    pub fn reclaim_expired(&self, now: Instant) -> usize {
        self.lock().registry.reclaim_expired(now).len()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn is_done(&self) -> bool {
        self.phase() == Phase::Done
    }

    pub fn snapshot(&self) -> JobStatusResponse {
        let state = self.lock();
        let registry = &state.registry;

        let tasks = [TaskKind::Map, TaskKind::Reduce]
            .into_iter()
            .flat_map(|kind| registry.list_tasks(kind).iter().map(|t| t.view()))
            .collect();

        JobStatusResponse {
            phase: state.phase,
            reducer_count: registry.reducer_count(),
            map: registry.counts(TaskKind::Map),
            reduce: registry.counts(TaskKind::Reduce),
            tasks,
            started_at: state.started_at,
            finished_at: state.finished_at,
        }
    }
}
