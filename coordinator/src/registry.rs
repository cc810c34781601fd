//! Tabla en memoria de las tareas map y reduce de un job.
//!
//! El registry no se protege solo: vive dentro del `Mutex` del scheduler y
//! todas sus operaciones corren con ese lock tomado.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use common::{
    output_file_name, StoreError, TaskCounts, TaskDescriptor, TaskId, TaskKind, TaskState,
    TaskView, WorkerId,
};

use crate::lease::{Lease, LeasePolicy, ReclaimedLease};

/// Parámetros con los que se arma un job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub inputs: Vec<String>,
    pub reducer_count: u32,
    pub intermediate_dir: PathBuf,
    pub output_dir: PathBuf,
    pub lease_duration: Duration,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("el job necesita al menos un reducer")]
    NoReducers,

    #[error("no se pudo preparar el directorio intermedio: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No hay tareas libres de ese tipo; puede que otras estén corriendo.
    #[error("no hay tareas {0} libres")]
    NoneAvailable(TaskKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Completed,
    Failed,
    /// La tarea ya no es de ese worker (o ya terminó); no se toca nada.
    Stale,
    UnknownTask,
}

impl ReportOutcome {
    pub fn changed_state(self) -> bool {
        matches!(self, ReportOutcome::Completed | ReportOutcome::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub descriptor: TaskDescriptor,
    pub state: TaskState,
    /// Sólo `Some` mientras la tarea está `Running`.
    pub lease: Option<Lease>,
    pub attempts: u32,
    pub failures: u32,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    fn new(descriptor: TaskDescriptor) -> Self {
        Self {
            descriptor,
            state: TaskState::Idle,
            lease: None,
            attempts: 0,
            failures: 0,
            assigned_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.descriptor.id
    }

    pub fn holder(&self) -> Option<WorkerId> {
        match self.state {
            TaskState::Running => self.lease.map(|l| l.worker_id),
            _ => None,
        }
    }

    fn release_as_failed(&mut self) {
        self.state = TaskState::Failed;
        self.lease = None;
        self.failures += 1;
    }

    pub fn view(&self) -> TaskView {
        TaskView {
            id: self.descriptor.id,
            kind: self.descriptor.kind,
            state: self.state,
            input: self.descriptor.input.clone(),
            output: self.descriptor.output.clone(),
            worker_id: self.holder(),
            attempts: self.attempts,
            failures: self.failures,
            assigned_at: self.assigned_at,
            completed_at: self.completed_at,
        }
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[derive(Debug)]
pub struct TaskRegistry {
    maps: Vec<TaskRecord>,
    reduces: Vec<TaskRecord>,
    lease_policy: LeasePolicy,
    reducer_count: u32,
}

impl TaskRegistry {
    /// Una tarea map por archivo de entrada y una reduce por partición.
    pub fn new(spec: &JobSpec) -> Result<Self, JobError> {
        if spec.reducer_count == 0 {
            return Err(JobError::NoReducers);
        }

        let intermediate = path_string(&spec.intermediate_dir);

        let maps = spec
            .inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                TaskRecord::new(TaskDescriptor {
                    id: i as TaskId,
                    kind: TaskKind::Map,
                    input: input.clone(),
                    output: intermediate.clone(),
                })
            })
            .collect();

        let reduces = (0..spec.reducer_count)
            .map(|i| {
                TaskRecord::new(TaskDescriptor {
                    id: i,
                    kind: TaskKind::Reduce,
                    input: intermediate.clone(),
                    output: path_string(&spec.output_dir.join(output_file_name(i))),
                })
            })
            .collect();

        Ok(Self {
            maps,
            reduces,
            lease_policy: LeasePolicy::new(spec.lease_duration),
            reducer_count: spec.reducer_count,
        })
    }

    pub fn reducer_count(&self) -> u32 {
        self.reducer_count
    }

    /// Tareas de un tipo, en orden de creación.
    pub fn list_tasks(&self, kind: TaskKind) -> &[TaskRecord] {
        match kind {
            TaskKind::Map => &self.maps,
            TaskKind::Reduce => &self.reduces,
        }
    }

    fn tasks_mut(&mut self, kind: TaskKind) -> &mut [TaskRecord] {
        match kind {
            TaskKind::Map => &mut self.maps,
            TaskKind::Reduce => &mut self.reduces,
        }
    }

    /// Asigna la primera tarea libre (en orden de creación) a `worker_id`.
    pub fn try_assign(
        &mut self,
        kind: TaskKind,
        worker_id: WorkerId,
        now: Instant,
    ) -> Result<TaskDescriptor, RegistryError> {
        let lease = self.lease_policy.grant(worker_id, now);
        let task = self
            .tasks_mut(kind)
            .iter_mut()
            .find(|t| t.state.is_assignable())
            .ok_or(RegistryError::NoneAvailable(kind))?;

        task.state = TaskState::Running;
        task.lease = Some(lease);
        task.attempts += 1;
        task.assigned_at = Some(Utc::now());

        Ok(task.descriptor.clone())
    }

    /// Aplica el resultado que reporta un worker. Si la tarea ya no es suya
    /// (lease vencido y reasignado, o ya completada) el reporte se ignora.
    pub fn report_result(
        &mut self,
        kind: TaskKind,
        task_id: TaskId,
        worker_id: WorkerId,
        success: bool,
    ) -> ReportOutcome {
        let Some(task) = self
            .tasks_mut(kind)
            .iter_mut()
            .find(|t| t.id() == task_id)
        else {
            return ReportOutcome::UnknownTask;
        };

        let held = task.state == TaskState::Running
            && task.lease.is_some_and(|l| l.held_by(worker_id));
        if !held {
            return ReportOutcome::Stale;
        }

        if success {
            task.state = TaskState::Completed;
            task.lease = None;
            task.completed_at = Some(Utc::now());
            ReportOutcome::Completed
        } else {
            task.release_as_failed();
            ReportOutcome::Failed
        }
    }

    /// Devuelve al pool toda tarea `Running` cuyo lease ya venció.
    pub fn reclaim_expired(&mut self, now: Instant) -> Vec<ReclaimedLease> {
        let mut reclaimed = Vec::new();

        for kind in [TaskKind::Map, TaskKind::Reduce] {
            for task in self.tasks_mut(kind).iter_mut() {
                let Some(lease) = task.lease else { continue };
                if task.state != TaskState::Running || !lease.is_expired(now) {
                    continue;
                }

                warn!(
                    "lease vencido: tarea {} {} del worker {}, vuelve a la cola",
                    kind,
                    task.id(),
                    lease.worker_id
                );
                task.release_as_failed();
                reclaimed.push(ReclaimedLease {
                    kind,
                    task_id: task.id(),
                    worker_id: lease.worker_id,
                });
            }
        }

        reclaimed
    }

    /// `true` si todas las tareas de ese tipo están completadas.
    pub fn phase_complete(&self, kind: TaskKind) -> bool {
        self.list_tasks(kind)
            .iter()
            .all(|t| t.state == TaskState::Completed)
    }

    pub fn counts(&self, kind: TaskKind) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for task in self.list_tasks(kind) {
            match task.state {
                TaskState::Idle => counts.idle += 1,
                TaskState::Running => counts.running += 1,
                TaskState::Completed => counts.completed += 1,
                TaskState::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(10);

    fn spec(files: &[&str], reducers: u32) -> JobSpec {
        JobSpec {
            inputs: files.iter().map(|f| f.to_string()).collect(),
            reducer_count: reducers,
            intermediate_dir: PathBuf::from("/tmp/inter"),
            output_dir: PathBuf::from("/tmp/out"),
            lease_duration: LEASE,
        }
    }

    #[test]
    fn new_builds_one_map_per_file_and_one_reduce_per_partition() {
        let reg = TaskRegistry::new(&spec(&["a.txt", "b.txt", "c.txt"], 2)).unwrap();

        let maps = reg.list_tasks(TaskKind::Map);
        assert_eq!(maps.len(), 3);
        assert_eq!(maps[1].descriptor.input, "b.txt");
        assert_eq!(maps[1].descriptor.output, "/tmp/inter");
        assert!(maps.iter().all(|t| t.state == TaskState::Idle));

        let reduces = reg.list_tasks(TaskKind::Reduce);
        assert_eq!(reduces.len(), 2);
        assert_eq!(reduces[1].descriptor.input, "/tmp/inter");
        assert_eq!(reduces[1].descriptor.output, "/tmp/out/mr-out-1");
    }

    #[test]
    fn zero_reducers_is_rejected() {
        assert!(matches!(
            TaskRegistry::new(&spec(&["a"], 0)),
            Err(JobError::NoReducers)
        ));
    }

    #[test]
    fn try_assign_follows_creation_order() {
        let mut reg = TaskRegistry::new(&spec(&["a", "b", "c"], 1)).unwrap();
        let now = Instant::now();

        let ids: Vec<TaskId> = (0..3)
            .map(|w| reg.try_assign(TaskKind::Map, w, now).unwrap().id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);

        assert_eq!(
            reg.try_assign(TaskKind::Map, 9, now),
            Err(RegistryError::NoneAvailable(TaskKind::Map))
        );
    }

    #[test]
    fn try_assign_records_holder_and_deadline() {
        let mut reg = TaskRegistry::new(&spec(&["a"], 1)).unwrap();
        let now = Instant::now();

        reg.try_assign(TaskKind::Map, 42, now).unwrap();

        let task = &reg.list_tasks(TaskKind::Map)[0];
        assert_eq!(task.state, TaskState::Running);
        assert_eq!(task.holder(), Some(42));
        assert_eq!(task.lease.unwrap().deadline, now + LEASE);
        assert_eq!(task.attempts, 1);
    }

    #[test]
    fn successful_report_completes_task() {
        let mut reg = TaskRegistry::new(&spec(&["a"], 1)).unwrap();
        reg.try_assign(TaskKind::Map, 1, Instant::now()).unwrap();

        assert_eq!(
            reg.report_result(TaskKind::Map, 0, 1, true),
            ReportOutcome::Completed
        );
        assert!(reg.phase_complete(TaskKind::Map));
        assert!(!reg.phase_complete(TaskKind::Reduce));

        // completada es inmutable: un segundo reporte no cambia nada
        assert_eq!(
            reg.report_result(TaskKind::Map, 0, 1, false),
            ReportOutcome::Stale
        );
        assert_eq!(reg.list_tasks(TaskKind::Map)[0].state, TaskState::Completed);
    }

    #[test]
    fn failed_report_makes_task_assignable_again() {
        let mut reg = TaskRegistry::new(&spec(&["a", "b"], 1)).unwrap();
        let now = Instant::now();
        reg.try_assign(TaskKind::Map, 1, now).unwrap();

        assert_eq!(
            reg.report_result(TaskKind::Map, 0, 1, false),
            ReportOutcome::Failed
        );
        let task = &reg.list_tasks(TaskKind::Map)[0];
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.failures, 1);
        assert_eq!(task.holder(), None);

        // vuelve a ser la primera libre
        assert_eq!(reg.try_assign(TaskKind::Map, 2, now).unwrap().id, 0);
    }

    #[test]
    fn report_from_non_holder_is_ignored() {
        let mut reg = TaskRegistry::new(&spec(&["a"], 1)).unwrap();
        reg.try_assign(TaskKind::Map, 1, Instant::now()).unwrap();

        assert_eq!(
            reg.report_result(TaskKind::Map, 0, 2, true),
            ReportOutcome::Stale
        );
        assert_eq!(reg.list_tasks(TaskKind::Map)[0].state, TaskState::Running);
    }

    #[test]
    fn report_for_idle_or_unknown_task_is_ignored() {
        let mut reg = TaskRegistry::new(&spec(&["a"], 1)).unwrap();

        assert_eq!(
            reg.report_result(TaskKind::Map, 0, 1, true),
            ReportOutcome::Stale
        );
        assert_eq!(
            reg.report_result(TaskKind::Map, 7, 1, true),
            ReportOutcome::UnknownTask
        );
        // mismo id, otro tipo: los espacios de ids son independientes
        assert_eq!(
            reg.report_result(TaskKind::Reduce, 0, 1, true),
            ReportOutcome::Stale
        );
        assert_eq!(reg.list_tasks(TaskKind::Map)[0].state, TaskState::Idle);
    }

    #[test]
    fn reclaim_expired_only_touches_overdue_leases() {
        let mut reg = TaskRegistry::new(&spec(&["a", "b"], 1)).unwrap();
        let t0 = Instant::now();
        reg.try_assign(TaskKind::Map, 1, t0).unwrap();
        reg.try_assign(TaskKind::Map, 2, t0 + Duration::from_secs(5)).unwrap();

        assert!(reg.reclaim_expired(t0 + Duration::from_secs(9)).is_empty());

        let reclaimed = reg.reclaim_expired(t0 + LEASE);
        assert_eq!(
            reclaimed,
            vec![ReclaimedLease {
                kind: TaskKind::Map,
                task_id: 0,
                worker_id: 1
            }]
        );
        assert_eq!(reg.list_tasks(TaskKind::Map)[0].state, TaskState::Failed);
        assert_eq!(reg.list_tasks(TaskKind::Map)[1].state, TaskState::Running);
    }

    #[test]
    fn late_report_after_reassignment_does_not_override_new_holder() {
        let mut reg = TaskRegistry::new(&spec(&["a"], 1)).unwrap();
        let t0 = Instant::now();
        reg.try_assign(TaskKind::Map, 1, t0).unwrap();

        let later = t0 + LEASE + Duration::from_secs(1);
        reg.reclaim_expired(later);
        assert_eq!(reg.try_assign(TaskKind::Map, 2, later).unwrap().id, 0);

        // el worker 1 reporta tarde, tanto éxito como fallo se ignoran
        assert_eq!(
            reg.report_result(TaskKind::Map, 0, 1, false),
            ReportOutcome::Stale
        );
        assert_eq!(
            reg.report_result(TaskKind::Map, 0, 1, true),
            ReportOutcome::Stale
        );
        assert_eq!(reg.list_tasks(TaskKind::Map)[0].holder(), Some(2));

        assert_eq!(
            reg.report_result(TaskKind::Map, 0, 2, true),
            ReportOutcome::Completed
        );
    }

    #[test]
    fn counts_group_tasks_by_state() {
        let mut reg = TaskRegistry::new(&spec(&["a", "b", "c", "d"], 1)).unwrap();
        let now = Instant::now();
        for w in 0..3 {
            reg.try_assign(TaskKind::Map, w, now).unwrap();
        }
        reg.report_result(TaskKind::Map, 0, 0, true);
        reg.report_result(TaskKind::Map, 1, 1, false);

        let counts = reg.counts(TaskKind::Map);
        assert_eq!(
            counts,
            TaskCounts {
                idle: 1,
                running: 1,
                completed: 1,
                failed: 1
            }
        );
        assert_eq!(counts.total(), 4);
    }
}
