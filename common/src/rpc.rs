use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{TaskDescriptor, TaskId, TaskKind, TaskState, WorkerId};

/* --------- GetJob --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchStatus {
    /// Hay tarea asignada en la respuesta.
    Success,
    /// No hay tareas libres ahora mismo; reintentar en un rato.
    NoPending,
    /// El job terminó; el worker debe salir.
    AllDone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetJobResponse {
    pub status: FetchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<TaskKind>,
    #[serde(default)]
    pub job_id: TaskId,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    pub reducer_count: u32,
}

impl GetJobResponse {
    pub fn assigned(task: TaskDescriptor, reducer_count: u32) -> Self {
        Self {
            status: FetchStatus::Success,
            job_type: Some(task.kind),
            job_id: task.id,
            input: task.input,
            output: task.output,
            reducer_count,
        }
    }

    pub fn no_pending(reducer_count: u32) -> Self {
        Self::without_task(FetchStatus::NoPending, reducer_count)
    }

    pub fn all_done(reducer_count: u32) -> Self {
        Self::without_task(FetchStatus::AllDone, reducer_count)
    }

    fn without_task(status: FetchStatus, reducer_count: u32) -> Self {
        Self {
            status,
            job_type: None,
            job_id: 0,
            input: String::new(),
            output: String::new(),
            reducer_count,
        }
    }

    /// Descriptor de la tarea, sólo si `status == Success`.
    pub fn task(&self) -> Option<TaskDescriptor> {
        match (self.status, self.job_type) {
            (FetchStatus::Success, Some(kind)) => Some(TaskDescriptor {
                id: self.job_id,
                kind,
                input: self.input.clone(),
                output: self.output.clone(),
            }),
            _ => None,
        }
    }
}

/* --------- ReportJob --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportJobRequest {
    pub worker_id: WorkerId,
    pub job_type: TaskKind,
    pub job_id: TaskId,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportJobResponse {
    pub status: i32,
}

impl ReportJobResponse {
    /// El reporte cambió el estado de la tarea.
    pub const ACCEPTED: i32 = 0;
    /// Reporte viejo o de una tarea desconocida; se descarta sin error.
    pub const IGNORED: i32 = 1;
}

/* --------- IsDone --------- */

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IsDoneResponse {
    pub done: bool,
}

/* --------- Status (para el driver / CLI) --------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Mapping,
    Reducing,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub idle: u32,
    pub running: u32,
    pub completed: u32,
    pub failed: u32,
}

impl TaskCounts {
    pub fn total(&self) -> u32 {
        self.idle + self.running + self.completed + self.failed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub kind: TaskKind,
    pub state: TaskState,
    pub input: String,
    pub output: String,
    pub worker_id: Option<WorkerId>,
    pub attempts: u32,
    pub failures: u32,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub phase: Phase,
    pub reducer_count: u32,
    pub map: TaskCounts,
    pub reduce: TaskCounts,
    pub tasks: Vec<TaskView>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
