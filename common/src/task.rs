use serde::{Deserialize, Serialize};
use std::fmt;

/// Id de una tarea, único dentro de su tipo (map y reduce tienen espacios separados).
pub type TaskId = u32;

/// Identidad del worker; por defecto el pid del proceso.
pub type WorkerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Map,
    Reduce,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Map => write!(f, "map"),
            TaskKind::Reduce => write!(f, "reduce"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Idle,
    Running,
    Completed,
    /// Fallo reportado o lease vencido. Se puede volver a asignar igual que Idle.
    Failed,
}

impl TaskState {
    pub fn is_assignable(self) -> bool {
        matches!(self, TaskState::Idle | TaskState::Failed)
    }
}

/// Lo que un worker necesita para ejecutar una tarea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: TaskId,
    pub kind: TaskKind,
    /// Map: archivo de entrada. Reduce: directorio intermedio.
    pub input: String,
    /// Map: directorio intermedio. Reduce: archivo final.
    pub output: String,
}
