use std::time::{Duration, Instant};

use common::{TaskId, TaskKind, WorkerId};

/// Derecho exclusivo y temporal de un worker sobre una tarea.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub worker_id: WorkerId,
    pub deadline: Instant,
}

impl Lease {
    pub fn held_by(&self, worker_id: WorkerId) -> bool {
        self.worker_id == worker_id
    }

    /// Vencido cuando `now` alcanza el deadline.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LeasePolicy {
    pub duration: Duration,
}

impl LeasePolicy {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn grant(&self, worker_id: WorkerId, now: Instant) -> Lease {
        Lease {
            worker_id,
            deadline: now + self.duration,
        }
    }
}

/// Lease que el registry recuperó por vencimiento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimedLease {
    pub kind: TaskKind,
    pub task_id: TaskId,
    pub worker_id: WorkerId,
}
