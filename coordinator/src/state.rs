use std::sync::Arc;

use crate::scheduler::Scheduler;

/// Estado compartido por los handlers HTTP y los loops de fondo.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
        }
    }
}
