use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::info;

use crate::state::AppState;

/// Loop de tolerancia a fallos: cada `interval` devuelve al pool las tareas
/// cuyo lease venció, aunque ningún worker esté pidiendo trabajo.
/// Termina cuando el job está hecho.
pub async fn run_lease_sweeper(state: AppState, interval: Duration) {
    loop {
        sleep(interval).await;

        if state.scheduler.is_done() {
            info!("job terminado, se detiene el barrido de leases");
            return;
        }

        let reclaimed = state.scheduler.reclaim_expired(Instant::now());
        if reclaimed > 0 {
            info!("barrido de leases: {} tareas reencoladas", reclaimed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::JobSpec, scheduler::Scheduler};
    use common::{FetchStatus, Phase};
    use std::path::PathBuf;

    #[tokio::test]
    async fn expired_lease_is_reclaimed_without_anyone_polling() {
        let state = AppState::new(
            Scheduler::new(JobSpec {
                inputs: vec!["in-0.txt".to_string(), "in-1.txt".to_string()],
                reducer_count: 1,
                intermediate_dir: PathBuf::from("inter"),
                output_dir: PathBuf::from("out"),
                lease_duration: Duration::from_millis(50),
            })
            .unwrap(),
        );

        let taken = state.scheduler.fetch_task(1, Instant::now());
        assert_eq!(taken.status, FetchStatus::Success);
        assert_eq!(state.scheduler.snapshot().map.running, 1);

        let sweeper = tokio::spawn(run_lease_sweeper(state.clone(), Duration::from_millis(20)));
        sleep(Duration::from_millis(300)).await;

        let status = state.scheduler.snapshot();
        assert_eq!(status.phase, Phase::Mapping);
        assert_eq!(status.map.running, 0);
        assert_eq!(status.map.failed, 1);
        assert_eq!(status.map.idle, 1);
        assert_eq!(status.tasks[0].failures, 1);

        sweeper.abort();
    }
}
