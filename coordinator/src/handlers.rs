use std::time::Instant;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use common::{
    GetJobRequest, GetJobResponse, IsDoneResponse, JobStatusResponse, ReportJobRequest,
    ReportJobResponse,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/jobs/next", post(get_job))
        .route("/api/v1/jobs/report", post(report_job))
        .route("/api/v1/done", get(is_done))
        .route("/api/v1/status", get(job_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// GetJob: el worker pide trabajo; nunca bloquea, si no hay responde NO_PENDING
async fn get_job(
    State(state): State<AppState>,
    Json(req): Json<GetJobRequest>,
) -> Json<GetJobResponse> {
    Json(state.scheduler.fetch_task(req.worker_id, Instant::now()))
}

// ReportJob: resultado de una tarea; los reportes viejos se ignoran sin error
async fn report_job(
    State(state): State<AppState>,
    Json(req): Json<ReportJobRequest>,
) -> Json<ReportJobResponse> {
    Json(state.scheduler.report_job(&req))
}

// IsDone: lo consulta el driver externo, no los workers
async fn is_done(State(state): State<AppState>) -> Json<IsDoneResponse> {
    Json(IsDoneResponse {
        done: state.scheduler.is_done(),
    })
}

async fn job_status(State(state): State<AppState>) -> Json<JobStatusResponse> {
    Json(state.scheduler.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::JobSpec;
    use crate::scheduler::Scheduler;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use common::{FetchStatus, Phase, TaskKind};
    use serde::de::DeserializeOwned;
    use std::{path::PathBuf, time::Duration};
    use tower::ServiceExt;

    fn app(files: usize, reducers: u32) -> Router {
        let scheduler = Scheduler::new(JobSpec {
            inputs: (0..files).map(|i| format!("pg-{}.txt", i)).collect(),
            reducer_count: reducers,
            intermediate_dir: PathBuf::from("inter"),
            output_dir: PathBuf::from("out"),
            lease_duration: Duration::from_secs(10),
        })
        .unwrap();
        build_router(AppState::new(scheduler))
    }

    async fn send<T: DeserializeOwned>(app: &Router, req: Request<Body>) -> T {
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let app = app(1, 1);
        let resp = app.oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn full_job_over_http() {
        let app = app(1, 1);

        let done: IsDoneResponse = send(&app, get_req("/api/v1/done")).await;
        assert!(!done.done);

        let map: GetJobResponse = send(
            &app,
            post_json("/api/v1/jobs/next", serde_json::json!({ "worker_id": 11 })),
        )
        .await;
        assert_eq!(map.status, FetchStatus::Success);
        assert_eq!(map.job_type, Some(TaskKind::Map));
        assert_eq!(map.input, "pg-0.txt");

        let ack: ReportJobResponse = send(
            &app,
            post_json(
                "/api/v1/jobs/report",
                serde_json::json!({
                    "worker_id": 11, "job_type": "map", "job_id": 0, "success": true
                }),
            ),
        )
        .await;
        assert_eq!(ack.status, ReportJobResponse::ACCEPTED);

        let reduce: GetJobResponse = send(
            &app,
            post_json("/api/v1/jobs/next", serde_json::json!({ "worker_id": 11 })),
        )
        .await;
        assert_eq!(reduce.job_type, Some(TaskKind::Reduce));
        assert_eq!(reduce.output, "out/mr-out-0");

        let _: ReportJobResponse = send(
            &app,
            post_json(
                "/api/v1/jobs/report",
                serde_json::json!({
                    "worker_id": 11, "job_type": "reduce", "job_id": 0, "success": true
                }),
            ),
        )
        .await;

        let done: IsDoneResponse = send(&app, get_req("/api/v1/done")).await;
        assert!(done.done);

        let last: GetJobResponse = send(
            &app,
            post_json("/api/v1/jobs/next", serde_json::json!({ "worker_id": 12 })),
        )
        .await;
        assert_eq!(last.status, FetchStatus::AllDone);
    }

    #[tokio::test]
    async fn stale_report_is_acknowledged_as_ignored() {
        let app = app(1, 1);
        let ack: ReportJobResponse = send(
            &app,
            post_json(
                "/api/v1/jobs/report",
                serde_json::json!({
                    "worker_id": 3, "job_type": "map", "job_id": 0, "success": true
                }),
            ),
        )
        .await;
        assert_eq!(ack.status, ReportJobResponse::IGNORED);
    }

    #[tokio::test]
    async fn status_lists_every_task() {
        let app = app(3, 2);
        let status: JobStatusResponse = send(&app, get_req("/api/v1/status")).await;
        assert_eq!(status.phase, Phase::Mapping);
        assert_eq!(status.map.idle, 3);
        assert_eq!(status.reduce.idle, 2);
        assert_eq!(status.tasks.len(), 5);
    }

    #[tokio::test]
    async fn malformed_request_is_rejected() {
        let app = app(1, 1);
        let resp = app
            .oneshot(post_json(
                "/api/v1/jobs/next",
                serde_json::json!({ "worker": "x" }),
            ))
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }
}
