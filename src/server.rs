use crate::context::RunContext;
use crate::data::{TimetableInput, TimetableOutput};
use crate::error::TimetableError;
use crate::solver;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use log::{error, info};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const ADDR_ENV: &str = "TIMETABLE_SOLVER_ADDR";

type ApiError = (StatusCode, String);

/// Background generation job and the two stored results.
#[derive(Default)]
pub struct JobState {
    running: bool,
    generation: usize,
    total_generations: usize,
    best_fitness: f64,
    error: Option<String>,
    cancel: Option<Arc<AtomicBool>>,
    preview: Option<TimetableOutput>,
    published: Option<TimetableOutput>,
}

pub type SharedState = Arc<Mutex<JobState>>;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running {
        progress: usize,
        total: usize,
        fitness: f64,
    },
    PendingVerification,
    Error {
        message: String,
    },
}

fn lock(state: &SharedState) -> MutexGuard<'_, JobState> {
    // a panicking worker must not take the status endpoint down with it
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn bad_request(e: TimetableError) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

async fn solve_handler(
    Json(input): Json<TimetableInput>,
) -> Result<Json<TimetableOutput>, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || solver::solve(&input))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match outcome {
        Ok(output) => Ok(Json(output)),
        Err(e) => Err(bad_request(e)),
    }
}

async fn generate_handler(
    State(state): State<SharedState>,
    Json(input): Json<TimetableInput>,
) -> Result<Json<Value>, ApiError> {
    RunContext::new(&input).map_err(bad_request)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let mut job = lock(&state);
        if job.running {
            return Ok(Json(json!({ "status": "already_running" })));
        }
        job.running = true;
        job.generation = 0;
        job.total_generations = input.params.num_generations;
        job.best_fitness = 0.0;
        job.error = None;
        job.cancel = Some(cancel.clone());
        job.preview = None;
    }

    let worker_state = state.clone();
    tokio::task::spawn_blocking(move || {
        let progress_state = worker_state.clone();
        let outcome = solver::solve_with_progress(&input, Some(cancel), move |p| {
            let mut job = lock(&progress_state);
            job.generation = p.generation;
            job.total_generations = p.total_generations;
            job.best_fitness = p.best_fitness;
        });

        let mut job = lock(&worker_state);
        job.running = false;
        job.cancel = None;
        match outcome {
            Ok(output) => job.preview = Some(output),
            Err(e) => {
                error!("Background generation failed: {}", e);
                job.error = Some(e.to_string());
            }
        }
    });

    info!("Background timetable generation started");
    Ok(Json(json!({ "status": "generation_started" })))
}

async fn status_handler(State(state): State<SharedState>) -> Json<JobStatus> {
    let job = lock(&state);
    let status = if let Some(message) = &job.error {
        JobStatus::Error {
            message: message.clone(),
        }
    } else if job.running {
        JobStatus::Running {
            progress: job.generation,
            total: job.total_generations,
            fitness: job.best_fitness,
        }
    } else if job.preview.is_some() {
        JobStatus::PendingVerification
    } else {
        JobStatus::Idle
    };
    Json(status)
}

async fn cancel_handler(State(state): State<SharedState>) -> Json<Value> {
    let job = lock(&state);
    match &job.cancel {
        Some(flag) => {
            flag.store(true, Ordering::Relaxed);
            info!("Cancellation requested for running generation");
            Json(json!({ "status": "cancelling" }))
        }
        None => Json(json!({ "status": "idle" })),
    }
}

async fn publish_handler(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let mut job = lock(&state);
    let preview = job
        .preview
        .take()
        .ok_or((StatusCode::NOT_FOUND, "no preview timetable to publish".to_string()))?;
    job.published = Some(preview);
    info!("Preview timetable published");
    Ok(Json(json!({ "status": "published" })))
}

async fn timetable_handler(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let job = lock(&state);
    let stored = match kind.as_str() {
        "preview" => &job.preview,
        "published" => &job.published,
        other => {
            return Err((
                StatusCode::NOT_FOUND,
                format!("unknown timetable '{other}', expected 'preview' or 'published'"),
            ));
        }
    };
    Ok(Json(match stored {
        Some(timetable) => json!({ "found": true, "timetable": timetable }),
        None => json!({ "found": false }),
    }))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/v1/timetable/solve", post(solve_handler))
        .route("/v1/timetable/generate", post(generate_handler))
        .route("/v1/timetable/status", get(status_handler))
        .route("/v1/timetable/cancel", post(cancel_handler))
        .route("/v1/timetable/publish", post(publish_handler))
        .route("/v1/timetable/:kind", get(timetable_handler))
        .with_state(state)
}

pub async fn run_server() -> std::io::Result<()> {
    let addr = std::env::var(ADDR_ENV).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let app = router(SharedState::default());

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
