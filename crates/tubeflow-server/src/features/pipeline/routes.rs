//! Pipeline routes
//!
//! `POST /start`, `POST /generate_selected` and `GET /status`. Start
//! handlers return as soon as the job is handed to the worker.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tubeflow_common::types::{GenerateRequest, MessageResponse, StartRequest, StatusResponse};

use super::commands::{start_main, start_selective, StartMainCommand, StartSelectiveCommand};
use super::queries::{get_status, GetStatusQuery};
use crate::error::{ApiResult, AppError};
use crate::pipeline::JobSupervisor;

/// Create pipeline routes
pub fn pipeline_routes() -> Router<JobSupervisor> {
    Router::new()
        .route("/start", post(start))
        .route("/generate_selected", post(generate_selected))
        .route("/status", get(status))
}

/// Start the main run
///
/// POST /start
/// Body (optional): `{"channel_id": "UC..."}`
async fn start(
    State(supervisor): State<JobSupervisor>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    // An empty body means "use the default channel".
    let request: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let response = start_main::handle(&supervisor, StartMainCommand::from(request))?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Render the video for one recommendation
///
/// POST /generate_selected
/// Body: `{"index": 0}`
async fn generate_selected(
    State(supervisor): State<JobSupervisor>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let response = start_selective::handle(&supervisor, StartSelectiveCommand::from(request))?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Current pipeline snapshot
///
/// GET /status
async fn status(State(supervisor): State<JobSupervisor>) -> Json<StatusResponse> {
    Json(get_status::handle(supervisor.store(), GetStatusQuery))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_routes_build() {
        let _router = pipeline_routes();
    }
}
