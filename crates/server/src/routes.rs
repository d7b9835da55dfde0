//! HTTP routes.
//!
//! - `GET /health`
//! - `POST /detect` analyzes an uploaded video
//! - `POST /live` tracks one webcam frame within a session
//! - `POST /stop_live` ends a session and returns its totals

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_common::results::{write_results, ResultsSummary};
use repsense_model::summary::{FrameSummary, SessionSummary};

use crate::cors::setup_cors;
use crate::error::{ApiError, INVALID_SESSION_MESSAGE};
use crate::forms::{decode_frame, FormFields, StagedUpload};
use crate::state::AppState;

/// Response body for `POST /live`.
#[derive(Debug, Clone, Serialize)]
pub struct LiveResponse {
    #[serde(flatten)]
    pub summary: FrameSummary,
    pub session_id: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;
    let cors = setup_cors(&state.settings.cors_allowed_origins);

    Router::new()
        .route("/health", get(health))
        .route("/detect", post(detect))
        .route("/live", post(live))
        .route("/stop_live", post(stop_live))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    tracing::debug!("Health check endpoint called");
    Json(json!({ "status": "ok" }))
}

async fn detect(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResultsSummary>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() == Some("video") {
            upload = Some(StagedUpload::save(field, &state.settings.upload_dir).await?);
            break;
        }
    }
    let upload = upload
        .ok_or_else(|| ApiError::from(RepsenseError::input_missing("No video file provided")))?;

    let batch = state.batch.clone();
    let weight_kg = state.settings.default_weight_kg;
    // The upload moves into the blocking task so it is deleted only after
    // the decoder is done with it.
    let report = tokio::task::spawn_blocking(move || {
        let result = batch.run(upload.path(), weight_kg);
        drop(upload);
        result
    })
    .await
    .map_err(|e| ApiError::internal(format!("Video processing task failed: {e}")))??;

    Ok(Json(results_of(&report.summary)))
}

async fn live(
    State(state): State<AppState>,
    fields: FormFields,
) -> Result<Json<LiveResponse>, ApiError> {
    let frame_data = fields
        .get("frame")
        .ok_or_else(|| ApiError::from(RepsenseError::input_missing("No frame data provided")))?
        .to_string();
    let weight_kg = parse_weight(fields.get("weight"), state.settings.default_weight_kg)?;
    let session_id = match fields.get("session_id") {
        Some(id) => id.to_string(),
        None => {
            let generated = state.sessions.clock().now_secs().to_string();
            tracing::warn!(
                session_id = %generated,
                "Live frame without session_id, using a timestamp-derived id"
            );
            generated
        }
    };

    let summary = tokio::task::spawn_blocking({
        let state = state.clone();
        let session_id = session_id.clone();
        move || -> RepsenseResult<FrameSummary> {
            let frame = decode_frame(&frame_data)?;
            let outcome = state.sessions.with_session(&session_id, |session| {
                state
                    .processor
                    .process_frame(&frame, session.tracker_mut(), weight_kg)
            });
            Ok(outcome.summary)
        }
    })
    .await
    .map_err(|e| ApiError::internal(format!("Frame processing task failed: {e}")))??;

    tracing::debug!(
        session_id = %session_id,
        calories = summary.calories,
        current_state = ?summary.current_state,
        "Live frame processed"
    );
    Ok(Json(LiveResponse {
        summary,
        session_id,
    }))
}

async fn stop_live(
    State(state): State<AppState>,
    fields: FormFields,
) -> Result<Json<ResultsSummary>, ApiError> {
    let session_id = fields
        .get("session_id")
        .ok_or_else(|| ApiError::bad_request(INVALID_SESSION_MESSAGE))?
        .to_string();

    // A failed results write keeps the session for a retry.
    let results = tokio::task::spawn_blocking(move || -> RepsenseResult<ResultsSummary> {
        let summary = state.sessions.finish(&session_id, |summary| {
            write_results(&state.settings.results_path, &results_of(summary))
        })?;
        Ok(results_of(&summary))
    })
    .await
    .map_err(|e| ApiError::internal(format!("Session shutdown task failed: {e}")))??;

    Ok(Json(results))
}

fn results_of(summary: &SessionSummary) -> ResultsSummary {
    ResultsSummary {
        calories: summary.calories,
        exercise_types_count: summary.exercise_types_count,
    }
}

fn parse_weight(raw: Option<&str>, default_kg: f64) -> Result<f64, ApiError> {
    let Some(raw) = raw else {
        return Ok(default_kg);
    };
    match raw.parse::<f64>() {
        Ok(kg) if kg.is_finite() && kg > 0.0 => Ok(kg),
        _ => Err(RepsenseError::invalid_input(format!("Invalid weight: {raw}")).into()),
    }
}
