use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use relevo_core::Error;
use relevo_types::api::{TaskCompletionRequest, TimeRecordRequest};

use crate::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::{Claims, ensure_self_or_admin};

/// POST /attendance/time
pub async fn record_time(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TimeRecordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self_or_admin(&claims, req.user_id)?;

    let st = state.clone();
    tokio::task::spawn_blocking(move || -> Result<(), Error> {
        st.core
            .record_time(req.user_id, &req.date, req.period, &req.time)
    })
    .await
    .map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /attendance/completions
pub async fn record_completion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TaskCompletionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self_or_admin(&claims, req.user_id)?;

    let st = state.clone();
    tokio::task::spawn_blocking(move || -> Result<(), Error> {
        st.core
            .record_completion(req.user_id, req.task_id, &req.date, req.completed)
    })
    .await
    .map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}
