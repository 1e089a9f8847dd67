use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use relevo_core::Error;
use relevo_types::api::{
    CreateTaskRequest, EvidenceUploadRequest, EvidenceUploadResponse, UpdateTaskRequest,
};

use crate::AppState;
use crate::error::{ApiError, join_error};
use crate::messages::decode_media;
use crate::middleware::{Claims, ensure_admin, ensure_self_or_admin};

/// POST /tasks
pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let st = state.clone();
    let task = tokio::task::spawn_blocking(move || {
        st.core
            .create_task(&req.name, req.period.as_deref(), req.deadline.as_deref())
    })
    .await
    .map_err(join_error)??;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let st = state.clone();
    tokio::task::spawn_blocking(move || {
        st.core.update_task(
            task_id,
            req.name.as_deref(),
            req.period.as_deref(),
            req.deadline.as_deref(),
        )
    })
    .await
    .map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let st = state.clone();
    tokio::task::spawn_blocking(move || st.core.delete_task(task_id))
        .await
        .map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /tasks/{id}/evidence
pub async fn upload_evidence(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<i64>,
    Json(req): Json<EvidenceUploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self_or_admin(&claims, req.user_id)?;

    let st = state.clone();
    let (id, image_url) = tokio::task::spawn_blocking(move || -> Result<_, Error> {
        let media = decode_media(req.media, None)?;
        st.core
            .upload_evidence(req.user_id, task_id, req.observation.as_deref(), media)
    })
    .await
    .map_err(join_error)??;

    Ok((
        StatusCode::CREATED,
        Json(EvidenceUploadResponse { id, image_url }),
    ))
}
