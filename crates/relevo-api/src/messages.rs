use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use relevo_core::Error;
use relevo_core::messages::{AppendMessage, MediaUpload};
use relevo_types::api::{MediaPayload, SendMessageRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::conversations::ensure_conversation_access;
use crate::error::{ApiError, join_error};
use crate::middleware::Claims;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// `asc` (default) or `desc`.
    pub order: Option<String>,
}

fn default_limit() -> u32 {
    100
}

/// POST /conversations/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let message = tokio::task::spawn_blocking(move || -> Result<_, Error> {
        ensure_conversation_access(&st, &claims, conversation_id)?;

        let media = req
            .media
            .map(|m| decode_media(m, req.kind.default_content_type()))
            .transpose()?;
        st.core.append(AppendMessage {
            conversation_id,
            sender_id: claims.sub,
            sender_party: claims.role,
            body: req.body,
            kind: req.kind,
            reply_to_id: req.reply_to_id,
            task_id: req.task_id,
            media,
        })
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /conversations/{id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.min(200);
    let ascending = !matches!(query.order.as_deref(), Some("desc"));

    let st = state.clone();
    let views = tokio::task::spawn_blocking(move || -> Result<_, Error> {
        ensure_conversation_access(&st, &claims, conversation_id)?;
        st.core.history(conversation_id, limit, ascending)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(views))
}

pub(crate) fn decode_media(
    payload: MediaPayload,
    implied_content_type: Option<&'static str>,
) -> Result<MediaUpload, Error> {
    let bytes = B64
        .decode(payload.data.as_bytes())
        .map_err(|_| Error::InvalidArgument("media data is not valid base64".into()))?;
    let content_type = payload
        .content_type
        .or_else(|| implied_content_type.map(str::to_string))
        .ok_or_else(|| Error::InvalidArgument("media content type is required".into()))?;
    Ok(MediaUpload {
        bytes,
        filename: payload.filename,
        content_type,
    })
}
