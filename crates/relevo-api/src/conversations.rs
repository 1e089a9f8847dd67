use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use relevo_core::Error;
use relevo_types::api::ResolveConversationRequest;
use relevo_types::models::Party;
use uuid::Uuid;

use crate::{AppState, AppStateInner};
use crate::error::{ApiError, join_error};
use crate::middleware::{Claims, ensure_admin, ensure_self_or_admin};

/// POST /conversations — the caller's (or, for an admin, any user's)
/// conversation, created lazily on first contact.
pub async fn resolve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ResolveConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self_or_admin(&claims, req.user_id)?;

    let st = state.clone();
    let conversation =
        tokio::task::spawn_blocking(move || st.core.resolve_or_create(req.user_id))
            .await
            .map_err(join_error)??;
    Ok(Json(conversation))
}

/// GET /conversations — the admin inbox, placeholders included.
pub async fn list_for_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let st = state.clone();
    let entries = tokio::task::spawn_blocking(move || st.core.list_for_admin())
        .await
        .map_err(join_error)??;
    Ok(Json(entries))
}

/// POST /conversations/{id}/read — the caller viewed the conversation; the
/// reader party comes from the token, never the body.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    tokio::task::spawn_blocking(move || -> Result<(), Error> {
        ensure_conversation_access(&st, &claims, conversation_id)?;
        st.core.mark_read(conversation_id, claims.role)
    })
    .await
    .map_err(join_error)??;
    Ok(Json(serde_json::json!({ "marked": true })))
}

/// Admins see every conversation; an employee only their own.
pub(crate) fn ensure_conversation_access(
    state: &AppStateInner,
    claims: &Claims,
    conversation_id: Uuid,
) -> Result<(), Error> {
    if claims.role == Party::Admin {
        return Ok(());
    }
    let conv = state
        .db
        .get_conversation(&conversation_id.to_string())
        .map_err(Error::Db)?
        .ok_or(Error::NotFound("conversation"))?;
    if conv.user_id != claims.sub.to_string() {
        return Err(Error::PermissionDenied);
    }
    Ok(())
}
