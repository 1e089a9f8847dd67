use axum::{Extension, Json, extract::State, response::IntoResponse};
use relevo_types::api::CleanupRequest;

use crate::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::{Claims, ensure_admin};

/// POST /admin/cleanup — run the retention sweep now instead of waiting for
/// the daily schedule. `days_to_keep` narrows or widens the
/// operational-records window for this run only.
pub async fn run_cleanup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CleanupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let st = state.clone();
    let report = tokio::task::spawn_blocking(move || st.core.run_manual_cleanup(req.days_to_keep))
        .await
        .map_err(join_error)??;
    Ok(Json(report))
}
