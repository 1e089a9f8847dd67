use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relevo_core::Error;
use serde_json::json;
use tracing::error;

/// Newtype so core errors can flow straight out of handlers with `?`.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {:#}", anyhow::Error::new(self.0));
            // Backend details stay in the log, not the response.
            return (status, Json(json!({ "error": "internal error" }))).into_response();
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Maps a `spawn_blocking` join failure onto the API error type.
pub fn join_error(e: tokio::task::JoinError) -> ApiError {
    error!("spawn_blocking join error: {}", e);
    ApiError(Error::Db(anyhow::anyhow!("worker task failed: {}", e)))
}
