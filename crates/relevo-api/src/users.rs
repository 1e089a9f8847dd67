use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use relevo_core::Error;
use relevo_db::{fmt_ts, parse_ts};
use relevo_types::api::{CreateUserRequest, CreateUserResponse};
use relevo_types::models::{Party, User};
use uuid::Uuid;

use crate::AppState;
use crate::auth::hash_password;
use crate::error::{ApiError, join_error};
use crate::middleware::{Claims, ensure_admin};

pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(Error::InvalidArgument(
            "username must be between 3 and 32 characters".into(),
        )
        .into());
    }
    if req.password.len() < 8 {
        return Err(Error::InvalidArgument("password must be at least 8 characters".into()).into());
    }
    if req.name.trim().is_empty() {
        return Err(Error::InvalidArgument("display name cannot be empty".into()).into());
    }

    let user_id = Uuid::new_v4();
    let password_hash =
        hash_password(&req.password).map_err(|e| ApiError(Error::Db(e)))?;

    let st = state.clone();
    tokio::task::spawn_blocking(move || -> Result<(), Error> {
        if st
            .db
            .get_user_by_username(&req.username)
            .map_err(Error::Db)?
            .is_some()
        {
            return Err(Error::InvalidArgument("username is already taken".into()));
        }
        st.db
            .create_user(
                &user_id.to_string(),
                req.name.trim(),
                &req.username,
                &password_hash,
                req.role.as_str(),
                &fmt_ts(chrono::Utc::now()),
            )
            .map_err(Error::Db)
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(CreateUserResponse { user_id })))
}

/// GET /users — the employee roster, for the admin attendance and task
/// panels.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let st = state.clone();
    let rows = tokio::task::spawn_blocking(move || st.db.list_employees().map_err(Error::Db))
        .await
        .map_err(join_error)??;

    let users: Vec<User> = rows
        .into_iter()
        .map(|row| User {
            id: row.id.parse().unwrap_or_default(),
            name: row.name,
            username: row.username,
            role: Party::from_str(&row.role).unwrap_or(Party::Employee),
            created_at: parse_ts(&row.created_at),
        })
        .collect();
    Ok(Json(users))
}

/// Removing a user cascades its conversation and messages. Any chat blobs
/// left behind age out of the store on the next retention sweeps.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let st = state.clone();
    tokio::task::spawn_blocking(move || -> Result<(), Error> {
        let removed = st
            .db
            .delete_user(&user_id.to_string())
            .map_err(Error::Db)?;
        if !removed {
            return Err(Error::NotFound("user"));
        }
        Ok(())
    })
    .await
    .map_err(join_error)??;

    Ok(StatusCode::NO_CONTENT)
}
