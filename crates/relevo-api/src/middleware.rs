use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use relevo_core::Error;
use relevo_types::models::Party;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: Party,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Party::Admin
    }

    /// Admins act for anyone; employees only for themselves.
    pub fn can_act_for(&self, user_id: Uuid) -> bool {
        self.is_admin() || self.sub == user_id
    }
}

/// Extract and validate the JWT from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

pub fn ensure_admin(claims: &Claims) -> Result<(), Error> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(Error::PermissionDenied)
    }
}

pub fn ensure_self_or_admin(claims: &Claims, user_id: Uuid) -> Result<(), Error> {
    if claims.can_act_for(user_id) {
        Ok(())
    } else {
        Err(Error::PermissionDenied)
    }
}
