//! Session endpoints: issue and revoke bearer tokens.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::auth;
use crate::db;
use crate::models::User;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// `POST /api/auth/login` — verify credentials and issue a token.
///
/// Unknown usernames and wrong passwords fail identically.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let conn = ctx.core.open_db()?;

    let (user, credentials) = db::get_user_by_username(&conn, &req.username.trim().to_lowercase())
        .map_err(ApiError::from)?
        .ok_or(ApiError::Unauthorized)?;

    if !auth::verify_password(&req.password, &credentials) {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(ApiError::Unauthorized);
    }

    let token = ctx.core.write_sessions()?.issue(&user);
    tracing::info!(username = %user.username, "User signed in");

    Ok(Json(LoginResponse { token, user }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

/// `POST /api/auth/logout` — revoke the presented token.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let revoked = ctx.core.write_sessions()?.revoke(&user.token);
    tracing::info!(username = %user.username, "User signed out");
    Ok(Json(LogoutResponse { revoked }))
}
