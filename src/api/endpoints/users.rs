//! User administration. Every route here is admin-gated.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::auth;
use crate::db;
use crate::models::enums::UserRole;
use crate::models::User;

const MIN_PASSWORD_LENGTH: usize = 8;

fn ensure_admin(user: &AuthedUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Administrator access required".into()))
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation {
            field: "password",
            message: format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
        });
    }
    Ok(())
}

/// `GET /api/users`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
) -> Result<Json<Vec<User>>, ApiError> {
    ensure_admin(&user)?;
    let conn = ctx.core.open_db()?;
    let users = db::list_users(&conn)?;
    Ok(Json(users))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    pub password: String,
}

/// `POST /api/users`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    ensure_admin(&user)?;

    let username = req.username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::Validation {
            field: "username",
            message: "username is required".into(),
        });
    }
    validate_password(&req.password)?;

    let conn = ctx.core.open_db()?;
    if db::get_user_by_username(&conn, &username)?.is_some() {
        return Err(ApiError::Validation {
            field: "username",
            message: "username is already taken".into(),
        });
    }

    let created = User {
        id: Uuid::new_v4(),
        username,
        display_name: req.display_name.trim().to_string(),
        role: req.role,
        created_at: chrono::Utc::now().naive_utc(),
    };
    db::insert_user(&conn, &created, &auth::derive_credentials(&req.password))?;

    tracing::info!(username = %created.username, role = created.role.as_str(), "User created");
    Ok(Json(created))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub password: Option<String>,
}

/// `PUT /api/users/:id` — profile/role update with optional password reset.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    ensure_admin(&user)?;
    let conn = ctx.core.open_db()?;

    let target = db::get_user(&conn, &id)?;

    // Demoting the last admin would lock everyone out, same as deleting it
    if target.role == UserRole::Admin
        && req.role != UserRole::Admin
        && db::count_admins(&conn)? <= 1
    {
        return Err(ApiError::Forbidden(
            "cannot demote the last administrator".into(),
        ));
    }

    if let Some(password) = &req.password {
        validate_password(password)?;
    }

    db::update_user(&conn, &id, req.display_name.trim(), req.role)?;
    if let Some(password) = &req.password {
        db::update_user_password(&conn, &id, &auth::derive_credentials(password))?;
    }

    let updated = db::get_user(&conn, &id)?;
    Ok(Json(updated))
}

/// `DELETE /api/users/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ensure_admin(&user)?;
    let conn = ctx.core.open_db()?;

    let target = db::get_user(&conn, &id)?;
    if target.role == UserRole::Admin && db::count_admins(&conn)? <= 1 {
        return Err(ApiError::Forbidden(
            "cannot delete the last administrator".into(),
        ));
    }

    db::delete_user(&conn, &id)?;
    tracing::info!(username = %target.username, "User deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}
