//! Shared types for the API layer.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Session;
use crate::core_state::CoreState;
use crate::models::enums::UserRole;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Authenticated user context, injected into request extensions by the auth
/// middleware after token validation. Carries the presented token so logout
/// can revoke it.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub token: String,
}

impl AuthedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn from_session(session: Session, token: String) -> Self {
        Self {
            user_id: session.user_id,
            username: session.username,
            role: session.role,
            token,
        }
    }
}
