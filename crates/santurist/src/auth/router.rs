use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::domain::UserRole;
use super::extract::{auth_error_response, AdminUser};
use super::service::AuthService;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

/// Sign-up, account lookup, and role management.
pub fn auth_router(auth: Arc<AuthService>) -> Router {
    Router::new()
        .route("/api/v1/users", post(register_handler))
        .route("/api/v1/users/:uid", get(account_handler))
        .route("/api/admin/users/:uid/role", put(role_handler))
        .with_state(auth)
}

pub(crate) async fn register_handler(
    State(auth): State<Arc<AuthService>>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    match auth.register(&request.uid, &request.email, &request.display_name, Utc::now()) {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(err) => auth_error_response(err),
    }
}

/// Polls briefly so a client reading right after sign-up sees its own account.
pub(crate) async fn account_handler(
    State(auth): State<Arc<AuthService>>,
    Path(uid): Path<String>,
) -> Response {
    match auth.wait_for_user(&uid).await {
        Ok(account) => Json(account).into_response(),
        Err(err) => auth_error_response(err),
    }
}

pub(crate) async fn role_handler(
    State(auth): State<Arc<AuthService>>,
    AdminUser(admin): AdminUser,
    Path(uid): Path<String>,
    Json(request): Json<RoleRequest>,
) -> Response {
    match auth.set_role(&uid, request.role) {
        Ok(account) => {
            info!(admin = %admin.uid, uid, role = ?request.role, "user role changed");
            Json(account).into_response()
        }
        Err(err) => auth_error_response(err),
    }
}
