use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::Response,
};
use tracing::warn;

use super::domain::UserAccount;
use super::service::{AuthError, AuthService};
use crate::error::{json_error, repository_status};

/// Header carrying the caller's uid.
pub const USER_HEADER: &str = "x-santurist-user";

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserAccount);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);
        let uid = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok());

        auth.authorize_admin(uid).map(AdminUser).map_err(|err| {
            warn!(path = %parts.uri.path(), error = %err, "admin request rejected");
            auth_error_response(err)
        })
    }
}

pub(crate) fn auth_error_response(err: AuthError) -> Response {
    let status = match &err {
        AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        AuthError::InvalidRegistration => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::AlreadyRegistered(_) => StatusCode::CONFLICT,
        AuthError::UserNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Repository(repository) => repository_status(repository),
    };
    json_error(status, err.to_string())
}
