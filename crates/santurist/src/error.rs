use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::payments::PaymentError;
use crate::seeds::{ScrapeError, SeedError};
use crate::store::RepositoryError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Store(RepositoryError),
    Seed(SeedError),
    Payment(PaymentError),
    Scrape(ScrapeError),
    Auth(AuthError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Seed(err) => write!(f, "seed error: {}", err),
            AppError::Payment(err) => write!(f, "payment error: {}", err),
            AppError::Scrape(err) => write!(f, "scrape error: {}", err),
            AppError::Auth(err) => write!(f, "auth error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Seed(err) => Some(err),
            AppError::Payment(err) => Some(err),
            AppError::Scrape(err) => Some(err),
            AppError::Auth(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Store(err) => repository_status(err),
            AppError::Seed(SeedError::UnknownSeed(_)) => StatusCode::BAD_REQUEST,
            AppError::Scrape(ScrapeError::InvalidUrl(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Payment(_) | AppError::Scrape(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Auth(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Seed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        json_error(status, self.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Store(value)
    }
}

impl From<SeedError> for AppError {
    fn from(value: SeedError) -> Self {
        Self::Seed(value)
    }
}

impl From<PaymentError> for AppError {
    fn from(value: PaymentError) -> Self {
        Self::Payment(value)
    }
}

impl From<ScrapeError> for AppError {
    fn from(value: ScrapeError) -> Self {
        Self::Scrape(value)
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

/// `{ "error": message }` body with the given status.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(json!({ "error": message.into() }));
    (status, body).into_response()
}

pub fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RepositoryError::Conflict { .. } => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
