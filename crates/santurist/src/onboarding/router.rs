use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;

use super::domain::OnboardingStep;
use super::service::{OnboardingError, OnboardingService};
use crate::error::{json_error, repository_status};

pub fn onboarding_router(service: Arc<OnboardingService>) -> Router {
    Router::new()
        .route("/api/v1/onboarding/:uid", get(state_handler))
        .route("/api/v1/onboarding/:uid/draft/:step", put(draft_handler))
        .route(
            "/api/v1/onboarding/:uid/steps/:step/complete",
            post(complete_handler),
        )
        .route("/api/v1/onboarding/:uid/reconcile", post(reconcile_handler))
        .with_state(service)
}

pub(crate) async fn state_handler(
    State(service): State<Arc<OnboardingService>>,
    Path(uid): Path<String>,
) -> Response {
    match service.state(&uid) {
        Ok(state) => (StatusCode::OK, Json(state)).into_response(),
        Err(err) => onboarding_error_response(err),
    }
}

pub(crate) async fn draft_handler(
    State(service): State<Arc<OnboardingService>>,
    Path((uid, step)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> Response {
    let result = parse_step(&step)
        .and_then(|step| service.update_draft(&uid, step, value, Utc::now()));
    match result {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(err) => onboarding_error_response(err),
    }
}

pub(crate) async fn complete_handler(
    State(service): State<Arc<OnboardingService>>,
    Path((uid, step)): Path<(String, String)>,
) -> Response {
    let result = parse_step(&step).and_then(|step| service.complete_step(&uid, step, Utc::now()));
    match result {
        Ok(progress) => (StatusCode::OK, Json(progress)).into_response(),
        Err(err) => onboarding_error_response(err),
    }
}

pub(crate) async fn reconcile_handler(
    State(service): State<Arc<OnboardingService>>,
    Path(uid): Path<String>,
) -> Response {
    match service.reconcile(&uid, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => onboarding_error_response(err),
    }
}

fn parse_step(raw: &str) -> Result<OnboardingStep, OnboardingError> {
    raw.parse().map_err(OnboardingError::UnknownStep)
}

fn onboarding_error_response(err: OnboardingError) -> Response {
    let status = match &err {
        OnboardingError::InvalidDraft(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OnboardingError::UnknownStep(_) => StatusCode::NOT_FOUND,
        OnboardingError::Repository(repository) => repository_status(repository),
    };
    json_error(status, err.to_string())
}
