use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use super::domain::{LeadSource, LeadStatus, NewLead};
use super::invitations::{InvitationError, InvitationService};
use super::service::{ProviderError, ProviderService};
use crate::auth::{AdminUser, AuthService};
use crate::error::{json_error, repository_status};

#[derive(Clone)]
pub struct ProviderRoutesState {
    pub providers: Arc<ProviderService>,
    pub invitations: Arc<InvitationService>,
    pub auth: Arc<AuthService>,
}

impl FromRef<ProviderRoutesState> for Arc<AuthService> {
    fn from_ref(state: &ProviderRoutesState) -> Self {
        state.auth.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: LeadStatus,
}

#[derive(Debug, Deserialize)]
pub struct GenerateInvitationRequest {
    pub lead_id: String,
    #[serde(default)]
    pub stay_id: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,
}

fn default_ttl_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub uid: String,
}

pub fn provider_router(state: ProviderRoutesState) -> Router {
    Router::new()
        .route(
            "/api/v1/provider-leads",
            get(list_leads_handler).post(create_lead_handler),
        )
        .route("/api/v1/provider-leads/import", post(import_leads_handler))
        .route(
            "/api/v1/provider-leads/:lead_id/status",
            put(lead_status_handler),
        )
        .route("/api/v1/invitations", post(generate_invitation_handler))
        .route(
            "/api/v1/invitations/:code/validate",
            post(validate_invitation_handler),
        )
        .route(
            "/api/v1/invitations/:code/redeem",
            post(redeem_invitation_handler),
        )
        .route(
            "/api/v1/invitations/:code/revoke",
            post(revoke_invitation_handler),
        )
        .with_state(state)
}

pub(crate) async fn create_lead_handler(
    State(state): State<ProviderRoutesState>,
    Json(lead): Json<NewLead>,
) -> Response {
    match state
        .providers
        .create_lead(lead, LeadSource::Manual, Utc::now())
    {
        Ok(lead) => (StatusCode::CREATED, Json(lead)).into_response(),
        Err(err) => provider_error_response(err),
    }
}

pub(crate) async fn list_leads_handler(
    _admin: AdminUser,
    State(state): State<ProviderRoutesState>,
    Query(filter): Query<LeadFilter>,
) -> Response {
    match state.providers.list_leads(filter.status) {
        Ok(leads) => (StatusCode::OK, Json(leads)).into_response(),
        Err(err) => provider_error_response(err),
    }
}

/// Body is the raw CSV export.
pub(crate) async fn import_leads_handler(
    _admin: AdminUser,
    State(state): State<ProviderRoutesState>,
    body: String,
) -> Response {
    match state.providers.import_csv(body.as_bytes(), Utc::now()) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => provider_error_response(err),
    }
}

pub(crate) async fn lead_status_handler(
    _admin: AdminUser,
    State(state): State<ProviderRoutesState>,
    Path(lead_id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Response {
    match state.providers.update_lead_status(&lead_id, change.status) {
        Ok(lead) => (StatusCode::OK, Json(lead)).into_response(),
        Err(err) => provider_error_response(err),
    }
}

pub(crate) async fn generate_invitation_handler(
    _admin: AdminUser,
    State(state): State<ProviderRoutesState>,
    Json(request): Json<GenerateInvitationRequest>,
) -> Response {
    let now = Utc::now();
    let result = state.invitations.generate(
        &request.lead_id,
        request.stay_id.as_deref(),
        &request.slug,
        request.year.unwrap_or_else(|| now.year()),
        request.ttl_days,
        now,
    );
    match result {
        Ok(invitation) => (StatusCode::CREATED, Json(invitation)).into_response(),
        Err(err) => invitation_error_response(err),
    }
}

pub(crate) async fn validate_invitation_handler(
    State(state): State<ProviderRoutesState>,
    Path(code): Path<String>,
) -> Response {
    match state.invitations.validate(&code, Utc::now()) {
        Ok(invitation) => (StatusCode::OK, Json(invitation)).into_response(),
        Err(err) => invitation_error_response(err),
    }
}

pub(crate) async fn redeem_invitation_handler(
    State(state): State<ProviderRoutesState>,
    Path(code): Path<String>,
    Json(request): Json<RedeemRequest>,
) -> Response {
    match state.invitations.redeem(&code, &request.uid, Utc::now()) {
        Ok(redemption) => (StatusCode::OK, Json(redemption)).into_response(),
        Err(err) => invitation_error_response(err),
    }
}

pub(crate) async fn revoke_invitation_handler(
    _admin: AdminUser,
    State(state): State<ProviderRoutesState>,
    Path(code): Path<String>,
) -> Response {
    match state.invitations.revoke(&code) {
        Ok(invitation) => (StatusCode::OK, Json(invitation)).into_response(),
        Err(err) => invitation_error_response(err),
    }
}

pub(crate) fn provider_error_response(err: ProviderError) -> Response {
    let status = match &err {
        ProviderError::InvalidLead(_) | ProviderError::Csv(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ProviderError::DuplicateLead { .. } | ProviderError::InvalidStatusChange { .. } => {
            StatusCode::CONFLICT
        }
        ProviderError::Onboarding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ProviderError::Repository(repository) => repository_status(repository),
    };
    json_error(status, err.to_string())
}

fn invitation_error_response(err: InvitationError) -> Response {
    let status = match &err {
        InvitationError::UnknownCode(_) => StatusCode::NOT_FOUND,
        InvitationError::Expired(_) => StatusCode::GONE,
        InvitationError::AlreadyRedeemed(_)
        | InvitationError::Revoked(_)
        | InvitationError::SequenceExhausted(_) => StatusCode::CONFLICT,
        InvitationError::InvalidSlug(_) | InvitationError::UnknownUser(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        InvitationError::Repository(repository) => repository_status(repository),
    };
    json_error(status, err.to_string())
}
