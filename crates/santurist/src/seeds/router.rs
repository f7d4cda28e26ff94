use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::runner::{cleanup_all, cleanup_seed, generate_seed_file, run_all, run_seed};
use super::scrape::{scrape_provider, PageFetcher, ScrapeError};
use super::{SeedError, SeedKind};
use crate::auth::{AdminUser, AuthService};
use crate::bookings::router::booking_error_response;
use crate::bookings::TourBookingService;
use crate::error::{json_error, repository_status};
use crate::providers::router::provider_error_response;
use crate::providers::{LeadSource, ProviderCategory, ProviderService};
use crate::store::Store;
use crate::tours::InventoryPolicy;

#[derive(Clone)]
pub struct AdminRoutesState {
    pub store: Store,
    pub auth: Arc<AuthService>,
    pub bookings: Arc<TourBookingService>,
    pub providers: Arc<ProviderService>,
    pub policy: InventoryPolicy,
    pub output_dir: PathBuf,
    pub fetcher: Arc<dyn PageFetcher>,
}

impl FromRef<AdminRoutesState> for Arc<AuthService> {
    fn from_ref(state: &AdminRoutesState) -> Self {
        state.auth.clone()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteSeedRequest {
    #[serde(default)]
    pub seed: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupSeedRequest {
    pub seed: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateSeedFileRequest {
    /// Bare file name inside the configured output directory.
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub category: Option<ProviderCategory>,
    #[serde(default)]
    pub create_lead: bool,
}

pub fn admin_router(state: AdminRoutesState) -> Router {
    Router::new()
        .route("/api/admin/execute-seed", post(execute_seed_handler))
        .route("/api/admin/cleanup-seed", post(cleanup_seed_handler))
        .route("/api/admin/cleanup-all", post(cleanup_all_handler))
        .route("/api/admin/generate-seed-file", post(generate_seed_file_handler))
        .route("/api/admin/inventory/sweep", post(sweep_handler))
        .route("/api/scrape-provider", post(scrape_provider_handler))
        .with_state(state)
}

pub(crate) async fn execute_seed_handler(
    State(state): State<AdminRoutesState>,
    AdminUser(admin): AdminUser,
    payload: Option<Json<ExecuteSeedRequest>>,
) -> Response {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let now = Utc::now();

    let result = match request.seed.as_deref() {
        Some(seed) => seed.parse::<SeedKind>().and_then(|kind| {
            run_seed(kind, &state.store, &state.policy, now).map(|outcome| json!(outcome))
        }),
        None => run_all(&state.store, &state.policy, now, &mut io::sink())
            .map(|summary| json!(summary)),
    };

    match result {
        Ok(body) => {
            info!(admin = %admin.uid, seed = ?request.seed, "seed executed");
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => seed_error_response(err),
    }
}

pub(crate) async fn cleanup_seed_handler(
    State(state): State<AdminRoutesState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<CleanupSeedRequest>,
) -> Response {
    match cleanup_seed(&state.store, &request.seed) {
        Ok(report) => {
            let total = report.total();
            Json(json!({ "removed": report.removed, "total": total })).into_response()
        }
        Err(err) => seed_error_response(err),
    }
}

pub(crate) async fn cleanup_all_handler(
    State(state): State<AdminRoutesState>,
    AdminUser(_admin): AdminUser,
) -> Response {
    match cleanup_all(&state.store) {
        Ok(report) => {
            let total = report.total();
            Json(json!({ "removed": report.removed, "total": total })).into_response()
        }
        Err(err) => seed_error_response(err),
    }
}

pub(crate) async fn generate_seed_file_handler(
    State(state): State<AdminRoutesState>,
    AdminUser(_admin): AdminUser,
    payload: Option<Json<GenerateSeedFileRequest>>,
) -> Response {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let file_name = match request.file_name {
        Some(name) if is_plain_file_name(&name) => name,
        Some(name) => {
            return json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("'{name}' is not a plain file name"),
            )
        }
        None => format!("seed-{}.json", Utc::now().format("%Y%m%d-%H%M%S")),
    };
    let path = state.output_dir.join(file_name);

    match generate_seed_file(&state.store, Some(&path)) {
        Ok(snapshot) => Json(json!({
            "path": path.display().to_string(),
            "documents": snapshot.document_count(),
        }))
        .into_response(),
        Err(err) => seed_error_response(err),
    }
}

pub(crate) async fn sweep_handler(
    State(state): State<AdminRoutesState>,
    AdminUser(_admin): AdminUser,
) -> Response {
    match state.bookings.sweep_under_booked(Utc::now()).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => booking_error_response(err),
    }
}

pub(crate) async fn scrape_provider_handler(
    State(state): State<AdminRoutesState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<ScrapeRequest>,
) -> Response {
    let scraped = match scrape_provider(state.fetcher.as_ref(), &request.url).await {
        Ok(scraped) => scraped,
        Err(err) => return scrape_error_response(err),
    };

    if !request.create_lead {
        return Json(scraped).into_response();
    }

    let category = request.category.unwrap_or(ProviderCategory::Tours);
    let new_lead = scraped.clone().into_new_lead(category);
    match state
        .providers
        .create_lead(new_lead, LeadSource::Scraped, Utc::now())
    {
        Ok(lead) => (
            StatusCode::CREATED,
            Json(json!({ "scraped": scraped, "lead": lead })),
        )
            .into_response(),
        Err(err) => provider_error_response(err),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

pub(crate) fn seed_error_response(err: SeedError) -> Response {
    let status = match &err {
        SeedError::UnknownSeed(_) => StatusCode::BAD_REQUEST,
        SeedError::Repository(repository) => repository_status(repository),
        SeedError::Io(_) | SeedError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.to_string())
}

fn scrape_error_response(err: ScrapeError) -> Response {
    let status = match &err {
        ScrapeError::InvalidUrl(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScrapeError::Fetch(_) | ScrapeError::Status(_) | ScrapeError::TooLarge => {
            StatusCode::BAD_GATEWAY
        }
        ScrapeError::Pattern(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.to_string())
}
