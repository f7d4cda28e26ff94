use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use super::domain::BookingDraft;
use super::service::{BookingError, TourBookingService};
use crate::error::{json_error, repository_status};
use crate::tours::{InventoryError, TourCatalogService};

#[derive(Clone)]
pub struct TourRoutesState {
    pub catalog: Arc<TourCatalogService>,
    pub bookings: Arc<TourBookingService>,
}

/// Checkout form payload: the draft plus the contact fields.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(flatten)]
    pub draft: BookingDraft,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    #[serde(default = "default_people")]
    pub people: u32,
}

fn default_people() -> u32 {
    1
}

/// Router builder exposing the tour catalog and booking endpoints.
pub fn tour_router(state: TourRoutesState) -> Router {
    Router::new()
        .route("/api/v1/tours", get(list_tours_handler))
        .route("/api/v1/tours/:tour_id", get(tour_handler))
        .route(
            "/api/v1/tour-instances/:instance_id/quote",
            get(quote_handler),
        )
        .route("/api/v1/tour-bookings", post(create_booking_handler))
        .route("/api/v1/tour-bookings/:booking_id", get(booking_handler))
        .route(
            "/api/v1/tour-bookings/:booking_id/cancel",
            post(cancel_booking_handler),
        )
        .with_state(state)
}

pub(crate) async fn list_tours_handler(State(state): State<TourRoutesState>) -> Response {
    match state.catalog.list(Utc::now()) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => json_error(repository_status(&err), err.to_string()),
    }
}

pub(crate) async fn tour_handler(
    State(state): State<TourRoutesState>,
    Path(tour_id): Path<String>,
) -> Response {
    match state.catalog.get(&tour_id, Utc::now()) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => json_error(repository_status(&err), err.to_string()),
    }
}

pub(crate) async fn quote_handler(
    State(state): State<TourRoutesState>,
    Path(instance_id): Path<String>,
    Query(params): Query<QuoteParams>,
) -> Response {
    match state.catalog.quote(&instance_id, params.people, Utc::now()) {
        Ok(quote) => (StatusCode::OK, Json(quote)).into_response(),
        Err(err) => json_error(repository_status(&err), err.to_string()),
    }
}

pub(crate) async fn create_booking_handler(
    State(state): State<TourRoutesState>,
    Json(request): Json<CreateBookingRequest>,
) -> Response {
    let CreateBookingRequest {
        draft,
        name,
        email,
        phone,
    } = request;

    match state
        .bookings
        .create_booking_with_payment(draft, &name, &email, &phone, Utc::now())
        .await
    {
        Ok(checkout) => (StatusCode::CREATED, Json(checkout)).into_response(),
        Err(err) => booking_error_response(err),
    }
}

pub(crate) async fn booking_handler(
    State(state): State<TourRoutesState>,
    Path(booking_id): Path<String>,
) -> Response {
    match state.bookings.get(&booking_id) {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => booking_error_response(err),
    }
}

pub(crate) async fn cancel_booking_handler(
    State(state): State<TourRoutesState>,
    Path(booking_id): Path<String>,
) -> Response {
    match state.bookings.cancel_booking(&booking_id, Utc::now()).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => booking_error_response(err),
    }
}

pub(crate) fn booking_error_response(err: BookingError) -> Response {
    let status = match &err {
        BookingError::InvalidContact(_)
        | BookingError::Inventory(InventoryError::InvalidPartySize) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BookingError::DuplicateRequest
        | BookingError::InvalidTransition { .. }
        | BookingError::Inventory(_) => StatusCode::CONFLICT,
        BookingError::Payment(_) => StatusCode::BAD_GATEWAY,
        BookingError::Repository(repository) => repository_status(repository),
    };
    json_error(status, err.to_string())
}
