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

use super::domain::CartItem;
use super::service::{CartError, CartService};
use crate::error::{json_error, repository_status};

#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub payer_email: String,
}

pub fn cart_router(service: Arc<CartService>) -> Router {
    Router::new()
        .route(
            "/api/v1/carts/:cart_id",
            get(cart_handler).delete(clear_handler),
        )
        .route("/api/v1/carts/:cart_id/items", post(add_item_handler))
        .route(
            "/api/v1/carts/:cart_id/items/:item_id",
            put(update_item_handler).delete(remove_item_handler),
        )
        .route("/api/v1/carts/:cart_id/checkout", post(checkout_handler))
        .with_state(service)
}

pub(crate) async fn cart_handler(
    State(service): State<Arc<CartService>>,
    Path(cart_id): Path<String>,
) -> Response {
    respond(service.view(&cart_id, Utc::now()), StatusCode::OK)
}

pub(crate) async fn clear_handler(
    State(service): State<Arc<CartService>>,
    Path(cart_id): Path<String>,
) -> Response {
    respond(service.clear(&cart_id, Utc::now()), StatusCode::OK)
}

pub(crate) async fn add_item_handler(
    State(service): State<Arc<CartService>>,
    Path(cart_id): Path<String>,
    Json(item): Json<CartItem>,
) -> Response {
    respond(service.add_item(&cart_id, item, Utc::now()), StatusCode::OK)
}

pub(crate) async fn update_item_handler(
    State(service): State<Arc<CartService>>,
    Path((cart_id, item_id)): Path<(String, String)>,
    Json(update): Json<QuantityUpdate>,
) -> Response {
    respond(
        service.update_quantity(&cart_id, &item_id, update.quantity, Utc::now()),
        StatusCode::OK,
    )
}

pub(crate) async fn remove_item_handler(
    State(service): State<Arc<CartService>>,
    Path((cart_id, item_id)): Path<(String, String)>,
) -> Response {
    respond(
        service.remove_item(&cart_id, &item_id, Utc::now()),
        StatusCode::OK,
    )
}

pub(crate) async fn checkout_handler(
    State(service): State<Arc<CartService>>,
    Path(cart_id): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> Response {
    let result = service
        .checkout(&cart_id, &request.payer_email, Utc::now())
        .await;
    respond(result, StatusCode::CREATED)
}

fn respond<T: serde::Serialize>(result: Result<T, CartError>, success: StatusCode) -> Response {
    match result {
        Ok(body) => (success, Json(body)).into_response(),
        Err(err) => cart_error_response(err),
    }
}

pub(crate) fn cart_error_response(err: CartError) -> Response {
    let status = match &err {
        CartError::InvalidItem(_) | CartError::InvalidEmail | CartError::Overflow(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CartError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
        CartError::EmptyCart => StatusCode::CONFLICT,
        CartError::Payment(_) => StatusCode::BAD_GATEWAY,
        CartError::Repository(repository) => repository_status(repository),
    };
    json_error(status, err.to_string())
}
