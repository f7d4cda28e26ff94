use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use super::{PaymentError, PaymentGateway, PaymentNotification, PaymentReference};
use crate::bookings::router::booking_error_response;
use crate::bookings::TourBookingService;
use crate::cart::router::cart_error_response;
use crate::cart::CartService;
use crate::error::json_error;

#[derive(Clone)]
pub struct PaymentRoutesState {
    pub bookings: Arc<TourBookingService>,
    pub carts: Arc<CartService>,
    pub gateway: Arc<dyn PaymentGateway>,
}

/// Provider webhook: routes the outcome to the booking or order named by the reference.
///
/// The body only names a payment. Its reference and status are taken from the provider's
/// own record, so a forged callback cannot settle anything.
pub fn payment_router(state: PaymentRoutesState) -> Router {
    Router::new()
        .route("/api/v1/payments/notifications", post(notification_handler))
        .with_state(state)
}

pub(crate) async fn notification_handler(
    State(state): State<PaymentRoutesState>,
    Json(notification): Json<PaymentNotification>,
) -> Response {
    let PaymentNotification {
        external_reference,
        status: claimed,
        payment_id,
    } = notification;
    info!(reference = %external_reference, ?claimed, "payment notification received");

    let Some(payment_id) = payment_id else {
        return json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "payment_id is required to verify a notification",
        );
    };
    let record = match state.gateway.fetch_payment(&payment_id).await {
        Ok(record) => record,
        Err(err) => {
            warn!(%payment_id, error = %err, "payment notification could not be verified");
            return payment_error_response(err);
        }
    };
    if record.external_reference != external_reference {
        warn!(%payment_id, claimed = %external_reference, actual = %record.external_reference, "payment notification names another reference");
        return json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "payment does not belong to this reference",
        );
    }
    let status = record.status;
    let payment_id = Some(record.payment_id);

    match &external_reference {
        PaymentReference::TourBooking(booking_id) => match state
            .bookings
            .apply_payment_notification(booking_id, status, payment_id, Utc::now())
            .await
        {
            Ok(booking) => acknowledged(&external_reference, booking.status.label()),
            Err(err) => booking_error_response(err),
        },
        PaymentReference::Order(order_id) => match state.carts.apply_payment_notification(
            order_id,
            status,
            payment_id,
            Utc::now(),
        ) {
            Ok(order) => acknowledged(&external_reference, order.status.label()),
            Err(err) => cart_error_response(err),
        },
    }
}

pub fn payment_error_response(err: PaymentError) -> Response {
    let status = match &err {
        PaymentError::UnknownPayment(_) => StatusCode::NOT_FOUND,
        PaymentError::InvalidResponse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PaymentError::Rejected { .. } | PaymentError::Transport(_) => StatusCode::BAD_GATEWAY,
    };
    json_error(status, err.to_string())
}

fn acknowledged(reference: &PaymentReference, status: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "reference": reference, "status": status })),
    )
        .into_response()
}
