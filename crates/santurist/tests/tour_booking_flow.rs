//! Tour checkout from the seeded catalog through the payment webhook and a refunded cancellation.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use santurist::bookings::{BookingDraft, BookingStatus, TourBookingService};
use santurist::cart::{CartService, FeeConfig};
use santurist::payments::{
    payment_router, PaymentReference, PaymentRoutesState, PaymentStatus, SandboxGateway,
};
use santurist::seeds::seed_tours;
use santurist::store::{Repository, Store};
use santurist::tours::InventoryPolicy;

const INSTANCE_ID: &str = "instance-lagunas-altiplanicas-2";

async fn notify(app: axum::Router, reference: &str, status: &str) -> (StatusCode, Value) {
    let body = json!({
        "external_reference": reference,
        "status": status,
        "payment_id": "mp-778",
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/payments/notifications")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&bytes).expect("json"))
}

#[tokio::test]
async fn paid_booking_can_be_cancelled_with_a_full_refund() {
    let store = Store::in_memory();
    let policy = InventoryPolicy::default();
    let now = Utc::now();
    seed_tours(&store, &policy, now).expect("catalog seeded");

    let gateway = Arc::new(SandboxGateway::default());
    let bookings = Arc::new(TourBookingService::new(store.clone(), gateway.clone(), policy));
    let carts = Arc::new(CartService::new(store.clone(), gateway.clone(), FeeConfig::default()));
    let app = payment_router(PaymentRoutesState {
        bookings: bookings.clone(),
        carts,
        gateway: gateway.clone(),
    });

    let checkout = bookings
        .create_booking_with_payment(
            BookingDraft {
                instance_id: INSTANCE_ID.to_string(),
                number_of_people: 2,
                idempotency_key: Some("checkout-1".to_string()),
            },
            "Valentina Rojas",
            "valentina@example.com",
            "+56 9 8765 4321",
            now,
        )
        .await
        .expect("checkout created");
    assert!(!checkout.init_point.is_empty());

    let instance = store.tour_instances.require(INSTANCE_ID).expect("instance");
    assert_eq!(instance.booked_spots, 8);

    gateway
        .settle(
            "mp-778",
            PaymentReference::TourBooking(checkout.booking_id.clone()),
            PaymentStatus::Approved,
        )
        .expect("payment settled");
    let reference = format!("booking:{}", checkout.booking_id);
    let (status, body) = notify(app.clone(), &reference, "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    // A repeated webhook delivery changes nothing.
    let (_, body) = notify(app, &reference, "approved").await;
    assert_eq!(body["status"], "confirmed");
    let instance = store.tour_instances.require(INSTANCE_ID).expect("instance");
    assert_eq!(instance.booked_spots, 8);

    let outcome = bookings
        .cancel_booking(&checkout.booking_id, Utc::now())
        .await
        .expect("cancelled");
    assert_eq!(outcome.booking.status, BookingStatus::Refunded);
    assert_eq!(outcome.refund_percent, 100);
    assert_eq!(outcome.refund_amount, checkout.total_amount);

    let instance = store.tour_instances.require(INSTANCE_ID).expect("instance");
    assert_eq!(instance.booked_spots, 6);
}

#[tokio::test]
async fn unknown_reference_prefix_is_rejected() {
    let store = Store::in_memory();
    let gateway = Arc::new(SandboxGateway::default());
    let app = payment_router(PaymentRoutesState {
        bookings: Arc::new(TourBookingService::new(
            store.clone(),
            gateway.clone(),
            InventoryPolicy::default(),
        )),
        carts: Arc::new(CartService::new(store, gateway.clone(), FeeConfig::default())),
        gateway,
    });

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/payments/notifications")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "external_reference": "invoice:1", "status": "approved" }).to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert!(response.status().is_client_error());
}
