use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::bookings::router::booking_error_response;
use crate::bookings::BookingError;
use crate::payments::PaymentError;
use crate::store::RepositoryError;
use crate::tours::{CancellationPolicy, InstanceStatus, InventoryError};

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

#[tokio::test]
async fn create_route_returns_checkout_link() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let router = router(&store, Arc::new(RecordingGateway::default()));

    let response = router
        .oneshot(post_json(
            "/api/v1/tour-bookings",
            json!({
                "instance_id": "i-1",
                "number_of_people": 2,
                "name": "Ana Rojas",
                "email": "ana@example.cl",
                "phone": "+56 9 1234 5678"
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_amount"], json!(2 * BASE_PRICE));
    assert!(payload["init_point"].as_str().is_some());
}

#[tokio::test]
async fn create_route_rejects_invalid_contact() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let router = router(&store, Arc::new(RecordingGateway::default()));

    let response = router
        .oneshot(post_json(
            "/api/v1/tour-bookings",
            json!({
                "instance_id": "i-1",
                "number_of_people": 1,
                "name": "",
                "email": "ana@example.cl",
                "phone": "912345678"
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn quote_route_clamps_to_available_spots() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 8, 4)]);
    let router = router(&store, Arc::new(RecordingGateway::default()));

    let response = router
        .oneshot(
            Request::get("/api/v1/tour-instances/i-1/quote?people=5")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["number_of_people"], json!(2));
    assert_eq!(payload["total_amount"], json!(2 * BASE_PRICE));
}

#[tokio::test]
async fn unknown_tour_is_not_found() {
    let store = store_with(CancellationPolicy::Flexible, Vec::new());
    let router = router(&store, Arc::new(RecordingGateway::default()));

    let response = router
        .oneshot(
            Request::get("/api/v1/tours/missing")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tour_route_lists_instance_views() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let router = router(&store, Arc::new(RecordingGateway::default()));

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/tours/{TOUR_ID}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["instances"].as_array().map(Vec::len), Some(1));
}

#[test]
fn booking_errors_map_to_statuses() {
    let cases = [
        (
            BookingError::Inventory(InventoryError::NotBookable {
                status: InstanceStatus::Full,
            }),
            StatusCode::CONFLICT,
        ),
        (
            BookingError::Inventory(InventoryError::InvalidPartySize),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            BookingError::Payment(PaymentError::Transport("down".to_string())),
            StatusCode::BAD_GATEWAY,
        ),
        (
            BookingError::Repository(RepositoryError::NotFound {
                collection: "tourBookings",
                id: "b-1".to_string(),
            }),
            StatusCode::NOT_FOUND,
        ),
    ];

    for (err, expected) in cases {
        assert_eq!(booking_error_response(err).status(), expected);
    }
}
