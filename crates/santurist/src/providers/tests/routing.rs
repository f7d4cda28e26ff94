use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::auth::{UserRole, USER_HEADER};
use crate::providers::provider_router;
use crate::store::Store;

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn anyone_can_submit_a_lead() {
    let store = Store::in_memory();
    let router = provider_router(routes_state(&store));

    let response = router
        .oneshot(post_json(
            "/api/v1/provider-leads",
            json!({ "business_name": "Cosmo Tours", "category": "tours" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(store.provider_leads.list().expect("leads").len(), 1);
}

#[tokio::test]
async fn listing_leads_requires_an_admin() {
    let store = Store::in_memory();
    user(&store, "tourist", UserRole::Tourist);
    user(&store, "root", UserRole::Admin);
    let router = provider_router(routes_state(&store));

    let anonymous = router
        .clone()
        .oneshot(
            Request::get("/api/v1/provider-leads")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let tourist = router
        .clone()
        .oneshot(
            Request::get("/api/v1/provider-leads")
                .header(USER_HEADER, "tourist")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(tourist.status(), StatusCode::FORBIDDEN);

    let admin = router
        .oneshot(
            Request::get("/api/v1/provider-leads?status=new")
                .header(USER_HEADER, "root")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(admin.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_invitation_code_is_not_found() {
    let store = Store::in_memory();
    let router = provider_router(routes_state(&store));

    let response = router
        .oneshot(
            Request::post("/api/v1/invitations/ATK-2025-NADA-001/validate")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redeem_route_converts_the_lead() {
    let store = Store::in_memory();
    let lead = lead(&store);
    user(&store, "uid-marta", UserRole::Tourist);
    let state = routes_state(&store);
    let invitation = state
        .invitations
        .generate(&lead.id, None, "voyage", 2025, 30, Utc::now())
        .expect("generated");
    let router = provider_router(state);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/invitations/{}/redeem", invitation.code),
            json!({ "uid": "uid-marta" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
}
