use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::bookings::{tour_router, BookingDraft, TourBookingService, TourRoutesState};
use crate::payments::{PaymentError, PaymentGateway, PaymentLink, PaymentRecord, PreferenceRequest};
use crate::store::Store;
use crate::tours::{
    CancellationPolicy, Difficulty, InstanceStatus, InventoryPolicy, Tour, TourCatalogService,
    TourCategory, TourInstance,
};

pub(super) const TOUR_ID: &str = "tour-valle";
pub(super) const BASE_PRICE: u64 = 45_000;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn tour(policy: CancellationPolicy) -> Tour {
    Tour {
        id: TOUR_ID.to_string(),
        provider_id: "provider-1".to_string(),
        title: "Valle de la Luna al atardecer".to_string(),
        description: "Caminata por el valle".to_string(),
        category: TourCategory::Valleys,
        difficulty: Difficulty::Easy,
        base_price: BASE_PRICE,
        duration_minutes: 240,
        meeting_point: "Plaza de San Pedro".to_string(),
        cancellation_policy: policy,
        seed_id: None,
    }
}

/// Instance departing `hours_ahead` after [`now`] with status and pricing already derived.
pub(super) fn instance(id: &str, hours_ahead: i64, capacity: u32, booked: u32, min: u32) -> TourInstance {
    let starts_at = now() + Duration::hours(hours_ahead);
    let mut instance = TourInstance {
        id: id.to_string(),
        tour_id: TOUR_ID.to_string(),
        date: starts_at.date_naive(),
        start_time: starts_at.time(),
        end_time: (starts_at + Duration::hours(4)).time(),
        capacity,
        booked_spots: booked,
        min_participants: min,
        status: InstanceStatus::Confirmed,
        dynamic_pricing: None,
        seed_id: None,
    };
    InventoryPolicy::default().refresh(&mut instance, BASE_PRICE, now());
    instance
}

pub(super) fn store_with(policy: CancellationPolicy, instances: Vec<TourInstance>) -> Store {
    let store = Store::in_memory();
    store.tours.insert(tour(policy)).expect("tour inserted");
    for instance in instances {
        store.tour_instances.insert(instance).expect("instance inserted");
    }
    store
}

pub(super) fn draft(instance_id: &str, people: u32, key: Option<&str>) -> BookingDraft {
    BookingDraft {
        instance_id: instance_id.to_string(),
        number_of_people: people,
        idempotency_key: key.map(str::to_string),
    }
}

#[derive(Default)]
pub(super) struct RecordingGateway {
    pub preferences: Mutex<Vec<PreferenceRequest>>,
    pub refunds: Mutex<Vec<(String, u64)>>,
}

impl RecordingGateway {
    pub(super) fn preference_count(&self) -> usize {
        self.preferences.lock().expect("preferences lock").len()
    }

    pub(super) fn refunds(&self) -> Vec<(String, u64)> {
        self.refunds.lock().expect("refunds lock").clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<PaymentLink, PaymentError> {
        let mut preferences = self.preferences.lock().expect("preferences lock");
        preferences.push(request.clone());
        let preference_id = format!("pref-{}", preferences.len());
        Ok(PaymentLink {
            init_point: format!("https://checkout.test/{preference_id}"),
            preference_id,
        })
    }

    async fn refund(&self, payment_id: &str, amount: u64) -> Result<(), PaymentError> {
        self.refunds
            .lock()
            .expect("refunds lock")
            .push((payment_id.to_string(), amount));
        Ok(())
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentError> {
        Err(PaymentError::UnknownPayment(payment_id.to_string()))
    }
}

/// Records like [`RecordingGateway`] but parks every refund until `release` fires.
#[derive(Default)]
pub(super) struct GatedRefundGateway {
    pub inner: RecordingGateway,
    pub refund_started: Notify,
    pub release: Notify,
}

#[async_trait]
impl PaymentGateway for GatedRefundGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<PaymentLink, PaymentError> {
        self.inner.create_preference(request).await
    }

    async fn refund(&self, payment_id: &str, amount: u64) -> Result<(), PaymentError> {
        self.refund_started.notify_one();
        self.release.notified().await;
        self.inner.refund(payment_id, amount).await
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentError> {
        self.inner.fetch_payment(payment_id).await
    }
}

pub(super) struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn create_preference(
        &self,
        _request: &PreferenceRequest,
    ) -> Result<PaymentLink, PaymentError> {
        Err(PaymentError::Transport("connection refused".to_string()))
    }

    async fn refund(&self, _payment_id: &str, _amount: u64) -> Result<(), PaymentError> {
        Err(PaymentError::Transport("connection refused".to_string()))
    }

    async fn fetch_payment(&self, _payment_id: &str) -> Result<PaymentRecord, PaymentError> {
        Err(PaymentError::Transport("connection refused".to_string()))
    }
}

pub(super) fn service(store: &Store, gateway: Arc<dyn PaymentGateway>) -> TourBookingService {
    TourBookingService::new(store.clone(), gateway, InventoryPolicy::default())
}

pub(super) fn router(store: &Store, gateway: Arc<dyn PaymentGateway>) -> axum::Router {
    tour_router(TourRoutesState {
        catalog: Arc::new(TourCatalogService::new(
            store.clone(),
            InventoryPolicy::default(),
        )),
        bookings: Arc::new(service(store, gateway)),
    })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
