use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::bookings::{BookingError, BookingStatus};
use crate::payments::{PaymentError, PaymentReference, PaymentStatus};
use crate::tours::{CancellationPolicy, InstanceStatus, InventoryError};

#[tokio::test]
async fn booking_reserves_spots_and_links_payment() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let gateway = Arc::new(RecordingGateway::default());
    let service = service(&store, gateway.clone());

    let checkout = service
        .create_booking_with_payment(draft("i-1", 2, None), "Ana Rojas", "ana@example.cl", "+56 9 1234 5678", now())
        .await
        .expect("booking created");

    assert_eq!(checkout.total_amount, 2 * BASE_PRICE);
    assert_eq!(checkout.preference_id, "pref-1");

    let booking = service.get(&checkout.booking_id).expect("booking stored");
    assert_eq!(booking.status, BookingStatus::PendingPayment);
    assert_eq!(booking.payment.as_ref().map(|p| p.init_point.as_str()), Some(checkout.init_point.as_str()));

    let instance = store.tour_instances.require("i-1").expect("instance");
    assert_eq!(instance.booked_spots, 6);

    let requests = gateway.preferences.lock().expect("lock").clone();
    assert_eq!(
        requests[0].external_reference,
        PaymentReference::TourBooking(checkout.booking_id.clone())
    );
    assert_eq!(requests[0].items[0].quantity, 2);
}

#[tokio::test]
async fn full_instance_is_rejected_before_calling_the_gateway() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-full", 240, 8, 8, 4)]);
    let gateway = Arc::new(RecordingGateway::default());
    let service = service(&store, gateway.clone());

    let err = service
        .create_booking_with_payment(draft("i-full", 1, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect_err("full instance rejects");

    assert!(matches!(
        err,
        BookingError::Inventory(InventoryError::NotBookable {
            status: InstanceStatus::Full
        })
    ));
    assert_eq!(gateway.preference_count(), 0);
    assert!(store.tour_bookings.list().expect("list").is_empty());
}

#[tokio::test]
async fn oversized_party_reports_remaining_spots() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 8, 4)]);
    let service = service(&store, Arc::new(RecordingGateway::default()));

    let err = service
        .create_booking_with_payment(draft("i-1", 3, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect_err("not enough spots");

    assert!(matches!(
        err,
        BookingError::Inventory(InventoryError::InsufficientSpots {
            requested: 3,
            available: 2
        })
    ));
}

#[tokio::test]
async fn invalid_contact_is_rejected() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let service = service(&store, Arc::new(RecordingGateway::default()));

    let err = service
        .create_booking_with_payment(draft("i-1", 1, None), "Ana", "not-an-email", "912345678", now())
        .await
        .expect_err("invalid email");

    assert!(matches!(err, BookingError::InvalidContact(_)));
    assert_eq!(store.tour_instances.require("i-1").expect("instance").booked_spots, 4);
}

#[tokio::test]
async fn gateway_failure_releases_spots_and_marks_booking_failed() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let service = service(&store, Arc::new(FailingGateway));

    let err = service
        .create_booking_with_payment(draft("i-1", 3, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect_err("gateway down");

    assert!(matches!(err, BookingError::Payment(PaymentError::Transport(_))));
    assert_eq!(store.tour_instances.require("i-1").expect("instance").booked_spots, 4);

    let bookings = store.tour_bookings.list().expect("list");
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].status, BookingStatus::PaymentFailed);
}

#[tokio::test]
async fn idempotency_key_returns_the_existing_checkout() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let gateway = Arc::new(RecordingGateway::default());
    let service = service(&store, gateway.clone());

    let first = service
        .create_booking_with_payment(draft("i-1", 2, Some("checkout-abc")), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("first attempt");
    let retry = service
        .create_booking_with_payment(draft("i-1", 2, Some("checkout-abc")), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("retry");

    assert_eq!(first, retry);
    assert_eq!(gateway.preference_count(), 1);
    assert_eq!(store.tour_instances.require("i-1").expect("instance").booked_spots, 6);
}

#[tokio::test]
async fn approved_notification_confirms_once() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let service = service(&store, Arc::new(RecordingGateway::default()));
    let checkout = service
        .create_booking_with_payment(draft("i-1", 1, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("booking created");

    let confirmed = service
        .apply_payment_notification(&checkout.booking_id, PaymentStatus::Approved, Some("pay-1".to_string()), now())
        .await
        .expect("notification applied");
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.payment_id.as_deref(), Some("pay-1"));

    let repeated = service
        .apply_payment_notification(&checkout.booking_id, PaymentStatus::Rejected, None, now())
        .await
        .expect("late rejection ignored");
    assert_eq!(repeated.status, BookingStatus::Confirmed);
    assert_eq!(store.tour_instances.require("i-1").expect("instance").booked_spots, 5);
}

#[tokio::test]
async fn rejected_notification_returns_spots() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 240, 10, 4, 4)]);
    let service = service(&store, Arc::new(RecordingGateway::default()));
    let checkout = service
        .create_booking_with_payment(draft("i-1", 2, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("booking created");

    let failed = service
        .apply_payment_notification(&checkout.booking_id, PaymentStatus::Rejected, None, now())
        .await
        .expect("notification applied");

    assert_eq!(failed.status, BookingStatus::PaymentFailed);
    assert_eq!(store.tour_instances.require("i-1").expect("instance").booked_spots, 4);
}

#[tokio::test]
async fn cancelling_a_paid_booking_refunds_by_policy() {
    let store = store_with(CancellationPolicy::Moderate, vec![instance("i-1", 48, 10, 4, 4)]);
    let gateway = Arc::new(RecordingGateway::default());
    let service = service(&store, gateway.clone());
    let checkout = service
        .create_booking_with_payment(draft("i-1", 2, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("booking created");
    service
        .apply_payment_notification(&checkout.booking_id, PaymentStatus::Approved, Some("pay-7".to_string()), now())
        .await
        .expect("paid");

    let outcome = service
        .cancel_booking(&checkout.booking_id, now())
        .await
        .expect("cancelled");

    assert_eq!(outcome.refund_percent, 50);
    assert_eq!(outcome.refund_amount, BASE_PRICE);
    assert_eq!(outcome.booking.status, BookingStatus::Refunded);
    assert_eq!(gateway.refunds(), vec![("pay-7".to_string(), BASE_PRICE)]);
    assert_eq!(store.tour_instances.require("i-1").expect("instance").booked_spots, 4);
}

#[tokio::test]
async fn cancelling_twice_is_an_invalid_transition() {
    let store = store_with(CancellationPolicy::Strict, vec![instance("i-1", 48, 10, 4, 4)]);
    let service = service(&store, Arc::new(RecordingGateway::default()));
    let checkout = service
        .create_booking_with_payment(draft("i-1", 1, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("booking created");

    let outcome = service
        .cancel_booking(&checkout.booking_id, now())
        .await
        .expect("unpaid booking cancels");
    assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    assert_eq!(outcome.refund_amount, 0);

    let err = service
        .cancel_booking(&checkout.booking_id, now())
        .await
        .expect_err("already cancelled");
    assert!(matches!(
        err,
        BookingError::InvalidTransition {
            status: BookingStatus::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn sweep_cancels_under_booked_departures_and_refunds() {
    let store = store_with(
        CancellationPolicy::Strict,
        vec![instance("i-risk", 30, 10, 1, 4), instance("i-ok", 30, 10, 5, 4)],
    );
    let gateway = Arc::new(RecordingGateway::default());
    let service = service(&store, gateway.clone());

    let paid = service
        .create_booking_with_payment(draft("i-risk", 1, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("discounted booking");
    // 3 missing participants: 10% + 3 * 5%.
    assert_eq!(paid.total_amount, BASE_PRICE * 75 / 100);
    service
        .apply_payment_notification(&paid.booking_id, PaymentStatus::Approved, Some("pay-9".to_string()), now())
        .await
        .expect("paid");
    let pending = service
        .create_booking_with_payment(draft("i-risk", 1, None), "Luis", "luis@example.cl", "987654321", now())
        .await
        .expect("pending booking");

    let report = service
        .sweep_under_booked(now() + Duration::hours(7))
        .await
        .expect("sweep runs");

    assert_eq!(report.cancelled_instances, vec!["i-risk".to_string()]);
    assert_eq!(report.refunded_bookings, 1);
    assert_eq!(report.cancelled_bookings, 1);
    assert_eq!(gateway.refunds(), vec![("pay-9".to_string(), paid.total_amount)]);

    let cancelled = store.tour_instances.require("i-risk").expect("instance");
    assert_eq!(cancelled.status, InstanceStatus::Cancelled);
    assert!(cancelled.dynamic_pricing.is_none());
    assert_eq!(
        service.get(&pending.booking_id).expect("booking").status,
        BookingStatus::Cancelled
    );
    assert_ne!(
        store.tour_instances.require("i-ok").expect("instance").status,
        InstanceStatus::Cancelled
    );
}

#[tokio::test]
async fn booking_prices_the_departure_at_booking_time() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-later", 100, 10, 1, 4)]);
    let service = service(&store, Arc::new(RecordingGateway::default()));
    let stored = store.tour_instances.require("i-later").expect("instance");
    assert_eq!(stored.status, InstanceStatus::AtRisk);
    assert!(stored.dynamic_pricing.is_none());

    let checkout = service
        .create_booking_with_payment(
            draft("i-later", 1, None),
            "Ana",
            "ana@example.cl",
            "912345678",
            now() + Duration::hours(40),
        )
        .await
        .expect("booking inside the pricing window");

    // 3 missing participants once inside the 72 h window: 10% + 3 * 5%.
    assert_eq!(checkout.total_amount, BASE_PRICE * 75 / 100);
    let booking = service.get(&checkout.booking_id).expect("booking");
    assert_eq!(booking.price_per_person, BASE_PRICE * 75 / 100);
}

#[tokio::test]
async fn sweep_stores_pricing_that_became_active() {
    let store = store_with(
        CancellationPolicy::Flexible,
        vec![instance("i-later", 100, 10, 1, 4), instance("i-ok", 100, 10, 5, 4)],
    );
    let service = service(&store, Arc::new(RecordingGateway::default()));

    let report = service
        .sweep_under_booked(now() + Duration::hours(40))
        .await
        .expect("sweep runs");

    assert!(report.cancelled_instances.is_empty());
    assert_eq!(report.refreshed_instances, 1);
    let refreshed = store.tour_instances.require("i-later").expect("instance");
    assert_eq!(
        refreshed.dynamic_pricing.map(|pricing| pricing.discount_percentage),
        Some(25)
    );
}

#[tokio::test]
async fn pending_booking_cannot_be_cancelled_after_departure() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-1", 48, 10, 4, 4)]);
    let service = service(&store, Arc::new(RecordingGateway::default()));
    let checkout = service
        .create_booking_with_payment(draft("i-1", 2, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("booking created");

    let err = service
        .cancel_booking(&checkout.booking_id, now() + Duration::hours(49))
        .await
        .expect_err("departed");

    assert!(matches!(err, BookingError::Inventory(InventoryError::Departed)));
    assert_eq!(
        service.get(&checkout.booking_id).expect("booking").status,
        BookingStatus::PendingPayment
    );
    assert_eq!(store.tour_instances.require("i-1").expect("instance").booked_spots, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_never_oversell_the_last_spots() {
    let store = store_with(CancellationPolicy::Flexible, vec![instance("i-last", 240, 10, 8, 4)]);
    let service = Arc::new(service(&store, Arc::new(RecordingGateway::default())));

    let attempts: Vec<_> = (0..6)
        .map(|n| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create_booking_with_payment(
                        draft("i-last", 2, None),
                        &format!("Viajero {n}"),
                        &format!("viajero{n}@example.cl"),
                        "912345678",
                        now(),
                    )
                    .await
            })
        })
        .collect();

    let mut confirmed = 0;
    for attempt in attempts {
        match attempt.await.expect("task joined") {
            Ok(_) => confirmed += 1,
            Err(BookingError::Inventory(_)) => {}
            Err(other) => panic!("unexpected booking error: {other}"),
        }
    }

    assert_eq!(confirmed, 1);
    let instance = store.tour_instances.require("i-last").expect("instance");
    assert_eq!(instance.booked_spots, 10);
    assert_eq!(instance.status, InstanceStatus::Full);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn retried_checkout_queued_behind_the_sweep_reserves_once() {
    let store = store_with(
        CancellationPolicy::Strict,
        vec![instance("i-risk", 30, 10, 1, 4), instance("i-1", 240, 10, 4, 4)],
    );
    let gateway = Arc::new(GatedRefundGateway::default());
    let service = Arc::new(service(&store, gateway.clone()));

    let paid = service
        .create_booking_with_payment(draft("i-risk", 1, None), "Ana", "ana@example.cl", "912345678", now())
        .await
        .expect("booking created");
    service
        .apply_payment_notification(&paid.booking_id, PaymentStatus::Approved, Some("pay-3".to_string()), now())
        .await
        .expect("paid");

    // The sweep holds the inventory lock while its refund is parked.
    let sweep = tokio::spawn({
        let service = service.clone();
        async move { service.sweep_under_booked(now() + Duration::hours(7)).await }
    });
    gateway.refund_started.notified().await;

    let retries: Vec<_> = (0..2)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create_booking_with_payment(
                        draft("i-1", 1, Some("same-key")),
                        "Luis",
                        "luis@example.cl",
                        "987654321",
                        now(),
                    )
                    .await
            })
        })
        .collect();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    gateway.release.notify_one();

    let report = sweep.await.expect("sweep joined").expect("sweep runs");
    assert_eq!(report.refunded_bookings, 1);

    let mut checkouts = Vec::new();
    for retry in retries {
        match retry.await.expect("task joined") {
            Ok(checkout) => checkouts.push(checkout),
            Err(BookingError::DuplicateRequest) => {}
            Err(other) => panic!("unexpected booking error: {other}"),
        }
    }
    assert!(!checkouts.is_empty());
    assert!(checkouts
        .windows(2)
        .all(|pair| pair[0].booking_id == pair[1].booking_id));

    let keyed = store
        .tour_bookings
        .find(&|booking| booking.idempotency_key.as_deref() == Some("same-key"))
        .expect("find");
    assert_eq!(keyed.len(), 1);
    assert_eq!(store.tour_instances.require("i-1").expect("instance").booked_spots, 5);
}
