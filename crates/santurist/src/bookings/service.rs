use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{
    BookingCheckout, BookingDraft, BookingStatus, CancellationOutcome, ContactInfo, SweepReport,
    TourBooking,
};
use crate::payments::{
    PaymentError, PaymentGateway, PaymentReference, PaymentStatus, PreferenceItem,
    PreferenceRequest,
};
use crate::store::{RepositoryError, Store};
use crate::tours::{InventoryError, InventoryPolicy, Tour, TourInstance};

/// Creates tour bookings, links them to payments, and keeps instance inventory in step.
pub struct TourBookingService {
    store: Store,
    gateway: Arc<dyn PaymentGateway>,
    policy: InventoryPolicy,
    inventory: Mutex<()>,
}

impl TourBookingService {
    pub fn new(store: Store, gateway: Arc<dyn PaymentGateway>, policy: InventoryPolicy) -> Self {
        Self {
            store,
            gateway,
            policy,
            inventory: Mutex::new(()),
        }
    }

    /// Reserve spots, write a pending booking, and request a checkout link.
    ///
    /// When the payment provider fails the booking is marked `payment_failed` and its spots
    /// are returned to the instance before the error is surfaced.
    pub async fn create_booking_with_payment(
        &self,
        draft: BookingDraft,
        name: &str,
        email: &str,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<BookingCheckout, BookingError> {
        let contact_info = ContactInfo {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
        };
        contact_info.validate().map_err(BookingError::InvalidContact)?;

        let (booking, tour) = match self.reserve(draft, contact_info, now).await? {
            Reservation::Existing(existing) => return existing_checkout(existing),
            Reservation::Created(booking, tour) => (booking, tour),
        };

        let request = PreferenceRequest {
            external_reference: PaymentReference::TourBooking(booking.id.clone()),
            items: vec![PreferenceItem {
                title: tour.title.clone(),
                quantity: booking.number_of_people,
                unit_price: booking.price_per_person,
            }],
            payer_email: booking.contact_info.email.clone(),
        };

        match self.gateway.create_preference(&request).await {
            Ok(payment) => {
                let mut booking = booking;
                booking.payment = Some(payment.clone());
                booking.updated_at = now;
                self.store.tour_bookings.update(booking.clone())?;
                info!(booking_id = %booking.id, total = booking.total_amount, "tour booking awaiting payment");
                Ok(BookingCheckout {
                    booking_id: booking.id,
                    preference_id: payment.preference_id,
                    init_point: payment.init_point,
                    total_amount: booking.total_amount,
                })
            }
            Err(err) => {
                warn!(booking_id = %booking.id, error = %err, "payment preference failed, releasing spots");
                let _guard = self.inventory.lock().await;
                self.release_spots(&booking, now)?;
                let mut failed = booking;
                failed.status = BookingStatus::PaymentFailed;
                failed.updated_at = now;
                self.store.tour_bookings.update(failed)?;
                Err(BookingError::Payment(err))
            }
        }
    }

    /// The idempotency lookup and the spot reservation share one critical section, so a
    /// retried request never reserves twice.
    async fn reserve(
        &self,
        draft: BookingDraft,
        contact_info: ContactInfo,
        now: DateTime<Utc>,
    ) -> Result<Reservation, BookingError> {
        let _guard = self.inventory.lock().await;

        if let Some(key) = draft.idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(key)? {
                return Ok(Reservation::Existing(existing));
            }
        }

        let mut instance = self.store.tour_instances.require(&draft.instance_id)?;
        let tour = self.store.tours.require(&instance.tour_id)?;
        self.policy.refresh(&mut instance, tour.base_price, now);
        let price_per_person = instance.price_per_person(tour.base_price);

        let before = instance.clone();
        self.policy
            .reserve(&mut instance, draft.number_of_people, tour.base_price, now)?;
        self.store.tour_instances.update(instance)?;

        let booking = TourBooking {
            id: Uuid::new_v4().to_string(),
            tour_id: tour.id.clone(),
            instance_id: draft.instance_id,
            number_of_people: draft.number_of_people,
            price_per_person,
            total_amount: price_per_person * u64::from(draft.number_of_people),
            contact_info,
            status: BookingStatus::PendingPayment,
            payment: None,
            payment_id: None,
            refund_amount: None,
            idempotency_key: draft.idempotency_key,
            created_at: now,
            updated_at: now,
        };

        match self.store.tour_bookings.insert(booking) {
            Ok(booking) => Ok(Reservation::Created(booking, tour)),
            Err(err) => {
                self.store.tour_instances.update(before)?;
                Err(err.into())
            }
        }
    }

    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<TourBooking>, BookingError> {
        let mut matches = self.store.tour_bookings.find(&|booking| {
            booking.idempotency_key.as_deref() == Some(key)
                && booking.status != BookingStatus::PaymentFailed
        })?;
        Ok(matches.pop())
    }

    fn release_spots(&self, booking: &TourBooking, now: DateTime<Utc>) -> Result<(), BookingError> {
        let mut instance = self.store.tour_instances.require(&booking.instance_id)?;
        let tour = self.store.tours.require(&instance.tour_id)?;
        self.policy
            .release(&mut instance, booking.number_of_people, tour.base_price, now);
        self.store.tour_instances.update(instance)?;
        Ok(())
    }

    pub fn get(&self, booking_id: &str) -> Result<TourBooking, BookingError> {
        Ok(self.store.tour_bookings.require(booking_id)?)
    }

    /// Applies the provider's payment outcome. Only pending bookings transition on
    /// approval or rejection, so repeated notifications are harmless.
    pub async fn apply_payment_notification(
        &self,
        booking_id: &str,
        status: PaymentStatus,
        payment_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TourBooking, BookingError> {
        let _guard = self.inventory.lock().await;
        let mut booking = self.store.tour_bookings.require(booking_id)?;

        match (booking.status, status) {
            (BookingStatus::PendingPayment, PaymentStatus::Approved) => {
                booking.status = BookingStatus::Confirmed;
                booking.payment_id = payment_id;
                info!(booking_id, "tour booking paid");
            }
            (
                BookingStatus::PendingPayment,
                PaymentStatus::Rejected | PaymentStatus::Cancelled,
            ) => {
                self.release_spots(&booking, now)?;
                booking.status = BookingStatus::PaymentFailed;
                warn!(booking_id, ?status, "tour booking payment did not complete");
            }
            (BookingStatus::Confirmed, PaymentStatus::Refunded) => {
                self.release_spots(&booking, now)?;
                booking.status = BookingStatus::Refunded;
                booking.refund_amount = Some(booking.total_amount);
            }
            _ => return Ok(booking),
        }

        booking.updated_at = now;
        self.store.tour_bookings.update(booking.clone())?;
        Ok(booking)
    }

    /// Cancel a booking, refunding paid bookings according to the tour's policy.
    pub async fn cancel_booking(
        &self,
        booking_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CancellationOutcome, BookingError> {
        let _guard = self.inventory.lock().await;
        let mut booking = self.store.tour_bookings.require(booking_id)?;
        let instance = self.store.tour_instances.require(&booking.instance_id)?;
        let tour = self.store.tours.require(&booking.tour_id)?;

        if !booking.status.holds_spots() {
            return Err(BookingError::InvalidTransition {
                status: booking.status,
                action: "cancel",
            });
        }
        if instance.has_departed(now) {
            return Err(InventoryError::Departed.into());
        }

        let (refund_percent, refund_amount) = match booking.status {
            BookingStatus::Confirmed => {
                let percent = tour
                    .cancellation_policy
                    .refund_percent(instance.hours_until_departure(now));
                let amount = booking.total_amount * percent / 100;
                self.issue_refund(&booking, amount).await?;
                (percent, amount)
            }
            _ => (0, 0),
        };

        self.release_spots(&booking, now)?;
        booking.status = if refund_amount > 0 {
            BookingStatus::Refunded
        } else {
            BookingStatus::Cancelled
        };
        if booking.payment_id.is_some() || refund_amount > 0 {
            booking.refund_amount = Some(refund_amount);
        }
        booking.updated_at = now;
        self.store.tour_bookings.update(booking.clone())?;

        info!(booking_id, refund_amount, "tour booking cancelled");
        Ok(CancellationOutcome {
            booking,
            refund_percent,
            refund_amount,
        })
    }

    async fn issue_refund(&self, booking: &TourBooking, amount: u64) -> Result<(), BookingError> {
        if amount == 0 {
            return Ok(());
        }
        match booking.payment_id.as_deref() {
            Some(payment_id) => Ok(self.gateway.refund(payment_id, amount).await?),
            None => {
                warn!(booking_id = %booking.id, "confirmed booking has no payment id, refund recorded only");
                Ok(())
            }
        }
    }

    /// Cancels under-booked instances past the cutoff and refunds their bookings in full.
    pub async fn sweep_under_booked(&self, now: DateTime<Utc>) -> Result<SweepReport, BookingError> {
        let _guard = self.inventory.lock().await;
        let mut report = SweepReport::default();

        let due: Vec<TourInstance> = self
            .store
            .tour_instances
            .find(&|instance| self.policy.should_auto_cancel(instance, now))?;

        for mut instance in due {
            let bookings = self.store.tour_bookings.find(&|booking| {
                booking.instance_id == instance.id && booking.status.holds_spots()
            })?;

            for mut booking in bookings {
                match booking.status {
                    BookingStatus::Confirmed => {
                        self.issue_refund(&booking, booking.total_amount).await?;
                        booking.status = BookingStatus::Refunded;
                        booking.refund_amount = Some(booking.total_amount);
                        report.refunded_bookings += 1;
                    }
                    _ => {
                        booking.status = BookingStatus::Cancelled;
                        report.cancelled_bookings += 1;
                    }
                }
                booking.updated_at = now;
                self.store.tour_bookings.update(booking)?;
            }

            self.policy.cancel(&mut instance);
            info!(instance_id = %instance.id, booked = instance.booked_spots, "under-booked departure cancelled");
            report.cancelled_instances.push(instance.id.clone());
            self.store.tour_instances.update(instance)?;
        }

        report.refreshed_instances = self.refresh_stored(now)?;
        Ok(report)
    }

    /// Persists status and pricing derived at `now` so stored documents follow the clock.
    fn refresh_stored(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        let mut changed = 0;
        for mut instance in self.store.tour_instances.list()? {
            let Some(tour) = self.store.tours.fetch(&instance.tour_id)? else {
                continue;
            };
            let before = (instance.status, instance.dynamic_pricing.clone());
            self.policy.refresh(&mut instance, tour.base_price, now);
            if before != (instance.status, instance.dynamic_pricing.clone()) {
                self.store.tour_instances.update(instance)?;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

enum Reservation {
    Existing(TourBooking),
    Created(TourBooking, Tour),
}

/// A retried request gets the stored checkout once its payment link exists.
fn existing_checkout(existing: TourBooking) -> Result<BookingCheckout, BookingError> {
    match existing.payment {
        Some(payment) => Ok(BookingCheckout {
            booking_id: existing.id,
            preference_id: payment.preference_id,
            init_point: payment.init_point,
            total_amount: existing.total_amount,
        }),
        None => Err(BookingError::DuplicateRequest),
    }
}

/// Error raised by the booking service.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid contact information: {0}")]
    InvalidContact(&'static str),
    #[error("a checkout with this idempotency key is still being created")]
    DuplicateRequest,
    #[error("cannot {action} a booking in status {}", status.label())]
    InvalidTransition {
        status: BookingStatus,
        action: &'static str,
    },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
