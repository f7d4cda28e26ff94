use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payments::PaymentLink;
use crate::store::Document;

/// Contact details captured on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ContactInfo {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("name is required");
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((user, domain)) if !user.is_empty() && domain.contains('.') => {}
            _ => return Err("email must be a valid address"),
        }
        if self.phone.chars().filter(char::is_ascii_digit).count() < 8 {
            return Err("phone must contain at least 8 digits");
        }
        Ok(())
    }
}

/// Booking request assembled by the client before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub instance_id: String,
    pub number_of_people: u32,
    /// Client-generated key making retries of the same checkout return the same booking.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    PaymentFailed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::PaymentFailed => "payment_failed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }

    /// Whether the booking still occupies spots on its instance.
    pub const fn holds_spots(self) -> bool {
        matches!(self, BookingStatus::PendingPayment | BookingStatus::Confirmed)
    }
}

/// A customer's reservation against one tour instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourBooking {
    pub id: String,
    pub tour_id: String,
    pub instance_id: String,
    pub number_of_people: u32,
    pub price_per_person: u64,
    pub total_amount: u64,
    pub contact_info: ContactInfo,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for TourBooking {
    const COLLECTION: &'static str = "tourBookings";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Returned to the client so it can persist the booking id and redirect to the checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingCheckout {
    pub booking_id: String,
    pub preference_id: String,
    pub init_point: String,
    pub total_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancellationOutcome {
    pub booking: TourBooking,
    pub refund_percent: u64,
    pub refund_amount: u64,
}

/// Result of the under-booking sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub cancelled_instances: Vec<String>,
    pub refunded_bookings: usize,
    pub cancelled_bookings: usize,
    /// Remaining instances whose stored status or pricing changed with the clock.
    pub refreshed_instances: usize,
}
