//! Payment preference and refund boundary (Mercado Pago checkout links).

mod mercadopago;
pub mod router;
mod sandbox;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use mercadopago::MercadoPagoGateway;
pub use router::{payment_error_response, payment_router, PaymentRoutesState};
pub use sandbox::SandboxGateway;

pub const CURRENCY: &str = "CLP";

/// Line shown on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceItem {
    pub title: String,
    pub quantity: u32,
    pub unit_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceRequest {
    pub external_reference: PaymentReference,
    pub items: Vec<PreferenceItem>,
    pub payer_email: String,
}

/// Hosted checkout link the client redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub preference_id: String,
    pub init_point: String,
}

/// The provider's own record of a payment. Webhook claims are checked against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub external_reference: PaymentReference,
    pub status: PaymentStatus,
}

/// Outbound payment provider hooks.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<PaymentLink, PaymentError>;

    async fn refund(&self, payment_id: &str, amount: u64) -> Result<(), PaymentError>;

    /// Looks a payment up at the provider; unknown ids are `UnknownPayment`.
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("payment provider unreachable: {0}")]
    Transport(String),
    #[error("payment provider returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("payment {0} is unknown to the provider")]
    UnknownPayment(String),
}

/// Links a payment back to the booking or order that requested it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentReference {
    TourBooking(String),
    Order(String),
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentReference::TourBooking(id) => write!(f, "booking:{id}"),
            PaymentReference::Order(id) => write!(f, "order:{id}"),
        }
    }
}

impl FromStr for PaymentReference {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().split_once(':') {
            Some(("booking", id)) if !id.is_empty() => Ok(Self::TourBooking(id.to_string())),
            Some(("order", id)) if !id.is_empty() => Ok(Self::Order(id.to_string())),
            _ => Err(PaymentError::InvalidResponse(format!(
                "unknown external reference '{value}'"
            ))),
        }
    }
}

impl Serialize for PaymentReference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PaymentReference {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Payment states reported by the provider's notification callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Pending,
    InProcess,
    Rejected,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// Maps the provider's payment status vocabulary, folding intermediate states.
    pub fn from_provider(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(Self::Approved),
            "pending" => Some(Self::Pending),
            "authorized" | "in_process" | "in_mediation" => Some(Self::InProcess),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            "refunded" | "charged_back" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// Body of the payment notification webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub external_reference: PaymentReference,
    pub status: PaymentStatus,
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_round_trip_through_strings() {
        let reference: PaymentReference = "booking:abc".parse().expect("parses");
        assert_eq!(reference, PaymentReference::TourBooking("abc".to_string()));
        assert_eq!(PaymentReference::Order("o-1".to_string()).to_string(), "order:o-1");
        assert!("invoice:1".parse::<PaymentReference>().is_err());
        assert!("booking:".parse::<PaymentReference>().is_err());
    }

    #[test]
    fn notification_deserializes_provider_payload() {
        let notification: PaymentNotification = serde_json::from_str(
            r#"{"external_reference":"order:o-9","status":"approved","payment_id":"123"}"#,
        )
        .expect("valid payload");
        assert_eq!(notification.status, PaymentStatus::Approved);
        assert_eq!(notification.payment_id.as_deref(), Some("123"));
    }

    #[test]
    fn provider_statuses_fold_into_known_states() {
        assert_eq!(PaymentStatus::from_provider("approved"), Some(PaymentStatus::Approved));
        assert_eq!(PaymentStatus::from_provider("in_mediation"), Some(PaymentStatus::InProcess));
        assert_eq!(PaymentStatus::from_provider("charged_back"), Some(PaymentStatus::Refunded));
        assert_eq!(PaymentStatus::from_provider("mystery"), None);
    }
}
