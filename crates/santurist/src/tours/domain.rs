use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

/// Static catalog entry authored by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub id: String,
    pub provider_id: String,
    pub title: String,
    pub description: String,
    pub category: TourCategory,
    pub difficulty: Difficulty,
    /// Price per person in CLP.
    pub base_price: u64,
    pub duration_minutes: u32,
    pub meeting_point: String,
    pub cancellation_policy: CancellationPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_id: Option<String>,
}

impl Document for Tour {
    const COLLECTION: &'static str = "tours";

    fn id(&self) -> &str {
        &self.id
    }

    fn seed_id(&self) -> Option<&str> {
        self.seed_id.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourCategory {
    Astronomy,
    Geysers,
    Lagoons,
    Valleys,
    Trekking,
    Cultural,
    Adventure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

/// Refund rules applied when a paid booking is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    Flexible,
    Moderate,
    Strict,
}

impl CancellationPolicy {
    /// Percentage of the paid amount returned when cancelling `hours_before` departure.
    pub const fn refund_percent(self, hours_before: i64) -> u64 {
        match self {
            CancellationPolicy::Flexible => {
                if hours_before >= 24 {
                    100
                } else {
                    50
                }
            }
            CancellationPolicy::Moderate => {
                if hours_before >= 72 {
                    100
                } else if hours_before >= 24 {
                    50
                } else {
                    0
                }
            }
            CancellationPolicy::Strict => {
                if hours_before >= 7 * 24 {
                    100
                } else {
                    0
                }
            }
        }
    }
}

/// A scheduled occurrence of a [`Tour`]. Times are stored in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourInstance {
    pub id: String,
    pub tour_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: u32,
    pub booked_spots: u32,
    pub min_participants: u32,
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_pricing: Option<DynamicPricing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_id: Option<String>,
}

impl TourInstance {
    pub fn available_spots(&self) -> u32 {
        self.capacity.saturating_sub(self.booked_spots)
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.date.and_time(self.start_time))
    }

    pub fn hours_until_departure(&self, now: DateTime<Utc>) -> i64 {
        (self.starts_at() - now).num_hours()
    }

    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        now >= self.starts_at()
    }

    /// Price charged per person right now, honoring an active discount.
    pub fn price_per_person(&self, base_price: u64) -> u64 {
        match &self.dynamic_pricing {
            Some(pricing) if pricing.is_active => pricing.discounted_price(),
            _ => base_price,
        }
    }
}

impl Document for TourInstance {
    const COLLECTION: &'static str = "tourInstances";

    fn id(&self) -> &str {
        &self.id
    }

    fn seed_id(&self) -> Option<&str> {
        self.seed_id.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Confirmed,
    AlmostFull,
    AtRisk,
    Full,
    Cancelled,
}

impl InstanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InstanceStatus::Confirmed => "Salida confirmada",
            InstanceStatus::AlmostFull => "¡Últimos cupos!",
            InstanceStatus::AtRisk => "Faltan participantes",
            InstanceStatus::Full => "Agotado",
            InstanceStatus::Cancelled => "Salida cancelada",
        }
    }

    pub const fn accepts_bookings(self) -> bool {
        !matches!(self, InstanceStatus::Full | InstanceStatus::Cancelled)
    }
}

/// Discount state attached to an under-booked instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicPricing {
    pub is_active: bool,
    pub discount_percentage: u8,
    #[serde(default)]
    pub bonus_incentives: Vec<String>,
    pub original_price: u64,
}

impl DynamicPricing {
    /// Floors the discounted price, which keeps it strictly below any positive original.
    pub fn discounted_price(&self) -> u64 {
        let keep = 100u64.saturating_sub(u64::from(self.discount_percentage));
        self.original_price * keep / 100
    }
}
