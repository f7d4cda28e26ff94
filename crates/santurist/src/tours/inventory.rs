use chrono::{DateTime, Duration, Utc};

use super::domain::{DynamicPricing, InstanceStatus, TourInstance};

/// Thresholds deriving instance status, discounts, and auto-cancellation from bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryPolicy {
    /// Occupancy (percent of capacity) at which an instance reads as almost full.
    pub almost_full_percent: u32,
    /// Discounts only apply this close to departure.
    pub pricing_window_hours: i64,
    /// Under-booked instances are cancelled this long before departure.
    pub cancel_cutoff_hours: i64,
    pub base_discount_percent: u8,
    pub discount_step_percent: u8,
    pub max_discount_percent: u8,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            almost_full_percent: 80,
            pricing_window_hours: 72,
            cancel_cutoff_hours: 24,
            base_discount_percent: 10,
            discount_step_percent: 5,
            max_discount_percent: 30,
        }
    }
}

const CAPPED_DISCOUNT_BONUSES: [&str; 2] = [
    "Snack andino de cortesía",
    "Fotografías del tour incluidas",
];

impl InventoryPolicy {
    /// Status precedence: cancelled, full, at risk, almost full, confirmed.
    pub fn derive_status(&self, instance: &TourInstance) -> InstanceStatus {
        if instance.status == InstanceStatus::Cancelled {
            return InstanceStatus::Cancelled;
        }

        let booked = u64::from(instance.booked_spots);
        let capacity = u64::from(instance.capacity);

        if instance.available_spots() == 0 {
            InstanceStatus::Full
        } else if instance.booked_spots < instance.min_participants {
            InstanceStatus::AtRisk
        } else if booked * 100 >= capacity * u64::from(self.almost_full_percent) {
            InstanceStatus::AlmostFull
        } else {
            InstanceStatus::Confirmed
        }
    }

    /// Discount for an at-risk instance inside the pricing window, if any.
    pub fn dynamic_pricing(
        &self,
        instance: &TourInstance,
        status: InstanceStatus,
        base_price: u64,
        now: DateTime<Utc>,
    ) -> Option<DynamicPricing> {
        if status != InstanceStatus::AtRisk || base_price == 0 {
            return None;
        }

        let hours = instance.hours_until_departure(now);
        if hours < 0 || hours > self.pricing_window_hours {
            return None;
        }

        let missing = instance
            .min_participants
            .saturating_sub(instance.booked_spots);
        let step = u32::from(self.discount_step_percent).saturating_mul(missing);
        let discount = (u32::from(self.base_discount_percent) + step)
            .min(u32::from(self.max_discount_percent)) as u8;

        let bonus_incentives = if discount >= self.max_discount_percent {
            CAPPED_DISCOUNT_BONUSES
                .iter()
                .map(|bonus| bonus.to_string())
                .collect()
        } else {
            Vec::new()
        };

        Some(DynamicPricing {
            is_active: true,
            discount_percentage: discount,
            bonus_incentives,
            original_price: base_price,
        })
    }

    /// Recomputes status and pricing from the current booked count.
    pub fn refresh(&self, instance: &mut TourInstance, base_price: u64, now: DateTime<Utc>) {
        let status = self.derive_status(instance);
        instance.status = status;
        instance.dynamic_pricing = self.dynamic_pricing(instance, status, base_price, now);
    }

    pub fn check_bookable(
        &self,
        instance: &TourInstance,
        spots: u32,
        now: DateTime<Utc>,
    ) -> Result<(), InventoryError> {
        if instance.has_departed(now) {
            return Err(InventoryError::Departed);
        }

        let available = instance.available_spots();
        if !instance.status.accepts_bookings() || available == 0 {
            return Err(InventoryError::NotBookable {
                status: instance.status,
            });
        }

        if spots == 0 {
            return Err(InventoryError::InvalidPartySize);
        }

        if spots > available {
            return Err(InventoryError::InsufficientSpots {
                requested: spots,
                available,
            });
        }

        Ok(())
    }

    pub fn reserve(
        &self,
        instance: &mut TourInstance,
        spots: u32,
        base_price: u64,
        now: DateTime<Utc>,
    ) -> Result<(), InventoryError> {
        self.check_bookable(instance, spots, now)?;
        instance.booked_spots += spots;
        self.refresh(instance, base_price, now);
        Ok(())
    }

    pub fn release(
        &self,
        instance: &mut TourInstance,
        spots: u32,
        base_price: u64,
        now: DateTime<Utc>,
    ) {
        instance.booked_spots = instance.booked_spots.saturating_sub(spots);
        self.refresh(instance, base_price, now);
    }

    /// True once an under-booked instance passes the cancellation cutoff.
    pub fn should_auto_cancel(&self, instance: &TourInstance, now: DateTime<Utc>) -> bool {
        instance.status != InstanceStatus::Cancelled
            && instance.booked_spots < instance.min_participants
            && now >= instance.starts_at() - Duration::hours(self.cancel_cutoff_hours)
    }

    pub fn cancel(&self, instance: &mut TourInstance) {
        instance.status = InstanceStatus::Cancelled;
        instance.dynamic_pricing = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("instance is not accepting bookings ({})", status.label())]
    NotBookable { status: InstanceStatus },
    #[error("requested {requested} spots but only {available} remain")]
    InsufficientSpots { requested: u32, available: u32 },
    #[error("a booking needs at least one participant")]
    InvalidPartySize,
    #[error("the tour has already departed")]
    Departed,
}
