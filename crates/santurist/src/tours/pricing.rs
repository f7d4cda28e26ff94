use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use super::domain::{InstanceStatus, Tour, TourInstance};

/// Price quote for a party on one instance, clamped to the remaining spots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub instance_id: String,
    pub requested_people: u32,
    pub number_of_people: u32,
    pub price_per_person: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,
    pub total_amount: u64,
    pub available_spots: u32,
    pub bookable: bool,
}

pub fn quote(tour: &Tour, instance: &TourInstance, requested: u32, now: DateTime<Utc>) -> Quote {
    let available_spots = instance.available_spots();
    let bookable = is_bookable(instance, now);
    let number_of_people = if bookable {
        requested.clamp(1, available_spots)
    } else {
        0
    };
    let price_per_person = instance.price_per_person(tour.base_price);

    Quote {
        instance_id: instance.id.clone(),
        requested_people: requested,
        number_of_people,
        price_per_person,
        original_price: active_original_price(instance),
        total_amount: price_per_person * u64::from(number_of_people),
        available_spots,
        bookable,
    }
}

fn is_bookable(instance: &TourInstance, now: DateTime<Utc>) -> bool {
    instance.status.accepts_bookings()
        && instance.available_spots() > 0
        && !instance.has_departed(now)
}

fn active_original_price(instance: &TourInstance) -> Option<u64> {
    instance
        .dynamic_pricing
        .as_ref()
        .filter(|pricing| pricing.is_active)
        .map(|pricing| pricing.original_price)
}

/// Rendering contract for an instance card: badge, prices, and urgency copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TourInstanceView {
    pub id: String,
    pub tour_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: u32,
    pub booked_spots: u32,
    pub available_spots: u32,
    pub min_participants: u32,
    pub status: InstanceStatus,
    pub status_label: &'static str,
    pub bookable: bool,
    pub price_per_person: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bonus_incentives: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    pub hours_until_departure: i64,
}

impl TourInstanceView {
    pub fn new(tour: &Tour, instance: &TourInstance, now: DateTime<Utc>) -> Self {
        let active = instance
            .dynamic_pricing
            .as_ref()
            .filter(|pricing| pricing.is_active);

        Self {
            id: instance.id.clone(),
            tour_id: instance.tour_id.clone(),
            date: instance.date,
            start_time: instance.start_time,
            end_time: instance.end_time,
            capacity: instance.capacity,
            booked_spots: instance.booked_spots,
            available_spots: instance.available_spots(),
            min_participants: instance.min_participants,
            status: instance.status,
            status_label: instance.status.label(),
            bookable: is_bookable(instance, now),
            price_per_person: instance.price_per_person(tour.base_price),
            original_price: active.map(|pricing| pricing.original_price),
            discount_percentage: active.map(|pricing| pricing.discount_percentage),
            bonus_incentives: active
                .map(|pricing| pricing.bonus_incentives.clone())
                .unwrap_or_default(),
            urgency: urgency_copy(instance, now),
            hours_until_departure: instance.hours_until_departure(now),
        }
    }
}

fn urgency_copy(instance: &TourInstance, now: DateTime<Utc>) -> Option<String> {
    if instance.has_departed(now) {
        return None;
    }

    match instance.status {
        InstanceStatus::AlmostFull => Some(format!(
            "Quedan solo {} cupos",
            instance.available_spots()
        )),
        InstanceStatus::AtRisk => {
            let missing = instance
                .min_participants
                .saturating_sub(instance.booked_spots);
            Some(format!(
                "Faltan {missing} personas para confirmar la salida"
            ))
        }
        InstanceStatus::Confirmed if instance.hours_until_departure(now) < 24 => Some(format!(
            "Sale en {} horas",
            instance.hours_until_departure(now)
        )),
        _ => None,
    }
}
