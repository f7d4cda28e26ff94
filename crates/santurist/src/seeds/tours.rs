use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{insert_missing, SeedError, SeedKind};
use crate::store::Store;
use crate::tours::{
    CancellationPolicy, Difficulty, InstanceStatus, InventoryPolicy, Tour, TourCategory,
    TourInstance,
};

const PROVIDER_ID: &str = "provider-atacama-mock";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TourSeed {
    pub tours: usize,
    pub instances: usize,
}

struct TourFixture {
    slug: &'static str,
    title: &'static str,
    description: &'static str,
    category: TourCategory,
    difficulty: Difficulty,
    base_price: u64,
    duration_minutes: u32,
    meeting_point: &'static str,
    cancellation_policy: CancellationPolicy,
    start: (u32, u32),
    instances: &'static [InstanceFixture],
}

/// Departure `days_ahead` of today with the given occupancy.
struct InstanceFixture {
    days_ahead: i64,
    capacity: u32,
    booked: u32,
    min_participants: u32,
    cancelled: bool,
}

const fn departure(days_ahead: i64, capacity: u32, booked: u32, min_participants: u32) -> InstanceFixture {
    InstanceFixture {
        days_ahead,
        capacity,
        booked,
        min_participants,
        cancelled: false,
    }
}

// Occupancies are chosen so the catalog shows every status, including an active discount.
const FIXTURES: [TourFixture; 5] = [
    TourFixture {
        slug: "valle-de-la-luna",
        title: "Valle de la Luna",
        description: "Atardecer entre dunas y formaciones de sal en la Cordillera de la Sal.",
        category: TourCategory::Valleys,
        difficulty: Difficulty::Easy,
        base_price: 35_000,
        duration_minutes: 240,
        meeting_point: "Plaza de Armas, San Pedro de Atacama",
        cancellation_policy: CancellationPolicy::Flexible,
        start: (16, 0),
        instances: &[departure(2, 12, 12, 4), departure(3, 12, 5, 4)],
    },
    TourFixture {
        slug: "geysers-del-tatio",
        title: "Geysers del Tatio",
        description: "Salida de madrugada al campo geotérmico más alto del mundo, con desayuno.",
        category: TourCategory::Geysers,
        difficulty: Difficulty::Moderate,
        base_price: 45_000,
        duration_minutes: 420,
        meeting_point: "Oficina Calle Toconao 421",
        cancellation_policy: CancellationPolicy::Moderate,
        start: (4, 30),
        instances: &[departure(1, 16, 14, 6), departure(4, 16, 8, 6)],
    },
    TourFixture {
        slug: "lagunas-altiplanicas",
        title: "Lagunas Altiplánicas",
        description: "Lagunas Miscanti y Miñiques a 4.200 metros, con almuerzo en Socaire.",
        category: TourCategory::Lagoons,
        difficulty: Difficulty::Moderate,
        base_price: 55_000,
        duration_minutes: 480,
        meeting_point: "Oficina Calle Toconao 421",
        cancellation_policy: CancellationPolicy::Moderate,
        start: (7, 0),
        instances: &[departure(2, 10, 2, 6), departure(9, 10, 6, 6)],
    },
    TourFixture {
        slug: "tour-astronomico",
        title: "Tour Astronómico",
        description: "Observación del cielo más limpio del planeta con telescopios profesionales.",
        category: TourCategory::Astronomy,
        difficulty: Difficulty::Easy,
        base_price: 30_000,
        duration_minutes: 150,
        meeting_point: "Observatorio Ahlarkapin",
        cancellation_policy: CancellationPolicy::Strict,
        start: (21, 0),
        instances: &[departure(1, 20, 3, 5), departure(6, 20, 10, 5)],
    },
    TourFixture {
        slug: "piedras-rojas",
        title: "Piedras Rojas",
        description: "Salar de Talar y las piedras rojas junto a la laguna turquesa.",
        category: TourCategory::Trekking,
        difficulty: Difficulty::Moderate,
        base_price: 60_000,
        duration_minutes: 600,
        meeting_point: "Oficina Calle Toconao 421",
        cancellation_policy: CancellationPolicy::Flexible,
        start: (6, 30),
        instances: &[
            departure(5, 8, 1, 4),
            InstanceFixture {
                days_ahead: 3,
                capacity: 8,
                booked: 1,
                min_participants: 4,
                cancelled: true,
            },
        ],
    },
];

/// Writes the mock tour catalog. Status and pricing are derived by `policy` at `now`.
pub fn seed_tours(
    store: &Store,
    policy: &InventoryPolicy,
    now: DateTime<Utc>,
) -> Result<TourSeed, SeedError> {
    let seed_id = SeedKind::Tours.seed_id();
    let today = now.date_naive();
    let mut written = TourSeed::default();

    for fixture in &FIXTURES {
        let tour_id = format!("tour-{}", fixture.slug);
        let tour = Tour {
            id: tour_id.clone(),
            provider_id: PROVIDER_ID.to_string(),
            title: fixture.title.to_string(),
            description: fixture.description.to_string(),
            category: fixture.category,
            difficulty: fixture.difficulty,
            base_price: fixture.base_price,
            duration_minutes: fixture.duration_minutes,
            meeting_point: fixture.meeting_point.to_string(),
            cancellation_policy: fixture.cancellation_policy,
            seed_id: Some(seed_id.to_string()),
        };
        if insert_missing(store.tours.as_ref(), tour)? {
            written.tours += 1;
        }

        let (hour, minute) = fixture.start;
        let start_time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        let end_time = start_time + Duration::minutes(i64::from(fixture.duration_minutes));

        for (index, slot) in fixture.instances.iter().enumerate() {
            let mut instance = TourInstance {
                id: format!("instance-{}-{}", fixture.slug, index + 1),
                tour_id: tour_id.clone(),
                date: today + Duration::days(slot.days_ahead),
                start_time,
                end_time,
                capacity: slot.capacity,
                booked_spots: slot.booked,
                min_participants: slot.min_participants,
                status: if slot.cancelled {
                    InstanceStatus::Cancelled
                } else {
                    InstanceStatus::Confirmed
                },
                dynamic_pricing: None,
                seed_id: Some(seed_id.to_string()),
            };
            policy.refresh(&mut instance, fixture.base_price, now);

            if insert_missing(store.tour_instances.as_ref(), instance)? {
                written.instances += 1;
            }
        }
    }

    info!(tours = written.tours, instances = written.instances, "tour seed applied");
    Ok(written)
}
