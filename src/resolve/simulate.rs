use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::ArrivalRecord;
use crate::reference::TripReference;

const ROUTES: &[&str] = &["1", "2", "3", "8", "12", "20", "25", "28"];
const DESTINATIONS: &[&str] = &[
    "City Center",
    "Hervanta",
    "Tammela",
    "Kaleva",
    "Lentävänniemi",
    "TAYS",
];

/// Plausible arrivals for when no live data can be used.
pub fn simulate_arrivals(now: DateTime<Utc>) -> Vec<ArrivalRecord> {
    simulate_arrivals_with(&mut rand::rng(), now)
}

/// Between one and five arrivals within the next ~80 minutes, sorted by `arrival_in`.
pub fn simulate_arrivals_with<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<ArrivalRecord> {
    let count = rng.random_range(1..=5);

    let mut arrivals: Vec<ArrivalRecord> = (0..count)
        .map(|i| {
            let arrival_in = rng.random_range(0..60) + i * 5;
            let route = ROUTES[rng.random_range(0..ROUTES.len())];
            let destination = DESTINATIONS[rng.random_range(0..DESTINATIONS.len())];

            let trip_id = format!("simulated-{i}");
            ArrivalRecord {
                trip_id: Some(trip_id.clone()),
                trip: Some(TripReference {
                    trip_id,
                    route_id: route.to_string(),
                    trip_headsign: destination.to_string(),
                }),
                arrival_time: now + Duration::minutes(arrival_in),
                arrival_in,
            }
        })
        .collect();

    arrivals.sort_by_key(|a| a.arrival_in);
    arrivals
}
