use serde::Serialize;
use tracing::debug;

use super::trip_index_or_empty;
use crate::error::ResolveError;
use crate::feed::FeedSource;
use crate::gtfs_rt::FeedMessage;
use crate::reference::{ReferenceLoader, TripIndex};

pub const MAX_POSITIONS: usize = 5;

const MS_TO_KMH: f64 = 3.6;

/// Where one vehicle is right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionRecord {
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub license_plate: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub bearing_degrees: f64,
    pub speed_kmh: f64,
}

/// Vehicles whose id, route or licence plate equals `search`.
///
/// Only vehicles reporting a position are considered. The route is taken from
/// the trip table when the trip is known there, otherwise from the feed's own
/// trip descriptor. At most `limit` records are returned, in feed order.
pub fn positions_matching(
    feed: &FeedMessage,
    trips: &TripIndex,
    search: &str,
    limit: usize,
) -> Vec<PositionRecord> {
    let search = search.trim();
    let is_match = |value: Option<&str>| value == Some(search);

    feed.entity
        .iter()
        .filter_map(|e| e.vehicle.as_ref())
        .filter_map(|vp| {
            let position = vp.position.as_ref()?;
            let trip_id = vp.trip.as_ref().and_then(|t| t.trip_id.clone());
            let route_id = trip_id
                .as_deref()
                .and_then(|id| trips.get(id))
                .map(|t| t.route_id.clone())
                .or_else(|| vp.trip.as_ref().and_then(|t| t.route_id.clone()));
            let vehicle_id = vp.vehicle.as_ref().and_then(|v| v.id.clone());
            let license_plate = vp.vehicle.as_ref().and_then(|v| v.license_plate.clone());

            let matched = is_match(vehicle_id.as_deref())
                || is_match(route_id.as_deref())
                || is_match(license_plate.as_deref());
            if !matched {
                return None;
            }

            Some(PositionRecord {
                route_id,
                trip_id,
                vehicle_id,
                license_plate,
                latitude: f64::from(position.latitude),
                longitude: f64::from(position.longitude),
                bearing_degrees: position.bearing.map(f64::from).unwrap_or_default(),
                speed_kmh: position.speed.map_or(0.0, |s| f64::from(s) * MS_TO_KMH),
            })
        })
        .take(limit)
        .collect()
}

/// Resolves vehicles matching `search` from the live vehicle-position feed.
#[tracing::instrument(skip(loader, feed))]
pub async fn resolve_positions<F: FeedSource + ?Sized>(
    loader: &ReferenceLoader,
    feed: &F,
    search: &str,
) -> Result<Vec<PositionRecord>, ResolveError> {
    let (trips, message) = tokio::try_join!(
        async { trip_index_or_empty(loader).await.map_err(ResolveError::from) },
        async { feed.vehicle_positions().await.map_err(ResolveError::from) },
    )?;

    let positions = positions_matching(&message, &trips, search, MAX_POSITIONS);
    debug!(matched = positions.len(), "Vehicle positions resolved");
    Ok(positions)
}
