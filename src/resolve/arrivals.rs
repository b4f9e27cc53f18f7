use chrono::{DateTime, Utc};
use tracing::debug;

use super::{UNKNOWN, trip_index_or_empty};
use crate::error::ResolveError;
use crate::feed::FeedSource;
use crate::gtfs_rt::FeedMessage;
use crate::reference::{ReferenceLoader, TripIndex, TripReference};

pub const MAX_ARRIVALS: usize = 5;

/// A predicted arrival of one trip at the queried stop.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalRecord {
    pub trip_id: Option<String>,
    /// The joined trip, if the trip table knows it.
    pub trip: Option<TripReference>,
    pub arrival_time: DateTime<Utc>,
    /// Whole minutes from the time of resolution. Never negative.
    pub arrival_in: i64,
}

impl ArrivalRecord {
    pub fn route_id(&self) -> &str {
        self.trip.as_ref().map_or(UNKNOWN, |t| t.route_id.as_str())
    }

    pub fn headsign(&self) -> &str {
        self.trip
            .as_ref()
            .map(|t| t.trip_headsign.as_str())
            .filter(|h| !h.is_empty())
            .unwrap_or(UNKNOWN)
    }
}

/// Rounds the gap between `now` and `at` to whole minutes, halves rounding up.
pub fn minutes_until(now: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    let minutes = (at - now).num_milliseconds() as f64 / 60_000.0;
    (minutes + 0.5).floor() as i64
}

/// Collects upcoming arrivals at `stop_code` from a decoded trip-update feed.
///
/// Scanning stops once `limit` arrivals are found, so with a busy stop the
/// entity order decides which ones are kept. The result is sorted by
/// `arrival_in`.
pub fn arrivals_at(
    feed: &FeedMessage,
    trips: &TripIndex,
    stop_code: &str,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ArrivalRecord> {
    let mut arrivals: Vec<ArrivalRecord> = feed
        .entity
        .iter()
        .filter_map(|e| e.trip_update.as_ref())
        .flat_map(|tu| tu.stop_time_update.iter().map(move |stu| (tu, stu)))
        .filter(|(_, stu)| stu.stop_id.as_deref() == Some(stop_code))
        .filter_map(|(tu, stu)| {
            let arrival_time = DateTime::from_timestamp(stu.arrival.as_ref()?.time?, 0)?;
            let arrival_in = minutes_until(now, arrival_time);
            if arrival_in < 0 {
                return None;
            }

            let trip_id = tu.trip.trip_id.clone();
            let trip = trip_id.as_deref().and_then(|id| trips.get(id)).cloned();
            Some(ArrivalRecord {
                trip_id,
                trip,
                arrival_time,
                arrival_in,
            })
        })
        .take(limit)
        .collect();

    arrivals.sort_by_key(|a| a.arrival_in);
    arrivals
}

/// Resolves the next arrivals at `stop_code` from the live trip-update feed.
///
/// Loader and feed failures are returned to the caller; a stop without any
/// matching update yields an empty list.
#[tracing::instrument(skip(loader, feed))]
pub async fn resolve_arrivals<F: FeedSource + ?Sized>(
    loader: &ReferenceLoader,
    feed: &F,
    stop_code: &str,
) -> Result<Vec<ArrivalRecord>, ResolveError> {
    let (trips, message) = tokio::try_join!(
        async { trip_index_or_empty(loader).await.map_err(ResolveError::from) },
        async { feed.trip_updates().await.map_err(ResolveError::from) },
    )?;

    let arrivals = arrivals_at(&message, &trips, stop_code, Utc::now(), MAX_ARRIVALS);
    if arrivals.is_empty() {
        debug!(stop_code, "No upcoming arrivals found");
    }
    Ok(arrivals)
}
