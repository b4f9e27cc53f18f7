//! The query surface used by the CLI and the tool dispatcher.
//!
//! [`TransitService`] owns the stop directory, the trip loader and (in live
//! mode) a feed source. It validates queries locally before any network call
//! and decides what to return when a resolution fails: simulated arrivals for
//! arrival lookups, an empty list for vehicle lookups.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SimulationReason;
use crate::error::QueryError;
use crate::feed::FeedSource;
use crate::reference::{ReferenceLoader, StopDirectory, StopReference};
use crate::resolve::{
    ArrivalRecord, PositionRecord, resolve_arrivals, resolve_positions, simulate_arrivals,
};

/// More matching stops than this is treated as an ambiguous query.
pub const MAX_STOP_MATCHES: usize = 5;

const AMBIGUOUS_SAMPLE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalSource {
    Live,
    Simulated,
}

/// Upcoming arrivals at one stop.
#[derive(Debug, Clone)]
pub struct StopArrivals {
    pub stop: StopReference,
    pub arrivals: Vec<ArrivalRecord>,
    pub source: ArrivalSource,
}

enum Mode {
    Live(Box<dyn FeedSource>),
    Simulated(SimulationReason),
}

pub struct TransitService {
    stops: StopDirectory,
    loader: ReferenceLoader,
    mode: Mode,
}

impl TransitService {
    /// Service backed by a live feed.
    pub fn live(stops: StopDirectory, loader: ReferenceLoader, feed: Box<dyn FeedSource>) -> Self {
        Self {
            stops,
            loader,
            mode: Mode::Live(feed),
        }
    }

    /// Service that never touches the network.
    pub fn simulated(stops: StopDirectory, loader: ReferenceLoader, reason: SimulationReason) -> Self {
        Self {
            stops,
            loader,
            mode: Mode::Simulated(reason),
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.mode, Mode::Simulated(_))
    }

    /// Next arrivals at every stop matching `query` by exact code or by name.
    #[tracing::instrument(skip(self))]
    pub async fn find_next_bus(&self, query: &str) -> Result<Vec<StopArrivals>, QueryError> {
        let stops = self.match_stops(query)?;

        let mut results = Vec::with_capacity(stops.len());
        for stop in stops {
            let (arrivals, source) = self.arrivals_for(&stop.stop_code).await;
            results.push(StopArrivals {
                stop: stop.clone(),
                arrivals,
                source,
            });
        }
        Ok(results)
    }

    /// Vehicles matching `search` by vehicle id, route or licence plate.
    ///
    /// Feed problems produce an empty list; vehicle positions are never simulated.
    #[tracing::instrument(skip(self))]
    pub async fn get_bus_information(&self, search: &str) -> Result<Vec<PositionRecord>, QueryError> {
        let search = search.trim();
        if search.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let feed = match &self.mode {
            Mode::Live(feed) => feed.as_ref(),
            Mode::Simulated(reason) => {
                info!(%reason, "No live feed; vehicle lookup returns nothing");
                return Ok(Vec::new());
            }
        };

        match resolve_positions(&self.loader, feed, search).await {
            Ok(positions) => {
                info!(source = "live", count = positions.len(), "Vehicle positions resolved");
                Ok(positions)
            }
            Err(e) => {
                warn!(error = %e, "Vehicle lookup failed; returning no vehicles");
                Ok(Vec::new())
            }
        }
    }

    /// Stops whose name contains `query`, ignoring case.
    pub fn search_stops(&self, query: &str) -> Result<Vec<StopReference>, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let found: Vec<StopReference> = self.stops.search(query).into_iter().cloned().collect();
        if found.is_empty() {
            return Err(QueryError::NoStopsFound {
                query: query.to_string(),
            });
        }
        Ok(found)
    }

    fn match_stops(&self, query: &str) -> Result<Vec<&StopReference>, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let by_code = self.stops.by_code(query);
        let matches = if by_code.is_empty() {
            self.stops.search(query)
        } else {
            by_code
        };

        match matches.len() {
            0 => Err(QueryError::NoStopsFound {
                query: query.to_string(),
            }),
            count if count > MAX_STOP_MATCHES => Err(QueryError::TooManyStops {
                query: query.to_string(),
                count,
                sample: matches
                    .iter()
                    .take(AMBIGUOUS_SAMPLE)
                    .map(|s| s.stop_name.clone())
                    .collect(),
            }),
            _ => Ok(matches),
        }
    }

    async fn arrivals_for(&self, stop_code: &str) -> (Vec<ArrivalRecord>, ArrivalSource) {
        let feed = match &self.mode {
            Mode::Live(feed) => feed.as_ref(),
            Mode::Simulated(reason) => {
                info!(stop_code, source = "simulated", %reason, "Using simulated arrivals");
                return (simulate_arrivals(Utc::now()), ArrivalSource::Simulated);
            }
        };

        match resolve_arrivals(&self.loader, feed, stop_code).await {
            Ok(arrivals) => {
                info!(stop_code, source = "live", count = arrivals.len(), "Arrivals resolved");
                (arrivals, ArrivalSource::Live)
            }
            Err(e) => {
                warn!(stop_code, error = %e, "Arrival lookup failed");
                info!(stop_code, source = "simulated", "Falling back to simulated arrivals");
                (simulate_arrivals(Utc::now()), ArrivalSource::Simulated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::error::FeedError;
    use crate::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
    use crate::gtfs_rt::{
        FeedEntity, FeedHeader, FeedMessage, Position, TripDescriptor, TripUpdate,
        VehicleDescriptor, VehiclePosition,
    };

    /// Serves a fixed message, or fails with a 503, and counts calls.
    struct CannedFeed {
        message: Option<FeedMessage>,
        calls: AtomicUsize,
    }

    impl CannedFeed {
        fn ok(message: FeedMessage) -> Self {
            Self {
                message: Some(message),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                message: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn respond(&self) -> Result<FeedMessage, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.message
                .clone()
                .ok_or_else(|| FeedError::UpstreamUnavailable {
                    status: 503,
                    url: "https://feed.test".to_string(),
                })
        }
    }

    #[async_trait]
    impl FeedSource for CannedFeed {
        async fn trip_updates(&self) -> Result<FeedMessage, FeedError> {
            self.respond()
        }

        async fn vehicle_positions(&self) -> Result<FeedMessage, FeedError> {
            self.respond()
        }
    }

    fn stop(code: &str, name: &str) -> StopReference {
        StopReference {
            stop_code: code.to_string(),
            stop_name: name.to_string(),
            latitude: 61.49,
            longitude: 23.76,
            zone: Some("A".to_string()),
        }
    }

    fn directory() -> StopDirectory {
        let mut stops: Vec<StopReference> = (1..=6)
            .map(|i| stop(&format!("000{i}"), &format!("Keskustori {i}")))
            .collect();
        stops.push(stop("1234", "Hervannan kampus"));
        StopDirectory::new(stops)
    }

    fn trips_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"trip_id,route_id,trip_headsign\nt1,3,Hervanta\n")
            .unwrap();
        file
    }

    fn header() -> FeedHeader {
        FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            ..Default::default()
        }
    }

    fn trip_update_feed() -> FeedMessage {
        let at = Utc::now() + Duration::minutes(5);
        FeedMessage {
            header: header(),
            entity: vec![FeedEntity {
                id: "1".into(),
                trip_update: Some(TripUpdate {
                    trip: TripDescriptor {
                        trip_id: Some("t1".into()),
                        ..Default::default()
                    },
                    stop_time_update: vec![StopTimeUpdate {
                        stop_id: Some("1234".into()),
                        arrival: Some(StopTimeEvent {
                            time: Some(at.timestamp()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            }],
        }
    }

    fn service(feed: std::sync::Arc<CannedFeed>, trips: &tempfile::NamedTempFile) -> TransitService {
        TransitService::live(
            directory(),
            ReferenceLoader::new("/unused/stops.txt", trips.path()),
            Box::new(feed),
        )
    }

    #[tokio::test]
    async fn test_ambiguous_name_makes_no_network_call() {
        let feed = std::sync::Arc::new(CannedFeed::ok(trip_update_feed()));
        let trips = trips_file();
        let svc = service(feed.clone(), &trips);

        let err = svc.find_next_bus("keskus").await.unwrap_err();

        match err {
            QueryError::TooManyStops { count, sample, .. } => {
                assert_eq!(count, 6);
                assert_eq!(sample.len(), 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_stop_makes_no_network_call() {
        let feed = std::sync::Arc::new(CannedFeed::ok(trip_update_feed()));
        let trips = trips_file();
        let svc = service(feed.clone(), &trips);

        let err = svc.find_next_bus("Lielahti").await.unwrap_err();

        assert!(matches!(err, QueryError::NoStopsFound { .. }));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_find_next_bus_by_code_uses_live_feed() {
        let feed = std::sync::Arc::new(CannedFeed::ok(trip_update_feed()));
        let trips = trips_file();
        let svc = service(feed.clone(), &trips);

        let results = svc.find_next_bus("1234").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].stop.stop_name, "Hervannan kampus");
        assert_eq!(results[0].source, ArrivalSource::Live);
        assert_eq!(results[0].arrivals.len(), 1);
        assert!((4..=5).contains(&results[0].arrivals[0].arrival_in));
        assert_eq!(results[0].arrivals[0].route_id(), "3");
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_feed_failure_falls_back_to_simulated_arrivals() {
        let feed = std::sync::Arc::new(CannedFeed::failing());
        let trips = trips_file();
        let svc = service(feed, &trips);

        let results = svc.find_next_bus("Hervannan").await.unwrap();

        assert_eq!(results[0].source, ArrivalSource::Simulated);
        assert!(!results[0].arrivals.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_trip_table_keeps_live_arrivals() {
        let feed = std::sync::Arc::new(CannedFeed::ok(trip_update_feed()));
        let mut trips = tempfile::NamedTempFile::new().unwrap();
        trips.write_all(b"trip_id,route_id,trip_headsign\nt1\n").unwrap();
        let svc = service(feed, &trips);

        let results = svc.find_next_bus("1234").await.unwrap();

        assert_eq!(results[0].source, ArrivalSource::Live);
        assert_eq!(results[0].arrivals.len(), 1);
        assert_eq!(results[0].arrivals[0].trip_id.as_deref(), Some("t1"));
        assert_eq!(results[0].arrivals[0].route_id(), "Unknown");
        assert_eq!(results[0].arrivals[0].headsign(), "Unknown");
    }

    #[tokio::test]
    async fn test_missing_trip_table_falls_back_to_simulated_arrivals() {
        let feed = std::sync::Arc::new(CannedFeed::ok(trip_update_feed()));
        let dir = tempfile::tempdir().unwrap();
        let svc = TransitService::live(
            directory(),
            ReferenceLoader::new("/unused/stops.txt", dir.path().join("trips.txt")),
            Box::new(feed),
        );

        let results = svc.find_next_bus("1234").await.unwrap();

        assert_eq!(results[0].source, ArrivalSource::Simulated);
        assert!(!results[0].arrivals.is_empty());
    }

    #[tokio::test]
    async fn test_feed_failure_gives_no_vehicles() {
        let feed = std::sync::Arc::new(CannedFeed::failing());
        let trips = trips_file();
        let svc = service(feed, &trips);

        assert!(svc.get_bus_information("44001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_bus_information_by_plate() {
        let message = FeedMessage {
            header: header(),
            entity: vec![FeedEntity {
                id: "v".into(),
                vehicle: Some(VehiclePosition {
                    trip: Some(TripDescriptor {
                        trip_id: Some("t1".into()),
                        ..Default::default()
                    }),
                    vehicle: Some(VehicleDescriptor {
                        id: Some("44001".into()),
                        license_plate: Some("ABC-123".into()),
                        ..Default::default()
                    }),
                    position: Some(Position {
                        latitude: 61.5,
                        longitude: 23.8,
                        bearing: None,
                        odometer: None,
                        speed: Some(12.5),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        };
        let feed = std::sync::Arc::new(CannedFeed::ok(message));
        let trips = trips_file();
        let svc = service(feed, &trips);

        let found = svc.get_bus_information("ABC-123").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].route_id.as_deref(), Some("3"));
        assert!((found[0].speed_kmh - 45.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_simulated_mode() {
        let svc = TransitService::simulated(
            directory(),
            ReferenceLoader::new("/unused/stops.txt", "/unused/trips.txt"),
            SimulationReason::Forced,
        );

        let results = svc.find_next_bus("1234").await.unwrap();
        assert_eq!(results[0].source, ArrivalSource::Simulated);
        assert!(svc.get_bus_information("3").await.unwrap().is_empty());
        assert!(svc.is_simulated());
    }

    #[test]
    fn test_search_stops() {
        let svc = TransitService::simulated(
            directory(),
            ReferenceLoader::new("/unused/stops.txt", "/unused/trips.txt"),
            SimulationReason::MissingCredentials,
        );

        assert_eq!(svc.search_stops("KESKUSTORI").unwrap().len(), 6);
        assert_eq!(svc.search_stops("  "), Err(QueryError::EmptyQuery));
        assert!(matches!(
            svc.search_stops("Lielahti"),
            Err(QueryError::NoStopsFound { .. })
        ));
    }
}
