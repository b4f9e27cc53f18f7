use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A physical stop from `stops.txt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopReference {
    pub stop_code: String,
    pub stop_name: String,
    #[serde(rename = "stop_lat")]
    pub latitude: f64,
    #[serde(rename = "stop_lon")]
    pub longitude: f64,
    #[serde(rename = "zone_id", default)]
    pub zone: Option<String>,
}

/// A scheduled trip from `trips.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripReference {
    pub trip_id: String,
    pub route_id: String,
    #[serde(default)]
    pub trip_headsign: String,
}

/// All known stops, searchable by name or code.
#[derive(Debug, Clone, Default)]
pub struct StopDirectory {
    stops: Vec<StopReference>,
}

impl StopDirectory {
    pub fn new(stops: Vec<StopReference>) -> Self {
        Self { stops }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Stops whose name contains `query`, ignoring case, in table order.
    pub fn search(&self, query: &str) -> Vec<&StopReference> {
        let needle = query.trim().to_lowercase();
        self.stops
            .iter()
            .filter(|s| s.stop_name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Stops whose public code is exactly `code`.
    ///
    /// Codes are not guaranteed unique in the source data, so this may return
    /// more than one stop.
    pub fn by_code(&self, code: &str) -> Vec<&StopReference> {
        let code = code.trim();
        self.stops.iter().filter(|s| s.stop_code == code).collect()
    }
}

/// Trip references keyed by `trip_id`.
///
/// Built fresh from each load; lookups never fail, a miss is `None`.
#[derive(Debug, Clone, Default)]
pub struct TripIndex {
    trips: HashMap<String, TripReference>,
}

impl TripIndex {
    pub fn get(&self, trip_id: &str) -> Option<&TripReference> {
        self.trips.get(trip_id)
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

impl From<Vec<TripReference>> for TripIndex {
    /// Later rows with a duplicate `trip_id` replace earlier ones.
    fn from(rows: Vec<TripReference>) -> Self {
        let trips = rows
            .into_iter()
            .map(|t| (t.trip_id.clone(), t))
            .collect();
        Self { trips }
    }
}
