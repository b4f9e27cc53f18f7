use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{StopReference, TripIndex, TripReference};
use crate::error::ReferenceError;

const STOP_COLUMNS: &[&str] = &["stop_code", "stop_name", "stop_lat", "stop_lon"];
const TRIP_COLUMNS: &[&str] = &["trip_id", "route_id"];

/// Reads the stop and trip tables from disk.
///
/// Every call parses the file again and returns an independent sequence, so
/// one loader can be shared freely between concurrent queries.
#[derive(Debug, Clone)]
pub struct ReferenceLoader {
    stops_path: PathBuf,
    trips_path: PathBuf,
}

impl ReferenceLoader {
    pub fn new(stops_path: impl Into<PathBuf>, trips_path: impl Into<PathBuf>) -> Self {
        Self {
            stops_path: stops_path.into(),
            trips_path: trips_path.into(),
        }
    }

    #[tracing::instrument(skip(self), fields(path = %self.stops_path.display()))]
    pub fn load_stops(&self) -> Result<Vec<StopReference>, ReferenceError> {
        let stops = parse_stops(&source_name(&self.stops_path), open(&self.stops_path)?)?;
        debug!(count = stops.len(), "Loaded stops");
        Ok(stops)
    }

    #[tracing::instrument(skip(self), fields(path = %self.trips_path.display()))]
    pub fn load_trips(&self) -> Result<Vec<TripReference>, ReferenceError> {
        let trips = parse_trips(&source_name(&self.trips_path), open(&self.trips_path)?)?;
        debug!(count = trips.len(), "Loaded trips");
        Ok(trips)
    }

    /// Loads the trip table on the blocking pool and indexes it by `trip_id`.
    pub async fn trip_index(&self) -> Result<TripIndex, ReferenceError> {
        let loader = self.clone();
        tokio::task::spawn_blocking(move || loader.load_trips())
            .await
            .map_err(|e| ReferenceError::Interrupted(e.to_string()))?
            .map(TripIndex::from)
    }
}

/// Parses a `stops.txt` table.
pub fn parse_stops<R: Read>(
    source_name: &str,
    reader: R,
) -> Result<Vec<StopReference>, ReferenceError> {
    parse_table(source_name, reader, STOP_COLUMNS)
}

/// Parses a `trips.txt` table.
pub fn parse_trips<R: Read>(
    source_name: &str,
    reader: R,
) -> Result<Vec<TripReference>, ReferenceError> {
    parse_table(source_name, reader, TRIP_COLUMNS)
}

fn parse_table<T: DeserializeOwned, R: Read>(
    source_name: &str,
    reader: R,
    required: &[&str],
) -> Result<Vec<T>, ReferenceError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| malformed(source_name, &StringRecord::new(), e))?
        .clone();

    if let Some(column) = required.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(ReferenceError::MissingColumn {
            source_name: source_name.to_string(),
            column: column.to_string(),
        });
    }

    rdr.deserialize()
        .map(|row| row.map_err(|e| malformed(source_name, &headers, e)))
        .collect()
}

fn malformed(source_name: &str, headers: &StringRecord, err: csv::Error) -> ReferenceError {
    let row = err.position().map_or(0, |p| p.line());
    let (column, message) = match err.kind() {
        csv::ErrorKind::Deserialize { err: de, .. } => (
            de.field()
                .and_then(|i| headers.get(i as usize))
                .map(str::to_string),
            de.kind().to_string(),
        ),
        _ => (None, err.to_string()),
    };

    ReferenceError::Malformed {
        source_name: source_name.to_string(),
        row,
        column,
        message,
    }
}

fn open(path: &Path) -> Result<File, ReferenceError> {
    File::open(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("reference table")
        .to_string()
}
