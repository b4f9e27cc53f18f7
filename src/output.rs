//! Text and JSON rendering of query results.
//!
//! Absent identifiers are shown as "Unknown" here and nowhere earlier.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::error::QueryError;
use crate::query::{ArrivalSource, StopArrivals};
use crate::reference::StopReference;
use crate::resolve::{PositionRecord, UNKNOWN};

/// Serializes any result as pretty-printed JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

#[derive(Serialize)]
struct StopArrivalsView<'a> {
    stop_code: &'a str,
    stop_name: &'a str,
    zone: Option<&'a str>,
    location: String,
    source: ArrivalSource,
    arrivals: Vec<ArrivalView<'a>>,
}

#[derive(Serialize)]
struct ArrivalView<'a> {
    trip_id: &'a str,
    route_id: &'a str,
    headsign: &'a str,
    arrival_time: DateTime<Utc>,
    arrival_in: i64,
}

fn location(stop: &StopReference) -> String {
    format!("{}, {}", stop.latitude, stop.longitude)
}

/// Arrivals as pretty JSON with trip details resolved.
pub fn arrivals_to_json(results: &[StopArrivals]) -> serde_json::Result<String> {
    let view: Vec<StopArrivalsView<'_>> = results
        .iter()
        .map(|r| StopArrivalsView {
            stop_code: &r.stop.stop_code,
            stop_name: &r.stop.stop_name,
            zone: r.stop.zone.as_deref(),
            location: location(&r.stop),
            source: r.source,
            arrivals: r
                .arrivals
                .iter()
                .map(|a| ArrivalView {
                    trip_id: a.trip_id.as_deref().unwrap_or(UNKNOWN),
                    route_id: a.route_id(),
                    headsign: a.headsign(),
                    arrival_time: a.arrival_time,
                    arrival_in: a.arrival_in,
                })
                .collect(),
        })
        .collect();
    to_json(&view)
}

pub fn render_arrivals(query: &str, results: &[StopArrivals]) -> String {
    let mut out = format!(
        "Found {} bus stops matching \"{}\":\n",
        results.len(),
        query.trim()
    );

    for result in results {
        let stop = &result.stop;
        let _ = write!(out, "\n{} ({})", stop.stop_name, stop.stop_code);
        if let Some(zone) = &stop.zone {
            let _ = write!(out, ", zone {zone}");
        }
        let _ = write!(out, " at {}", location(stop));
        if result.source == ArrivalSource::Simulated {
            out.push_str(" [simulated]");
        }
        out.push('\n');

        if result.arrivals.is_empty() {
            out.push_str("  No upcoming arrivals\n");
            continue;
        }
        for a in &result.arrivals {
            let _ = writeln!(
                out,
                "  {} → {}: {} (in {} min)",
                a.route_id(),
                a.headsign(),
                a.arrival_time.with_timezone(&Local).format("%H:%M"),
                a.arrival_in
            );
        }
    }

    out
}

pub fn render_positions(search: &str, positions: &[PositionRecord]) -> String {
    if positions.is_empty() {
        return format!("No buses found matching \"{}\".", search.trim());
    }

    let mut out = format!(
        "Found {} buses matching \"{}\":\n",
        positions.len(),
        search.trim()
    );
    for p in positions {
        let _ = writeln!(
            out,
            "- Bus {} ({}) on route {}, trip {}: {:.5}, {:.5}, heading {:.0}°, {:.1} km/h",
            p.vehicle_id.as_deref().unwrap_or(UNKNOWN),
            p.license_plate.as_deref().unwrap_or(UNKNOWN),
            p.route_id.as_deref().unwrap_or(UNKNOWN),
            p.trip_id.as_deref().unwrap_or(UNKNOWN),
            p.latitude,
            p.longitude,
            p.bearing_degrees,
            p.speed_kmh
        );
    }
    out
}

pub fn render_stops(query: &str, stops: &[StopReference]) -> String {
    let mut out = format!(
        "Found {} bus stops matching \"{}\":\n",
        stops.len(),
        query.trim()
    );
    for s in stops {
        let _ = writeln!(out, "- {} ({})", s.stop_name, s.stop_code);
    }
    out
}

pub fn render_error(err: &QueryError) -> String {
    match err {
        QueryError::TooManyStops { sample, .. } if !sample.is_empty() => {
            let mut out = err.to_string();
            out.push('\n');
            for name in sample {
                let _ = writeln!(out, "- {name}");
            }
            out
        }
        _ => err.to_string(),
    }
}
