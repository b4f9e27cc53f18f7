//! Static reference data: the stop and trip tables of the GTFS schedule.
//!
//! [`ReferenceLoader`] parses the row-oriented tables into typed records.
//! [`StopDirectory`] answers stop searches; [`TripIndex`] joins realtime
//! trip identifiers back to routes and headsigns.

mod loader;
mod types;

pub use loader::{ReferenceLoader, parse_stops, parse_trips};
pub use types::{StopDirectory, StopReference, TripIndex, TripReference};
