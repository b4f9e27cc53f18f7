//! Joins realtime feed entities against the static trip table.
//!
//! Each resolution loads the trip table and fetches the feed concurrently,
//! waits for both, then runs a pure join over the decoded message. The joins
//! are exposed separately ([`arrivals_at`], [`positions_matching`]) so they can
//! be driven with any [`FeedMessage`](crate::gtfs_rt::FeedMessage).

mod arrivals;
mod positions;
mod simulate;

pub use arrivals::{ArrivalRecord, MAX_ARRIVALS, arrivals_at, minutes_until, resolve_arrivals};
pub use positions::{MAX_POSITIONS, PositionRecord, positions_matching, resolve_positions};
pub use simulate::{simulate_arrivals, simulate_arrivals_with};

use tracing::warn;

use crate::error::ReferenceError;
use crate::reference::{ReferenceLoader, TripIndex};

/// Placeholder shown for identifiers that could not be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Loads the trip index, treating a malformed table as an empty one.
async fn trip_index_or_empty(loader: &ReferenceLoader) -> Result<TripIndex, ReferenceError> {
    match loader.trip_index().await {
        Err(e) if e.is_format_error() => {
            warn!(error = %e, "Trip table is malformed; trip details will be unknown");
            Ok(TripIndex::default())
        }
        other => other,
    }
}
