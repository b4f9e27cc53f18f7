//! Error types shared across the loader, feed client, resolvers and query layer.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading the static stop/trip tables.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference data at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required column is absent from the header row.
    #[error("{source_name}: missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// A row could not be parsed into its typed record.
    #[error("{source_name}: malformed row {row}{}: {message}", column_suffix(.column))]
    Malformed {
        source_name: String,
        row: u64,
        column: Option<String>,
        message: String,
    },

    #[error("reference load task did not complete: {0}")]
    Interrupted(String),
}

impl ReferenceError {
    /// True for errors caused by the content of the table rather than access to it.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ReferenceError::MissingColumn { .. } | ReferenceError::Malformed { .. }
        )
    }
}

fn column_suffix(column: &Option<String>) -> String {
    column
        .as_deref()
        .map(|c| format!(", column '{c}'"))
        .unwrap_or_default()
}

/// Failures while fetching or decoding a realtime feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned status {status} for {url}")]
    UpstreamUnavailable { status: u16, url: String },

    #[error("invalid feed url '{0}'")]
    InvalidUrl(String),

    #[error("feed payload is not a valid GTFS-RT message: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Failure of a single arrival or position resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// User-facing query problems. These are not system faults.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Please provide a search term")]
    EmptyQuery,

    #[error("No bus stops found matching \"{query}\". Please try another stop name.")]
    NoStopsFound { query: String },

    #[error("Found {count} stops matching \"{query}\". Please be more specific.")]
    TooManyStops {
        query: String,
        count: usize,
        sample: Vec<String>,
    },
}
