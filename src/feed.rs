//! Realtime feed access.
//!
//! [`FeedSource`] is the seam the resolvers depend on. [`FeedClient`] is the
//! live implementation: an authenticated GET against the feed API followed by
//! a protobuf decode.

use async_trait::async_trait;
use tracing::debug;

use crate::config::Credentials;
use crate::error::FeedError;
use crate::fetch::auth::BasicAuth;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedMessage;
use crate::parser::parse_feed;

const TRIP_UPDATES_PATH: &str = "/api/v2/gtfsrt/v1/trip-updates";
const VEHICLE_POSITIONS_PATH: &str = "/api/v2/gtfsrt/v1/vehicle-positions";

/// Provides decoded realtime feed messages.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn trip_updates(&self) -> Result<FeedMessage, FeedError>;

    async fn vehicle_positions(&self) -> Result<FeedMessage, FeedError>;
}

#[async_trait]
impl<T: FeedSource + ?Sized> FeedSource for std::sync::Arc<T> {
    async fn trip_updates(&self) -> Result<FeedMessage, FeedError> {
        (**self).trip_updates().await
    }

    async fn vehicle_positions(&self) -> Result<FeedMessage, FeedError> {
        (**self).vehicle_positions().await
    }
}

/// Fetches trip updates and vehicle positions over HTTP.
pub struct FeedClient<C> {
    http: C,
    base_url: String,
}

impl FeedClient<BasicAuth<BasicClient>> {
    /// Live client with Basic authentication and a bounded request time.
    pub fn authenticated(
        base_url: &str,
        credentials: &Credentials,
        timeout: std::time::Duration,
    ) -> Result<Self, FeedError> {
        let inner = BasicClient::with_timeout(timeout).map_err(|source| FeedError::Transport {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self::new(BasicAuth::new(inner, credentials), base_url))
    }
}

impl<C: HttpClient> FeedClient<C> {
    pub fn new(http: C, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn trip_updates_url(&self) -> String {
        format!("{}{}", self.base_url, TRIP_UPDATES_PATH)
    }

    pub fn vehicle_positions_url(&self) -> String {
        format!("{}{}", self.base_url, VEHICLE_POSITIONS_PATH)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<FeedMessage, FeedError> {
        let bytes = fetch_bytes(&self.http, url).await?;
        let feed = parse_feed(&bytes)?;
        debug!(entity_count = feed.entity.len(), "Feed decoded");
        Ok(feed)
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for FeedClient<C> {
    async fn trip_updates(&self) -> Result<FeedMessage, FeedError> {
        self.fetch(&self.trip_updates_url()).await
    }

    async fn vehicle_positions(&self) -> Result<FeedMessage, FeedError> {
        self.fetch(&self.vehicle_positions_url()).await
    }
}
