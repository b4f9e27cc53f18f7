mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::debug;

use crate::error::FeedError;

/// Issues a GET for `url` through `client` and returns the body bytes.
///
/// Non-2xx responses become [`FeedError::UpstreamUnavailable`]; nothing is retried.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, FeedError> {
    let parsed =
        reqwest::Url::parse(url).map_err(|_| FeedError::InvalidUrl(url.to_string()))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await.map_err(|source| FeedError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FeedError::UpstreamUnavailable {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = resp.bytes().await.map_err(|source| FeedError::Transport {
        url: url.to_string(),
        source,
    })?;
    debug!(url, bytes = bytes.len(), "Feed bytes received");

    Ok(bytes.to_vec())
}
