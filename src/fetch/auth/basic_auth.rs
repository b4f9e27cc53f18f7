use crate::config::Credentials;
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderValue};

/// An [`HttpClient`] wrapper that sends the client id and secret as an
/// `Authorization: Basic` header on every request.
pub struct BasicAuth<C> {
    pub inner: C,
    header: HeaderValue,
}

impl<C> BasicAuth<C> {
    pub fn new(inner: C, credentials: &Credentials) -> Self {
        let token = STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id(),
            credentials.client_secret()
        ));
        // base64 output is always a valid header value
        let mut header = HeaderValue::from_str(&format!("Basic {token}"))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        header.set_sensitive(true);
        Self { inner, header }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for BasicAuth<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert(AUTHORIZATION, self.header.clone());
        self.inner.execute(req).await
    }
}
