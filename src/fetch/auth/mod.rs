//! Credential-injecting [`HttpClient`](super::HttpClient) decorators.

mod basic_auth;

pub use basic_auth::BasicAuth;
