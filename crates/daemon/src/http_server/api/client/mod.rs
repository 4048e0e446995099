//! HTTP client for the bookwire API
//!
//! Each request type implements [`ApiRequest`] next to the handler that
//! serves it, so the route and the shape of the call live in one place.

mod client;

pub use client::ApiClient;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    /// The remote answered with a non-success status; carries the body
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
}

impl ApiError {
    /// The remote could not be reached at all (as opposed to answering badly)
    pub fn is_unreachable(&self) -> bool {
        match self {
            ApiError::Reqwest(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder;
}

/// Absolute URL for a route on the remote.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Url {
    base_url
        .join(path)
        .expect("route paths are absolute and always join onto a base url")
}
