use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicKeyRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    let keys = state.keys();
    tracing::debug!(kind = %keys.kind(), "public key requested");
    (
        StatusCode::OK,
        Json(PublicKeyResponse {
            public_key: keys.public_key().to_string(),
        }),
    )
        .into_response()
}

impl ApiRequest for PublicKeyRequest {
    type Response = PublicKeyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, "/publicKey"))
    }
}
