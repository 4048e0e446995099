use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use common::crypto::Integrity;
use common::transport::{Opened, TransportError};

use crate::books::Book;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::api::sealed::{reply, ClientKey};
use crate::ServiceState;

/// Body is either a plain book or a sealed payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddBookRequest {
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBookResponse {
    pub message: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    ClientKey(header_key): ClientKey,
    Json(body): Json<Value>,
) -> Result<Response, AddBookError> {
    let keys = state.keys();
    let opened: Opened<Book> = state
        .transport()
        .channel(&keys, None)
        .open(body)
        .map_err(AddBookError::InvalidPayload)?;

    tracing::info!(
        title = %opened.value.title,
        sealed = opened.sealed,
        integrity = ?opened.integrity,
        "adding book"
    );
    if opened.integrity == Some(Integrity::Unprotected) {
        tracing::warn!("book arrived without protection, the sender could not seal it");
    }
    state.books().add(opened.value);

    let counterpart = opened.counterpart.or(header_key);
    let response = AddBookResponse {
        message: "Book added".to_string(),
    };
    reply(&state, counterpart.as_ref(), StatusCode::CREATED, &response).map_err(AddBookError::Seal)
}

#[derive(Debug, thiserror::Error)]
pub enum AddBookError {
    #[error("invalid payload: {0}")]
    InvalidPayload(TransportError),
    #[error("failed to seal response: {0}")]
    Seal(TransportError),
}

impl IntoResponse for AddBookError {
    fn into_response(self) -> Response {
        match self {
            AddBookError::InvalidPayload(e) => {
                tracing::warn!(error = %e, "rejecting book payload");
                (StatusCode::BAD_REQUEST, format!("Invalid payload: {}", e)).into_response()
            }
            AddBookError::Seal(e) => {
                tracing::error!(error = %e, "failed to seal add book response");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error adding book").into_response()
            }
        }
    }
}

impl ApiRequest for AddBookRequest {
    type Response = Value;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(base_url, "/addBook")).json(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use common::crypto::{Codec, KeyStrategy};
    use serde_json::json;

    use super::*;

    fn state() -> ServiceState {
        ServiceState::new(KeyStrategy::DerivedHash.generate(), Codec::default())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_plain_book() {
        let state = state();
        let book = json!({ "title": "Dune", "author": "Herbert", "publicationDate": "1965" });

        let response = handler(State(state.clone()), ClientKey(None), Json(book))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await, json!({ "message": "Book added" }));
        assert_eq!(state.books().len(), 1);
    }

    #[tokio::test]
    async fn test_sealed_book_sealed_reply() {
        let state = state();
        let client = KeyStrategy::DerivedHash.generate();
        let server_public = state.keys().public();
        let book = json!({ "title": "Dune", "author": "Herbert", "publicationDate": "1965" });

        let sealed = state
            .transport()
            .channel(&client, Some(&server_public))
            .seal_request(&book)
            .unwrap();
        let response = handler(State(state.clone()), ClientKey(None), Json(sealed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert!(body["encryptedData"].is_string());
        let opened: Opened<AddBookResponse> =
            state.transport().channel(&client, None).open(body).unwrap();
        assert_eq!(opened.value.message, "Book added");
        assert_eq!(state.books().all()[0].title, "Dune");
    }

    #[tokio::test]
    async fn test_undecodable_payload_rejected() {
        let state = state();
        let body = json!({ "encryptedData": "not-base64-with-no-separator" });
        let result = handler(State(state.clone()), ClientKey(None), Json(body)).await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.books().is_empty());
    }
}
