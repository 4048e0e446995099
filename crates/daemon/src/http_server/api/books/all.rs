use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use url::Url;

use common::transport::{TransportError, CLIENT_PUBLIC_KEY_HEADER};

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::api::sealed::{reply, ClientKey};
use crate::ServiceState;

#[derive(Debug, Clone, Default)]
pub struct AllBooksRequest {
    /// Sent as a header so the reply comes back sealed
    pub client_public_key: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    ClientKey(client_key): ClientKey,
) -> Result<Response, AllBooksError> {
    let books = state.books().all();
    tracing::debug!(count = books.len(), sealed = client_key.is_some(), "listing books");
    Ok(reply(&state, client_key.as_ref(), StatusCode::OK, &books)?)
}

#[derive(Debug, thiserror::Error)]
pub enum AllBooksError {
    #[error("failed to seal response: {0}")]
    Seal(#[from] TransportError),
}

impl IntoResponse for AllBooksError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "failed to list books");
        (StatusCode::INTERNAL_SERVER_ERROR, "Error getting books").into_response()
    }
}

impl ApiRequest for AllBooksRequest {
    type Response = Value;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let request = client.get(endpoint(base_url, "/allBooks"));
        match self.client_public_key {
            Some(key) => request.header(CLIENT_PUBLIC_KEY_HEADER, key),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use common::crypto::{Codec, KeyStrategy};
    use common::transport::Opened;

    use super::*;
    use crate::books::Book;

    #[tokio::test]
    async fn test_handler_direct() {
        let state = ServiceState::new(KeyStrategy::DerivedHash.generate(), Codec::default());
        state.books().add(Book {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            publication_date: "1965".to_string(),
        });

        let response = handler(State(state.clone()), ClientKey(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let books: Vec<Book> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(books, state.books().all());

        let client = KeyStrategy::DerivedHash.generate();
        let response = handler(State(state.clone()), ClientKey(Some(client.public())))
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let opened: Opened<Vec<Book>> = state.transport().channel(&client, None).open(body).unwrap();
        assert!(opened.sealed);
        assert_eq!(opened.value, state.books().all());
    }
}
