use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use common::transport::{TransportError, CLIENT_PUBLIC_KEY_HEADER};

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::api::sealed::{reply, ClientKey};
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchBooksRequest {
    pub query: String,
    pub client_public_key: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    ClientKey(client_key): ClientKey,
    Query(params): Query<SearchParams>,
) -> Result<Response, SearchBooksError> {
    let books = state.books().search(&params.q);
    tracing::debug!(query = %params.q, count = books.len(), "searching books");
    Ok(reply(&state, client_key.as_ref(), StatusCode::OK, &books)?)
}

#[derive(Debug, thiserror::Error)]
pub enum SearchBooksError {
    #[error("failed to seal response: {0}")]
    Seal(#[from] TransportError),
}

impl IntoResponse for SearchBooksError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "failed to search books");
        (StatusCode::INTERNAL_SERVER_ERROR, "Error searching books").into_response()
    }
}

impl ApiRequest for SearchBooksRequest {
    type Response = Value;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let request = client
            .get(endpoint(base_url, "/searchBooks"))
            .query(&SearchParams { q: self.query });
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

    use super::*;
    use crate::books::Book;

    #[tokio::test]
    async fn test_handler_direct() {
        let state = ServiceState::new(KeyStrategy::DerivedHash.generate(), Codec::default());
        for (title, author) in [("Dune", "Herbert"), ("Emma", "Austen")] {
            state.books().add(Book {
                title: title.to_string(),
                author: author.to_string(),
                publication_date: "1815".to_string(),
            });
        }

        let params = SearchParams {
            q: " AUSTEN ".to_string(),
        };
        let response = handler(State(state.clone()), ClientKey(None), Query(params))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let books: Vec<Book> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Emma");

        let response = handler(State(state), ClientKey(None), Query(SearchParams::default()))
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let books: Vec<Book> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(books.len(), 2);
    }
}
