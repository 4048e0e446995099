use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use common::crypto::Key;
use common::transport::{parse_counterpart, TransportError, CLIENT_PUBLIC_KEY_HEADER};

use crate::ServiceState;

/// Client public key from the `X-Client-Public-Key` header, if any
#[derive(Debug, Clone)]
pub struct ClientKey(pub Option<Key>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(CLIENT_PUBLIC_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_counterpart);
        Ok(ClientKey(key))
    }
}

/// JSON reply, sealed for `counterpart` when one is known
pub fn reply<T: Serialize>(
    state: &ServiceState,
    counterpart: Option<&Key>,
    status: StatusCode,
    value: &T,
) -> Result<Response, TransportError> {
    let keys = state.keys();
    let body = state
        .transport()
        .channel(&keys, counterpart)
        .seal_response(value)?;
    Ok((status, Json(body)).into_response())
}
