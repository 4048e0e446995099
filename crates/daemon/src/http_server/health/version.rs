use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;

use common::prelude::build_info;

#[tracing::instrument]
pub async fn handler() -> Response {
    (StatusCode::OK, Json(build_info())).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn test_handler_direct() {
        let response = handler().await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
