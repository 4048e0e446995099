use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn not_found_handler(method: Method, uri: Uri, headers: HeaderMap) -> Response {
    tracing::debug!(%method, path = %uri.path(), "no route matched");

    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    if wants_json {
        let err_msg = serde_json::json!({ "msg": "not found", "path": uri.path() });
        (StatusCode::NOT_FOUND, Json(err_msg)).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("not found: {} {}", method, uri.path()),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn test_handler_direct() {
        let uri: Uri = "/nope".parse().unwrap();

        let response = not_found_handler(Method::GET, uri.clone(), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let response = not_found_handler(Method::GET, uri, headers).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
