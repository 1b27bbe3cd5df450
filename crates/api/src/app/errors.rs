use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fleetrent_infra::{ErrorKind, ServiceError};

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::OutOfStock | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidDateRange => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let kind = err.kind();
    json_error(status_for(kind), kind.as_str(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path identifier, answering 400 `invalid_id` on failure.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// Unwrap a JSON body, answering `invalid_body` with axum's status when it
/// could not be read or deserialized.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(value)| value)
        .map_err(|rejection| json_error(rejection.status(), "invalid_body", rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetrent_core::{CustomerId, VehicleId};

    #[test]
    fn every_kind_has_a_status() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::OutOfStock), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::InvalidDateRange), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn out_of_stock_response_is_conflict() {
        let response = service_error_to_response(ServiceError::OutOfStock(VehicleId::new()));
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    async fn extract_restock(content_type: &str, raw: &'static str) -> Result<i64, axum::response::Response> {
        use axum::extract::FromRequest;

        let request = axum::http::Request::builder()
            .method("POST")
            .header("content-type", content_type)
            .body(axum::body::Body::from(raw))
            .unwrap();
        let body = Json::<crate::app::dto::RestockRequest>::from_request(request, &()).await;
        json_body(body).map(|req| req.delta)
    }

    async fn error_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn malformed_bodies_get_json_errors() {
        assert_eq!(extract_restock("application/json", r#"{"delta": -2}"#).await.ok(), Some(-2));

        let response = extract_restock("application/json", r#"{"delta": "lots"}"#).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = error_body(response).await;
        assert_eq!(body["error"], "invalid_body");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

        let response = extract_restock("application/json", "{").await.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(response).await["error"], "invalid_body");

        let response = extract_restock("text/plain", r#"{"delta": 1}"#).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn bad_ids_are_rejected() {
        assert!(parse_id::<CustomerId>("nope").is_err());
        let id = CustomerId::new();
        assert_eq!(parse_id::<CustomerId>(&id.to_string()).ok(), Some(id));
    }
}
