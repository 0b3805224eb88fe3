use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tingo_core::DomainError;
use tingo_infra::BackendError;

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

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

/// Backend failures: client errors pass through as 400/404/409, the rest are
/// logged and reported without internal detail.
pub fn backend_error_to_response(err: BackendError) -> axum::response::Response {
    match err {
        BackendError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        BackendError::Rejected { status: 409, message } => {
            json_error(StatusCode::CONFLICT, "conflict", message)
        }
        BackendError::Rejected { status, message } if (400..500).contains(&status) => {
            json_error(StatusCode::BAD_REQUEST, "rejected", message)
        }
        other => {
            tracing::error!(error = %other, "backend request failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "backend_unavailable",
                "backend request failed",
            )
        }
    }
}

pub fn not_found(what: &str) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn json_error_shape() {
        let resp = json_error(StatusCode::BAD_REQUEST, "validation_error", "price must be greater than 0");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "price must be greater than 0");
    }

    #[tokio::test]
    async fn backend_errors_hide_internal_detail() {
        let resp = backend_error_to_response(BackendError::unavailable("tcp connect 10.0.0.3:443 refused"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.3"));

        let resp = backend_error_to_response(BackendError::rejected(422, "user already registered"));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = backend_error_to_response(BackendError::rejected(409, "duplicate"));
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(
            domain_error_to_response(DomainError::validation("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            domain_error_to_response(DomainError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }
}
