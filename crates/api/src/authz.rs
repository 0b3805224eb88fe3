//! HTTP mapping of authorization outcomes.

use axum::http::{header, HeaderValue, StatusCode};

use tingo_auth::{AuthError, Rejection, TokenError};

use crate::app::errors::json_error;

/// Hint sent with transient authorization failures.
const RETRY_AFTER_SECS: &str = "1";

/// Build the response for a rejected request.
///
/// Unauthenticated outcomes carry a `WWW-Authenticate: Bearer` challenge.
pub fn auth_error_to_response(err: &AuthError) -> axum::response::Response {
    let (code, message) = match err {
        AuthError::MissingCredential => ("missing_credential", "bearer token required"),
        AuthError::Token(TokenError::Expired) => ("token_expired", "token expired"),
        AuthError::Token(_) => ("invalid_token", "invalid token"),
        AuthError::ProfileNotFound => ("profile_not_found", "no profile for this token"),
        AuthError::InsufficientRole { .. } => ("forbidden", "insufficient role"),
        AuthError::StoreUnavailable(_) => ("auth_unavailable", "authorization temporarily unavailable"),
    };

    match err.rejection() {
        Rejection::Unauthenticated => {
            let mut resp = json_error(StatusCode::UNAUTHORIZED, code, message);
            let challenge = match err {
                AuthError::MissingCredential => "Bearer",
                _ => "Bearer error=\"invalid_token\"",
            };
            resp.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
            resp
        }
        Rejection::Forbidden => {
            let message = match err {
                AuthError::InsufficientRole { required } => format!("role '{required}' required"),
                _ => message.to_string(),
            };
            json_error(StatusCode::FORBIDDEN, code, message)
        }
        Rejection::Unavailable => {
            let retryable = err.is_retryable();
            tracing::error!(error = %err, retryable, "authorization decision unavailable");
            let mut resp = json_error(StatusCode::INTERNAL_SERVER_ERROR, code, message);
            if retryable {
                resp.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
            }
            resp
        }
    }
}
