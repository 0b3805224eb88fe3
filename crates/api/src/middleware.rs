use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use tingo_auth::Role;

use crate::app::services::ApiGate;
use crate::authz::auth_error_to_response;
use crate::context::OptionalIdentity;

#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<ApiGate>,
}

/// Authenticated routes: the caller's token must verify and its profile must exist.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let identity = match state.gate.authenticate(extract_bearer(req.headers())).await {
        Ok(identity) => identity,
        Err(e) => return auth_error_to_response(&e),
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Role-guarded routes.
#[derive(Clone)]
pub struct RoleGuard {
    pub auth: AuthState,
    pub role: Role,
}

pub async fn require_role(
    State(guard): State<RoleGuard>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let credential = extract_bearer(req.headers());
    let identity = match guard.auth.gate.authorize(credential, &guard.role).await {
        Ok(identity) => identity,
        Err(e) => return auth_error_to_response(&e),
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Routes open to anonymous callers; a valid token is still picked up.
pub async fn optional_identity_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let identity = state
        .gate
        .optional_identity(extract_bearer(req.headers()))
        .await;

    req.extensions_mut().insert(OptionalIdentity(identity));
    next.run(req).await
}

/// Token from `Authorization: Bearer <token>`; scheme match is case-insensitive.
///
/// Anything else reads as no credential at all.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
