//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend wiring (identity provider, directory, catalog, audit, storage)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and input validation
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tingo_auth::Role;

use crate::config::CorsOrigins;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Largest accepted request body; sized for product image uploads.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the full HTTP router (shared by `main.rs` and the black-box tests).
pub fn build_app(services: Arc<services::AppServices>, cors: &CorsOrigins) -> Router {
    let auth_state = middleware::AuthState {
        gate: services.gate.clone(),
    };
    let admin_guard = middleware::RoleGuard {
        auth: auth_state.clone(),
        role: Role::ADMIN,
    };

    let optional = routes::optional_identity_router().route_layer(
        axum::middleware::from_fn_with_state(
            auth_state.clone(),
            middleware::optional_identity_middleware,
        ),
    );
    let protected = routes::protected_router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));
    let admin = routes::admin_router().route_layer(axum::middleware::from_fn_with_state(
        admin_guard,
        middleware::require_role,
    ));

    let api = routes::public_router()
        .merge(optional)
        .merge(protected)
        .merge(admin);

    Router::new()
        .route("/", get(routes::system::root))
        .route("/health", get(routes::system::health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(Extension(services)),
        )
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(parsed))
        }
    }
}
