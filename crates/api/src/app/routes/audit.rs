use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn list_audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::AuditListQuery>,
) -> axum::response::Response {
    let query = match query.into_query() {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.audit.query(&query).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}
