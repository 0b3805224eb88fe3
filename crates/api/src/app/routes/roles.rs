use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;

use tingo_auth::Identity;
use tingo_core::DomainError;

use crate::app::dto::{self, MessageResponse, UserWithRole};
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.directory.list_roles().await {
        Ok(roles) => Json(roles).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}

pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<Identity>,
    Json(body): Json<dto::AssignRoleRequest>,
) -> axum::response::Response {
    match services.directory.find_role(&body.role_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return errors::domain_error_to_response(DomainError::validation(format!(
                "unknown role: {}",
                body.role_id
            )));
        }
        Err(e) => return errors::backend_error_to_response(e),
    }

    match services
        .directory
        .set_profile_role(&body.user_id, &body.role_id)
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => return errors::not_found("user"),
        Err(e) => return errors::backend_error_to_response(e),
    }

    tracing::info!(
        admin = %admin.subject,
        target = %body.user_id,
        role_id = %body.role_id,
        "role assigned"
    );
    services
        .record_audit(
            &admin.subject,
            "ASSIGN_ROLE",
            "user_role",
            Some(body.user_id.to_string()),
            Some(json!({
                "target_user_id": body.user_id,
                "role_id": body.role_id,
            })),
        )
        .await;

    Json(MessageResponse::new("Rol asignado exitosamente")).into_response()
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let roles = match services.directory.list_roles().await {
        Ok(roles) => roles,
        Err(e) => return errors::backend_error_to_response(e),
    };
    let profiles = match services.directory.list_profiles().await {
        Ok(profiles) => profiles,
        Err(e) => return errors::backend_error_to_response(e),
    };

    let names: HashMap<_, _> = roles.into_iter().map(|r| (r.id, r.name)).collect();
    let users: Vec<UserWithRole> = profiles
        .into_iter()
        .map(|profile| {
            let role = profile.role_id.as_ref().and_then(|id| names.get(id)).cloned();
            UserWithRole { profile, role }
        })
        .collect();

    Json(users).into_response()
}
