use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use tingo_auth::{Identity, Profile, Role, RoleClaim, TokenGrant};

use crate::app::dto::{self, LoginResponse, MessageResponse, RegisterResponse, RegisteredUser};
use crate::app::errors::{self, json_error};
use crate::app::services::{self, AppServices};
use crate::authz::auth_error_to_response;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }
    let email = body.email.trim();

    let session = match services.identity.sign_in(email, &body.password).await {
        Ok(session) => session,
        Err(e) if e.is_client_error() => {
            tracing::info!(email, reason = %e, "login rejected");
            return json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "invalid email or password",
            );
        }
        Err(e) => return errors::backend_error_to_response(e),
    };

    let profile = match services.directory.find_profile(&session.user.id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!(subject = %session.user.id, "account has no profile");
            return json_error(
                StatusCode::UNAUTHORIZED,
                "profile_not_found",
                "no profile for this account",
            );
        }
        Err(e) => return errors::backend_error_to_response(e),
    };

    let role = match services.gate.resolve_roles(&profile).await {
        Ok(roles) => roles.into_iter().next().unwrap_or(Role::DEFAULT),
        Err(e) => return auth_error_to_response(&e),
    };

    let grant = TokenGrant {
        subject: session.user.id.clone(),
        email: session.user.email.clone().or_else(|| profile.email.clone()),
        role: RoleClaim::Name(role.clone()),
    };
    let issued = match services.codec.issue(grant) {
        Ok(issued) => issued,
        Err(e) => {
            tracing::error!(error = %e, "failed to issue token");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_issue_failed",
                "could not issue token",
            );
        }
    };

    services
        .record_audit(
            &session.user.id,
            "LOGIN",
            "auth",
            None,
            Some(json!({ "email": email })),
        )
        .await;

    Json(LoginResponse::new(
        issued.token,
        issued.expires_at,
        role,
        session,
        profile,
    ))
    .into_response()
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }
    let email = body.email.trim().to_string();
    let full_name = body.full_name.trim().to_string();

    let user = match services.identity.sign_up(&email, &body.password).await {
        Ok(user) => user,
        Err(e) => return errors::backend_error_to_response(e),
    };

    let role_id = match services.directory.find_role_by_name(&Role::DEFAULT).await {
        Ok(Some(role)) => Some(role.id),
        Ok(None) => {
            tracing::warn!(role = %Role::DEFAULT, "default role missing; profile created without a role");
            None
        }
        Err(e) => return errors::backend_error_to_response(e),
    };

    let profile = Profile {
        id: user.id.clone(),
        email: Some(email.clone()),
        full_name: Some(full_name.clone()),
        role_id,
        created_at: Some(services::now()),
    };
    if let Err(e) = services.directory.create_profile(profile).await {
        return errors::backend_error_to_response(e);
    }

    services
        .record_audit(
            &user.id,
            "REGISTER",
            "user",
            Some(user.id.to_string()),
            Some(json!({ "email": email, "full_name": full_name })),
        )
        .await;

    (
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Usuario registrado exitosamente",
            user: RegisteredUser {
                id: user.id,
                email,
                full_name,
            },
        }),
    )
        .into_response()
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    body: Option<Json<dto::LogoutRequest>>,
) -> axum::response::Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    if let Err(e) = services.identity.sign_out(body.access_token.as_deref()).await {
        tracing::warn!(error = %e, subject = %identity.subject, "provider sign-out failed");
    }

    services
        .record_audit(&identity.subject, "LOGOUT", "auth", None, None)
        .await;

    Json(MessageResponse::new("Sesión cerrada exitosamente")).into_response()
}

/// Always answers with the same message for well-formed input, so callers
/// cannot discover which addresses have accounts.
pub async fn password_recovery(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PasswordRecoveryRequest>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }

    match services.identity.recover_password(body.email.trim()).await {
        Ok(()) => {}
        Err(e) if e.is_client_error() => {
            tracing::info!(reason = %e, "password recovery rejected by provider");
        }
        Err(e) => return errors::backend_error_to_response(e),
    }

    Json(MessageResponse::new(
        "Se ha enviado un email con instrucciones para recuperar tu contraseña",
    ))
    .into_response()
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> axum::response::Response {
    let roles = match services.gate.resolve_roles(&identity.profile).await {
        Ok(roles) => roles,
        Err(e) => return auth_error_to_response(&e),
    };
    let token_role = match services.gate.resolve_claim(&identity.claimed_role).await {
        Ok(role) => role,
        Err(e) => return auth_error_to_response(&e),
    };

    Json(dto::MeResponse::new(identity, roles, token_role)).into_response()
}
