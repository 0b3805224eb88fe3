use serde::{Deserialize, Serialize};

use tingo_auth::{Identity, Profile, Role};
use tingo_core::{CategoryId, DomainError, DomainResult, RoleId, SubjectId};
use tingo_infra::{AuditQuery, ProviderSession};
use tingo_infra::audit::MAX_AUDIT_LIMIT;
use tingo_products::ProductFilter;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_FULL_NAME_LEN: usize = 2;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_email(&self.email)?;
        ensure_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_email(&self.email)?;
        ensure_password(&self.password)?;
        if self.full_name.trim().chars().count() < MIN_FULL_NAME_LEN {
            return Err(DomainError::validation(format!(
                "full_name must be at least {MIN_FULL_NAME_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordRecoveryRequest {
    pub email: String,
}

impl PasswordRecoveryRequest {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_email(&self.email)
    }
}

/// Optional logout body: the provider session token handed out at login.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: SubjectId,
    pub role_id: RoleId,
}

/// `/productos/publicos` only filters by text and category.
#[derive(Debug, Default, Deserialize)]
pub struct PublicProductQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl PublicProductQuery {
    pub fn into_filter(self) -> ProductFilter {
        ProductFilter {
            search: self.search,
            category_id: self.category_id,
            ..ProductFilter::public()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditListQuery {
    #[serde(default)]
    pub user_id: Option<SubjectId>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl AuditListQuery {
    /// Out-of-range limits are rejected rather than clamped.
    pub fn into_query(self) -> DomainResult<AuditQuery> {
        let mut query = AuditQuery::default();
        query.user_id = self.user_id.filter(|u| !u.as_str().trim().is_empty());
        query.table_name = self.table_name.filter(|t| !t.trim().is_empty());
        query.action = self.action.filter(|a| !a.trim().is_empty());
        if let Some(limit) = self.limit {
            if limit < 1 || limit > MAX_AUDIT_LIMIT as i64 {
                return Err(DomainError::validation(format!(
                    "limit must be between 1 and {MAX_AUDIT_LIMIT}"
                )));
            }
            query = query.with_limit(limit as usize);
        }
        Ok(query)
    }
}

fn ensure_email(email: &str) -> DomainResult<()> {
    let valid = email.trim().split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && domain.contains('.')
            && !domain.contains('@')
    });
    if !valid {
        return Err(DomainError::validation("invalid email address"));
    }
    Ok(())
}

fn ensure_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: SubjectId,
    pub email: Option<String>,
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct ProviderTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: String,
    pub role: Role,
    pub user: SessionUser,
    pub session: ProviderTokens,
}

impl LoginResponse {
    pub fn new(
        access_token: String,
        expires_at: chrono::DateTime<chrono::Utc>,
        role: Role,
        session: ProviderSession,
        profile: Profile,
    ) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            expires_at: expires_at.to_rfc3339(),
            role,
            user: SessionUser {
                id: session.user.id,
                email: session.user.email,
                profile,
            },
            session: ProviderTokens {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: SubjectId,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: RegisteredUser,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: SubjectId,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub roles: Vec<Role>,
    /// Role named by the token itself; informational only.
    pub token_role: Option<Role>,
    pub profile: Profile,
}

impl MeResponse {
    pub fn new(identity: Identity, roles: Vec<Role>, token_role: Option<Role>) -> Self {
        Self {
            id: identity.subject,
            email: identity.email,
            role: roles.first().cloned(),
            roles,
            token_role,
            profile: identity.profile,
        }
    }
}

/// Profile with its role name resolved.
#[derive(Debug, Serialize)]
pub struct UserWithRole {
    #[serde(flatten)]
    pub profile: Profile,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub message: &'static str,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_validation() {
        let ok = LoginRequest {
            email: "ana@tingo.test".into(),
            password: "secret1".into(),
        };
        assert!(ok.validate().is_ok());

        let short = LoginRequest {
            email: "ana@tingo.test".into(),
            password: "abc".into(),
        };
        assert!(short.validate().is_err());

        for email in ["ana", "@tingo.test", "ana@tingo", "ana@.test", "ana@tingo."] {
            let bad = LoginRequest {
                email: email.into(),
                password: "secret1".into(),
            };
            assert!(bad.validate().is_err(), "{email} should be rejected");
        }
    }

    #[test]
    fn register_requires_a_full_name() {
        let req = RegisterRequest {
            email: "ana@tingo.test".into(),
            password: "secret1".into(),
            full_name: " A ".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn audit_limit_bounds() {
        let q = AuditListQuery::default().into_query().unwrap();
        assert_eq!(q.limit(), 100);

        let q = AuditListQuery {
            limit: Some(1000),
            ..AuditListQuery::default()
        };
        assert_eq!(q.into_query().unwrap().limit(), 1000);

        for limit in [0, -3, 1001] {
            let q = AuditListQuery {
                limit: Some(limit),
                ..AuditListQuery::default()
            };
            assert!(q.into_query().is_err());
        }
    }

    #[test]
    fn blank_audit_filters_are_ignored() {
        let q = AuditListQuery {
            user_id: Some(SubjectId::new("")),
            table_name: Some("  ".into()),
            action: Some("LOGIN".into()),
            ..AuditListQuery::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(q.user_id, None);
        assert_eq!(q.table_name, None);
        assert_eq!(q.action.as_deref(), Some("LOGIN"));
    }

    #[test]
    fn public_query_hides_inactive_products() {
        let filter = PublicProductQuery {
            search: Some("cafe".into()),
            category_id: None,
        }
        .into_filter();
        assert!(filter.active_only);
        assert!(!filter.low_stock_only);
        assert_eq!(filter.search_term(), Some("cafe"));
    }

    #[test]
    fn user_with_role_flattens_profile() {
        let v = serde_json::to_value(UserWithRole {
            profile: Profile {
                id: SubjectId::new("u1"),
                email: Some("ana@tingo.test".into()),
                full_name: None,
                role_id: Some(RoleId::new("1")),
                created_at: None,
            },
            role: Some(Role::ADMIN),
        })
        .unwrap();
        assert_eq!(v["id"], "u1");
        assert_eq!(v["role"], "admin");
    }
}
