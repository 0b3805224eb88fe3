//! Authorization gate: decides, per request, whether the caller may proceed.
//!
//! Per-request flow:
//!
//! - no credential → `MissingCredential`
//! - credential → codec verify → `Token(..)` on failure
//! - verified → profile lookup → `ProfileNotFound` / `StoreUnavailable`
//! - (authorize only) profile role → role lookup → admit / `InsufficientRole` / `StoreUnavailable`
//!
//! Every outcome is terminal for the request; nothing here retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use tingo_core::RoleId;

use crate::store::{Profile, ProfileStore, RoleStore, StoreError};
use crate::{role_satisfies, Identity, Role, RoleClaim, TokenCodec, TokenError};

/// Upper bound for one store lookup made by the gate.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer credential")]
    MissingCredential,

    #[error("invalid token: {0}")]
    Token(#[from] TokenError),

    #[error("no profile exists for the token subject")]
    ProfileNotFound,

    #[error("forbidden: role '{required}' required")]
    InsufficientRole { required: Role },

    #[error("authorization unavailable: {0}")]
    StoreUnavailable(StoreError),
}

/// How a rejected request should be answered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No usable identity: re-authenticate.
    Unauthenticated,
    /// Valid identity lacking the required role.
    Forbidden,
    /// The decision could not be made.
    Unavailable,
}

impl AuthError {
    pub fn rejection(&self) -> Rejection {
        match self {
            AuthError::MissingCredential | AuthError::Token(_) | AuthError::ProfileNotFound => {
                Rejection::Unauthenticated
            }
            AuthError::InsufficientRole { .. } => Rejection::Forbidden,
            AuthError::StoreUnavailable(_) => Rejection::Unavailable,
        }
    }

    /// Only transient store failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable(_))
    }
}

/// Token + profile based gate over a profile store and a role store.
#[derive(Debug, Clone)]
pub struct Gate<P, R> {
    codec: Arc<TokenCodec>,
    profiles: P,
    roles: R,
    lookup_timeout: Duration,
}

impl<P, R> Gate<P, R>
where
    P: ProfileStore,
    R: RoleStore,
{
    pub fn new(codec: Arc<TokenCodec>, profiles: P, roles: R) -> Self {
        Self {
            codec,
            profiles,
            roles,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolve the caller behind `credential`.
    ///
    /// A valid token is not enough: the subject's profile must still exist.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let claims = self.codec.verify(token).map_err(|e| {
            tracing::debug!(reason = %e, "token rejected");
            AuthError::Token(e)
        })?;

        let profile = self
            .bounded(self.profiles.get_profile(&claims.sub))
            .await?
            .ok_or_else(|| {
                tracing::info!(subject = %claims.sub, "valid token for unknown profile");
                AuthError::ProfileNotFound
            })?;

        Ok(Identity::new(claims, profile))
    }

    /// Authenticate, then require `required` (or `admin`) on the caller's profile.
    pub async fn authorize(
        &self,
        credential: Option<&str>,
        required: &Role,
    ) -> Result<Identity, AuthError> {
        let mut identity = self.authenticate(credential).await?;
        let held = self.resolve_roles(&identity.profile).await?;

        if !role_satisfies(&held, required) {
            tracing::info!(
                subject = %identity.subject,
                required = %required,
                held = ?held,
                "insufficient role"
            );
            return Err(AuthError::InsufficientRole {
                required: required.clone(),
            });
        }

        identity.role = held.into_iter().next();
        Ok(identity)
    }

    /// Identity if the credential is fully valid, otherwise `None`.
    pub async fn optional_identity(&self, credential: Option<&str>) -> Option<Identity> {
        self.authenticate(credential).await.ok()
    }

    /// Role names held by `profile` (empty when no role is assigned).
    pub async fn resolve_roles(&self, profile: &Profile) -> Result<Vec<Role>, AuthError> {
        let Some(role_id) = profile.role_id.as_ref() else {
            return Ok(Vec::new());
        };
        let role = self.bounded(self.roles.get_role_name(role_id)).await?;
        Ok(role.into_iter().collect())
    }

    /// Role name for a token role claim, resolving numeric ids through the role store.
    pub async fn resolve_claim(&self, claim: &RoleClaim) -> Result<Option<Role>, AuthError> {
        match claim {
            RoleClaim::Name(role) => Ok(Some(role.clone())),
            RoleClaim::Id(id) => self.bounded(self.roles.get_role_name(&RoleId::from(*id))).await,
        }
    }

    async fn bounded<T, F>(&self, lookup: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "authorization store lookup failed");
                Err(AuthError::StoreUnavailable(e))
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.lookup_timeout, "authorization store lookup timed out");
                Err(AuthError::StoreUnavailable(StoreError::Timeout(self.lookup_timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use tingo_core::{RoleId, SubjectId};

    use super::*;
    use crate::TokenGrant;

    const SECRET: &[u8] = b"gate-secret";

    #[derive(Default)]
    struct FakeStore {
        profiles: HashMap<SubjectId, Profile>,
        roles: HashMap<RoleId, Role>,
        fail_profiles: bool,
        fail_roles: bool,
        slow: bool,
        role_lookups: AtomicUsize,
    }

    impl FakeStore {
        fn with_user(mut self, id: &str, role: Option<(&str, Role)>) -> Self {
            let role_id = role.map(|(rid, name)| {
                let rid = RoleId::new(rid);
                self.roles.insert(rid.clone(), name);
                rid
            });
            self.profiles.insert(
                SubjectId::new(id),
                Profile {
                    id: SubjectId::new(id),
                    email: Some(format!("{id}@example.com")),
                    full_name: Some("Test User".to_string()),
                    role_id,
                    created_at: None,
                },
            );
            self
        }
    }

    #[async_trait]
    impl ProfileStore for FakeStore {
        async fn get_profile(&self, id: &SubjectId) -> Result<Option<Profile>, StoreError> {
            if self.slow {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
            if self.fail_profiles {
                return Err(StoreError::unavailable("connection refused"));
            }
            Ok(self.profiles.get(id).cloned())
        }
    }

    #[async_trait]
    impl RoleStore for FakeStore {
        async fn get_role_name(&self, id: &RoleId) -> Result<Option<Role>, StoreError> {
            self.role_lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail_roles {
                return Err(StoreError::unavailable("connection reset"));
            }
            Ok(self.roles.get(id).cloned())
        }
    }

    fn gate(store: FakeStore) -> Gate<Arc<FakeStore>, Arc<FakeStore>> {
        let store = Arc::new(store);
        Gate::new(Arc::new(TokenCodec::new(SECRET)), store.clone(), store)
    }

    fn token_for(subject: &str, role: Role) -> String {
        TokenCodec::new(SECRET)
            .issue(TokenGrant {
                subject: SubjectId::new(subject),
                email: None,
                role: RoleClaim::Name(role),
            })
            .unwrap()
            .token
    }

    #[tokio::test]
    async fn missing_or_blank_credential_is_unauthenticated() {
        let g = gate(FakeStore::default());

        for cred in [None, Some(""), Some("   ")] {
            let err = g.authenticate(cred).await.unwrap_err();
            assert_eq!(err, AuthError::MissingCredential);
            assert_eq!(err.rejection(), Rejection::Unauthenticated);
        }
    }

    #[tokio::test]
    async fn authenticate_attaches_profile() {
        let g = gate(FakeStore::default().with_user("u1", Some(("2", Role::DEFAULT))));
        let token = token_for("u1", Role::DEFAULT);

        let identity = g.authenticate(Some(&token)).await.unwrap();
        assert_eq!(identity.subject.as_str(), "u1");
        assert_eq!(identity.profile.role_id, Some(RoleId::new("2")));
        assert_eq!(identity.email.as_deref(), Some("u1@example.com"));
        assert_eq!(identity.role, None);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_signature_and_unauthenticated() {
        let g = gate(FakeStore::default().with_user("u1", Some(("1", Role::ADMIN))));
        let forged = TokenCodec::new(b"wrong")
            .issue(TokenGrant {
                subject: SubjectId::new("u1"),
                email: None,
                role: RoleClaim::Name(Role::ADMIN),
            })
            .unwrap()
            .token;

        let err = g.authorize(Some(&forged), &Role::DEFAULT).await.unwrap_err();
        assert_eq!(err, AuthError::Token(TokenError::InvalidSignature));
        assert_eq!(err.rejection(), Rejection::Unauthenticated);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let g = gate(FakeStore::default().with_user("u1", Some(("2", Role::DEFAULT))));
        let expired = TokenCodec::new(SECRET)
            .issue_at(
                TokenGrant {
                    subject: SubjectId::new("u1"),
                    email: None,
                    role: RoleClaim::Name(Role::DEFAULT),
                },
                Utc::now() - ChronoDuration::hours(25),
            )
            .unwrap()
            .token;

        let err = g.authenticate(Some(&expired)).await.unwrap_err();
        assert_eq!(err, AuthError::Token(TokenError::Expired));
    }

    #[tokio::test]
    async fn unknown_profile_is_unauthenticated_despite_valid_token() {
        let g = gate(FakeStore::default());
        let token = token_for("ghost", Role::ADMIN);

        let err = g.authorize(Some(&token), &Role::DEFAULT).await.unwrap_err();
        assert_eq!(err, AuthError::ProfileNotFound);
        assert_eq!(err.rejection(), Rejection::Unauthenticated);
    }

    #[tokio::test]
    async fn admin_is_admitted_for_any_role() {
        let g = gate(FakeStore::default().with_user("boss", Some(("1", Role::ADMIN))));
        let token = token_for("boss", Role::ADMIN);

        for required in [Role::DEFAULT, Role::new("auditor"), Role::ADMIN] {
            let identity = g.authorize(Some(&token), &required).await.unwrap();
            assert_eq!(identity.role, Some(Role::ADMIN));
            assert!(identity.is_admin());
        }
    }

    #[tokio::test]
    async fn non_admin_is_forbidden_from_admin_routes() {
        let g = gate(FakeStore::default().with_user("u1", Some(("2", Role::DEFAULT))));
        let token = token_for("u1", Role::DEFAULT);

        let err = g.authorize(Some(&token), &Role::ADMIN).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::InsufficientRole {
                required: Role::ADMIN
            }
        );
        assert_eq!(err.rejection(), Rejection::Forbidden);

        let identity = g.authorize(Some(&token), &Role::DEFAULT).await.unwrap();
        assert_eq!(identity.role, Some(Role::DEFAULT));
    }

    #[tokio::test]
    async fn role_comes_from_profile_not_from_token() {
        // Token still says admin, but the profile was demoted.
        let g = gate(FakeStore::default().with_user("u1", Some(("2", Role::DEFAULT))));
        let stale = token_for("u1", Role::ADMIN);

        let err = g.authorize(Some(&stale), &Role::ADMIN).await.unwrap_err();
        assert!(matches!(err, AuthError::InsufficientRole { .. }));
    }

    #[tokio::test]
    async fn profile_without_role_is_forbidden() {
        let store = FakeStore::default().with_user("u1", None);
        let g = gate(store);
        let token = token_for("u1", Role::DEFAULT);

        let err = g.authorize(Some(&token), &Role::DEFAULT).await.unwrap_err();
        assert_eq!(err.rejection(), Rejection::Forbidden);
    }

    #[tokio::test]
    async fn role_store_failure_is_unavailable_not_permissive() {
        let mut store = FakeStore::default().with_user("u1", Some(("1", Role::ADMIN)));
        store.fail_roles = true;
        let g = gate(store);
        let token = token_for("u1", Role::ADMIN);

        let err = g.authorize(Some(&token), &Role::DEFAULT).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(StoreError::Unavailable(_))));
        assert_eq!(err.rejection(), Rejection::Unavailable);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn profile_store_failure_is_unavailable() {
        let mut store = FakeStore::default().with_user("u1", Some(("1", Role::ADMIN)));
        store.fail_profiles = true;
        let g = gate(store);
        let token = token_for("u1", Role::ADMIN);

        let err = g.authenticate(Some(&token)).await.unwrap_err();
        assert_eq!(err.rejection(), Rejection::Unavailable);
    }

    #[tokio::test]
    async fn slow_store_times_out_as_unavailable() {
        let mut store = FakeStore::default().with_user("u1", Some(("1", Role::ADMIN)));
        store.slow = true;
        let g = gate(store).with_lookup_timeout(std::time::Duration::from_millis(20));
        let token = token_for("u1", Role::ADMIN);

        let err = g.authenticate(Some(&token)).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::StoreUnavailable(StoreError::Timeout(std::time::Duration::from_millis(20)))
        );
    }

    #[tokio::test]
    async fn invalid_token_never_touches_the_role_store() {
        let store = Arc::new(FakeStore::default().with_user("u1", Some(("1", Role::ADMIN))));
        let g = Gate::new(Arc::new(TokenCodec::new(SECRET)), store.clone(), store.clone());

        let _ = g.authorize(Some("not.a.token"), &Role::ADMIN).await;
        assert_eq!(store.role_lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn optional_identity_swallows_failures() {
        let g = gate(FakeStore::default().with_user("u1", Some(("2", Role::DEFAULT))));

        assert!(g.optional_identity(None).await.is_none());
        assert!(g.optional_identity(Some("garbage")).await.is_none());
        assert!(g.optional_identity(Some(&token_for("ghost", Role::DEFAULT))).await.is_none());

        let identity = g.optional_identity(Some(&token_for("u1", Role::DEFAULT))).await;
        assert_eq!(identity.unwrap().subject.as_str(), "u1");
    }

    #[tokio::test]
    async fn numeric_role_claims_resolve_through_role_store() {
        let g = gate(FakeStore::default().with_user("u1", Some(("7", Role::new("vendedor")))));

        let role = g.resolve_claim(&RoleClaim::Id(7)).await.unwrap();
        assert_eq!(role, Some(Role::new("vendedor")));
        assert_eq!(g.resolve_claim(&RoleClaim::Id(99)).await.unwrap(), None);
    }
}
