//! Ports onto the hosted backend: identity, directory, catalog, audit, objects.
//!
//! Every port has two adapters: [`crate::SupabaseBackend`] and
//! [`crate::InMemoryBackend`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tingo_auth::{Profile, Role};
use tingo_core::{ProductId, RoleId, SubjectId};
use tingo_products::{Category, NewProduct, Product, ProductFilter, ProductPatch};

use crate::audit::{AuditEntry, AuditQuery, AuditRecord};
use crate::BackendError;

pub type BackendResult<T> = Result<T, BackendError>;

/// Session returned by the identity provider after a password sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub user: ProviderUser,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: SubjectId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Role row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: Role,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<ProviderSession>;
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<ProviderUser>;
    /// Revoke a provider session, when the client still holds one.
    async fn sign_out(&self, provider_token: Option<&str>) -> BackendResult<()>;
    async fn recover_password(&self, email: &str) -> BackendResult<()>;
}

/// Profiles and roles, with the administrative operations on them.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_profile(&self, id: &SubjectId) -> BackendResult<Option<Profile>>;
    async fn create_profile(&self, profile: Profile) -> BackendResult<Profile>;
    async fn list_profiles(&self) -> BackendResult<Vec<Profile>>;
    /// `None` when the profile does not exist.
    async fn set_profile_role(
        &self,
        id: &SubjectId,
        role: &RoleId,
    ) -> BackendResult<Option<Profile>>;

    async fn list_roles(&self) -> BackendResult<Vec<RoleRecord>>;
    async fn find_role(&self, id: &RoleId) -> BackendResult<Option<RoleRecord>>;
    async fn find_role_by_name(&self, name: &Role) -> BackendResult<Option<RoleRecord>>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Matching products, newest first, each with its cover image.
    async fn list(&self, filter: &ProductFilter) -> BackendResult<Vec<Product>>;
    /// Detail view including every image URL.
    async fn get(&self, id: &ProductId) -> BackendResult<Option<Product>>;
    async fn insert(&self, input: NewProduct) -> BackendResult<Product>;
    async fn update(&self, id: &ProductId, patch: &ProductPatch) -> BackendResult<Option<Product>>;
    /// Soft delete; `false` when the product does not exist.
    async fn deactivate(&self, id: &ProductId) -> BackendResult<bool>;
    async fn add_image(&self, id: &ProductId, image_url: &str) -> BackendResult<()>;
    async fn list_categories(&self) -> BackendResult<Vec<Category>>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> BackendResult<()>;
    async fn query(&self, query: &AuditQuery) -> BackendResult<Vec<AuditRecord>>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()>;
    fn public_url(&self, key: &str) -> String;
}
