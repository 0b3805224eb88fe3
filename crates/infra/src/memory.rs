//! In-memory backend for development and tests.
//!
//! Mirrors the hosted backend's observable behavior closely enough for the API
//! to run without network access. Passwords are kept in plain text: this
//! adapter must never hold real credentials.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use tingo_auth::{Profile, ProfileStore, Role, RoleStore, StoreError};
use tingo_core::{AuditLogId, CategoryId, ProductId, RoleId, SubjectId};
use tingo_products::{Category, NewProduct, Product, ProductFilter, ProductPatch};

use crate::audit::{AuditAuthor, AuditEntry, AuditQuery, AuditRecord};
use crate::ports::{
    AuditLog, BackendResult, Directory, IdentityProvider, ObjectStore, ProductRepository,
    ProviderSession, ProviderUser, RoleRecord,
};
use crate::BackendError;

const DEFAULT_PUBLIC_BASE: &str = "memory://productos";

#[derive(Debug, Clone)]
struct Account {
    subject: SubjectId,
    password: String,
}

/// Stored object (upload body + declared content type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, Account>,
    profiles: HashMap<SubjectId, Profile>,
    roles: BTreeMap<RoleId, RoleRecord>,
    products: HashMap<ProductId, Product>,
    images: HashMap<ProductId, Vec<String>>,
    categories: Vec<Category>,
    audit: Vec<AuditRecord>,
    objects: HashMap<String, StoredObject>,
    next_category: i64,
}

#[derive(Debug)]
pub struct InMemoryBackend {
    state: RwLock<State>,
    offline: AtomicBool,
    public_base: String,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Empty backend seeded with the `admin` (id 1) and `usuario` (id 2) roles.
    pub fn new() -> Self {
        let mut state = State::default();
        for (id, name, description) in [
            ("1", Role::ADMIN, "Full access"),
            ("2", Role::DEFAULT, "Standard account"),
        ] {
            let id = RoleId::new(id);
            state.roles.insert(
                id.clone(),
                RoleRecord {
                    id,
                    name,
                    description: Some(description.to_string()),
                    created_at: Some(now()),
                },
            );
        }

        Self {
            state: RwLock::new(state),
            offline: AtomicBool::new(false),
            public_base: DEFAULT_PUBLIC_BASE.to_string(),
        }
    }

    pub fn with_public_base(mut self, base: impl Into<String>) -> Self {
        self.public_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Simulate an outage: every operation fails with `Unavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Create an account plus profile holding `role`.
    pub fn seed_account(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: &Role,
    ) -> BackendResult<SubjectId> {
        let mut state = self.write()?;
        let role_id = state
            .roles
            .values()
            .find(|r| &r.name == role)
            .map(|r| r.id.clone());
        let subject = insert_account(&mut state, email, password)?;
        state.profiles.insert(
            subject.clone(),
            Profile {
                id: subject.clone(),
                email: Some(email.to_string()),
                full_name: Some(full_name.to_string()),
                role_id,
                created_at: Some(now()),
            },
        );
        Ok(subject)
    }

    pub fn seed_category(&self, name: &str) -> BackendResult<CategoryId> {
        let mut state = self.write()?;
        state.next_category += 1;
        let id = CategoryId::from(state.next_category);
        state.categories.push(Category {
            id: id.clone(),
            name: name.to_string(),
            description: None,
        });
        Ok(id)
    }

    /// Remove a profile while keeping its account (a deleted user).
    pub fn remove_profile(&self, id: &SubjectId) -> BackendResult<Option<Profile>> {
        Ok(self.write()?.profiles.remove(id))
    }

    pub fn object(&self, key: &str) -> BackendResult<Option<StoredObject>> {
        Ok(self.read()?.objects.get(key).cloned())
    }

    fn ensure_online(&self) -> BackendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::unavailable("in-memory backend is offline"));
        }
        Ok(())
    }

    fn read(&self) -> BackendResult<RwLockReadGuard<'_, State>> {
        self.ensure_online()?;
        self.state
            .read()
            .map_err(|_| BackendError::unavailable("state lock poisoned"))
    }

    fn write(&self) -> BackendResult<RwLockWriteGuard<'_, State>> {
        self.ensure_online()?;
        self.state
            .write()
            .map_err(|_| BackendError::unavailable("state lock poisoned"))
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn insert_account(state: &mut State, email: &str, password: &str) -> BackendResult<SubjectId> {
    let key = email.trim().to_lowercase();
    if state.accounts.contains_key(&key) {
        return Err(BackendError::rejected(422, "user already registered"));
    }
    let subject = SubjectId::new(Uuid::now_v7().to_string());
    state.accounts.insert(
        key,
        Account {
            subject: subject.clone(),
            password: password.to_string(),
        },
    );
    Ok(subject)
}

fn decorate(state: &State, product: &Product, include_all: bool) -> Product {
    let mut out = product.clone();
    out.category = out
        .category_id
        .as_ref()
        .and_then(|cid| state.categories.iter().find(|c| &c.id == cid))
        .map(|c| c.name.clone());
    let images = state.images.get(&out.id).cloned().unwrap_or_default();
    out.with_images(images, include_all)
}

#[async_trait]
impl IdentityProvider for InMemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<ProviderSession> {
        let state = self.read()?;
        let account = state
            .accounts
            .get(&email.trim().to_lowercase())
            .filter(|a| a.password == password)
            .ok_or_else(|| BackendError::rejected(400, "invalid login credentials"))?;

        Ok(ProviderSession {
            user: ProviderUser {
                id: account.subject.clone(),
                email: Some(email.trim().to_string()),
            },
            access_token: Some(Uuid::new_v4().to_string()),
            refresh_token: Some(Uuid::new_v4().to_string()),
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<ProviderUser> {
        let mut state = self.write()?;
        let subject = insert_account(&mut state, email, password)?;
        Ok(ProviderUser {
            id: subject,
            email: Some(email.trim().to_string()),
        })
    }

    async fn sign_out(&self, _provider_token: Option<&str>) -> BackendResult<()> {
        self.ensure_online()
    }

    async fn recover_password(&self, email: &str) -> BackendResult<()> {
        self.ensure_online()?;
        tracing::debug!(email, "password recovery requested (in-memory: no mail sent)");
        Ok(())
    }
}

#[async_trait]
impl Directory for InMemoryBackend {
    async fn find_profile(&self, id: &SubjectId) -> BackendResult<Option<Profile>> {
        Ok(self.read()?.profiles.get(id).cloned())
    }

    async fn create_profile(&self, profile: Profile) -> BackendResult<Profile> {
        let mut state = self.write()?;
        if state.profiles.contains_key(&profile.id) {
            return Err(BackendError::rejected(409, "profile already exists"));
        }
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn list_profiles(&self) -> BackendResult<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self.read()?.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(profiles)
    }

    async fn set_profile_role(
        &self,
        id: &SubjectId,
        role: &RoleId,
    ) -> BackendResult<Option<Profile>> {
        let mut state = self.write()?;
        Ok(state.profiles.get_mut(id).map(|p| {
            p.role_id = Some(role.clone());
            p.clone()
        }))
    }

    async fn list_roles(&self) -> BackendResult<Vec<RoleRecord>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    async fn find_role(&self, id: &RoleId) -> BackendResult<Option<RoleRecord>> {
        Ok(self.read()?.roles.get(id).cloned())
    }

    async fn find_role_by_name(&self, name: &Role) -> BackendResult<Option<RoleRecord>> {
        Ok(self.read()?.roles.values().find(|r| &r.name == name).cloned())
    }
}

#[async_trait]
impl ProductRepository for InMemoryBackend {
    async fn list(&self, filter: &ProductFilter) -> BackendResult<Vec<Product>> {
        let state = self.read()?;
        let decorated = state.products.values().map(|p| decorate(&state, p, false));
        Ok(filter.apply(decorated))
    }

    async fn get(&self, id: &ProductId) -> BackendResult<Option<Product>> {
        let state = self.read()?;
        Ok(state.products.get(id).map(|p| decorate(&state, p, true)))
    }

    async fn insert(&self, mut input: NewProduct) -> BackendResult<Product> {
        let image = input.image_url.take();
        let id = ProductId::new(Uuid::now_v7().to_string());
        let product = Product::create(id.clone(), input, Utc::now())
            .map_err(|e| BackendError::rejected(400, e.to_string()))?;

        let mut state = self.write()?;
        state.products.insert(id.clone(), product);
        if let Some(url) = image {
            state.images.entry(id.clone()).or_default().push(url);
        }
        let stored = &state.products[&id];
        Ok(decorate(&state, stored, true))
    }

    async fn update(&self, id: &ProductId, patch: &ProductPatch) -> BackendResult<Option<Product>> {
        let mut state = self.write()?;
        let Some(product) = state.products.get_mut(id) else {
            return Ok(None);
        };
        product
            .apply_patch(patch, Utc::now())
            .map_err(|e| BackendError::rejected(400, e.to_string()))?;
        if let Some(url) = &patch.image_url {
            state.images.entry(id.clone()).or_default().push(url.clone());
        }
        Ok(state.products.get(id).map(|p| decorate(&state, p, true)))
    }

    async fn deactivate(&self, id: &ProductId) -> BackendResult<bool> {
        let mut state = self.write()?;
        Ok(state
            .products
            .get_mut(id)
            .map(|p| p.deactivate(Utc::now()))
            .is_some())
    }

    async fn add_image(&self, id: &ProductId, image_url: &str) -> BackendResult<()> {
        let mut state = self.write()?;
        if !state.products.contains_key(id) {
            return Err(BackendError::NotFound);
        }
        state
            .images
            .entry(id.clone())
            .or_default()
            .push(image_url.to_string());
        Ok(())
    }

    async fn list_categories(&self) -> BackendResult<Vec<Category>> {
        let mut categories = self.read()?.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[async_trait]
impl AuditLog for InMemoryBackend {
    async fn record(&self, entry: AuditEntry) -> BackendResult<()> {
        let mut state = self.write()?;
        let id = AuditLogId::from(state.audit.len() as i64 + 1);
        state.audit.push(AuditRecord {
            id,
            entry,
            profiles: None,
        });
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> BackendResult<Vec<AuditRecord>> {
        let state = self.read()?;
        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|r| query.matches(&r.entry))
            .take(query.limit())
            .map(|r| {
                let mut r = r.clone();
                r.profiles = state.profiles.get(&r.entry.profile_id).map(|p| AuditAuthor {
                    email: p.email.clone(),
                    full_name: p.full_name.clone(),
                });
                r
            })
            .collect())
    }
}

#[async_trait]
impl ObjectStore for InMemoryBackend {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()> {
        let mut state = self.write()?;
        if state.objects.contains_key(key) {
            return Err(BackendError::rejected(409, "object already exists"));
        }
        state.objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }
}

#[async_trait]
impl ProfileStore for InMemoryBackend {
    async fn get_profile(&self, id: &SubjectId) -> Result<Option<Profile>, StoreError> {
        Ok(self.find_profile(id).await?)
    }
}

#[async_trait]
impl RoleStore for InMemoryBackend {
    async fn get_role_name(&self, id: &RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.find_role(id).await?.map(|r| r.name))
    }
}
