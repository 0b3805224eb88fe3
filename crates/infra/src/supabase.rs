//! Hosted backend adapter (PostgREST tables, GoTrue auth, object storage).
//!
//! One client is created at startup and shared; every request carries the
//! service key except the end-user auth calls, which use the anon key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use tingo_auth::{Profile, ProfileStore, Role, RoleStore, StoreError};
use tingo_core::{ProductId, RoleId, SubjectId};
use tingo_products::{Category, NewProduct, Product, ProductFilter, ProductPatch};

use crate::audit::{AuditEntry, AuditQuery, AuditRecord};
use crate::ports::{
    AuditLog, BackendResult, Directory, IdentityProvider, ObjectStore, ProductRepository,
    ProviderSession, ProviderUser, RoleRecord,
};
use crate::BackendError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BUCKET: &str = "productos";

const PRODUCT_SELECT: &str = "*,categories(name),product_images(image_url)";
const PROFILE_SELECT: &str = "id,email,full_name,role_id,created_at";

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub service_key: String,
    pub bucket: String,
    pub timeout: Duration,
}

impl SupabaseConfig {
    pub fn new(
        url: impl Into<String>,
        anon_key: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_key: service_key.into(),
            bucket: DEFAULT_BUCKET.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl core::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseBackend {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseBackend {
    pub fn new(config: SupabaseConfig) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::unavailable(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.url)
    }

    fn as_service(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    fn as_anon(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("apikey", &self.config.anon_key)
    }

    async fn check_status(resp: Response) -> BackendResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> BackendResult<Vec<T>> {
        let resp = self
            .as_service(self.http.get(self.table_url(table)))
            .query(query)
            .send()
            .await?;
        Ok(Self::check_status(resp).await?.json().await?)
    }

    async fn insert_rows<T, B>(&self, table: &str, body: &B) -> BackendResult<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let resp = self
            .as_service(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        Ok(Self::check_status(resp).await?.json().await?)
    }

    async fn insert_silent<B>(&self, table: &str, body: &B) -> BackendResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let resp = self
            .as_service(self.http.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn update_rows<T, B>(
        &self,
        table: &str,
        filter: &[(&str, String)],
        body: &B,
    ) -> BackendResult<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let resp = self
            .as_service(self.http.patch(self.table_url(table)))
            .query(filter)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        Ok(Self::check_status(resp).await?.json().await?)
    }
}

/// Map a non-2xx response to a backend error.
fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    if status == StatusCode::NOT_FOUND {
        BackendError::NotFound
    } else if status.is_client_error() {
        BackendError::rejected(status.as_u16(), message)
    } else {
        BackendError::unavailable(format!("HTTP {status}: {message}"))
    }
}

/// Pull a human-readable message out of a PostgREST/GoTrue/storage error body.
fn error_message(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(JsonValue::as_str))
        .map(str::to_string)
}

fn eq(value: impl core::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Drop characters with meaning in PostgREST logic trees.
fn sanitize_search(term: &str) -> String {
    term.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn search_expression(term: &str) -> String {
    let t = sanitize_search(term);
    format!("(name.ilike.*{t}*,description.ilike.*{t}*,Sku.ilike.*{t}*,brand.ilike.*{t}*)")
}

#[derive(Debug, Deserialize)]
struct NameRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    image_url: String,
}

/// Product row with its embedded category and images.
#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(flatten)]
    product: Product,
    #[serde(default)]
    categories: Option<NameRef>,
    #[serde(default)]
    product_images: Option<Vec<ImageRef>>,
}

impl ProductRow {
    fn into_product(self, include_all: bool) -> Product {
        let mut product = self.product;
        product.category = self.categories.map(|c| c.name);
        let images = self
            .product_images
            .unwrap_or_default()
            .into_iter()
            .map(|i| i.image_url)
            .collect();
        product.with_images(images, include_all)
    }
}

/// Column values for an insert: `image_url` lives in `product_images`, and
/// nulls are left to column defaults.
fn insert_body(input: &NewProduct) -> BackendResult<JsonValue> {
    let mut body = serde_json::to_value(input).map_err(|e| BackendError::decode(e.to_string()))?;
    if let Some(map) = body.as_object_mut() {
        map.remove("image_url");
        map.retain(|_, v| !v.is_null());
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: ProviderUser },
    User(ProviderUser),
}

#[async_trait]
impl IdentityProvider for SupabaseBackend {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<ProviderSession> {
        let resp = self
            .as_anon(self.http.post(self.auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::check_status(resp).await?.json().await?)
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<ProviderUser> {
        let resp = self
            .as_anon(self.http.post(self.auth_url("signup")))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: SignUpResponse = Self::check_status(resp).await?.json().await?;
        match body {
            SignUpResponse::Session { user } | SignUpResponse::User(user) => Ok(user),
        }
    }

    async fn sign_out(&self, provider_token: Option<&str>) -> BackendResult<()> {
        let Some(token) = provider_token else {
            return Ok(());
        };
        let resp = self
            .as_anon(self.http.post(self.auth_url("logout")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn recover_password(&self, email: &str) -> BackendResult<()> {
        let resp = self
            .as_anon(self.http.post(self.auth_url("recover")))
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl Directory for SupabaseBackend {
    async fn find_profile(&self, id: &SubjectId) -> BackendResult<Option<Profile>> {
        let rows: Vec<Profile> = self
            .select(
                "profiles",
                &[("select", PROFILE_SELECT.to_string()), ("id", eq(id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create_profile(&self, profile: Profile) -> BackendResult<Profile> {
        let rows: Vec<Profile> = self.insert_rows("profiles", &profile).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::decode("profile insert returned no row"))
    }

    async fn list_profiles(&self) -> BackendResult<Vec<Profile>> {
        self.select(
            "profiles",
            &[
                ("select", PROFILE_SELECT.to_string()),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn set_profile_role(
        &self,
        id: &SubjectId,
        role: &RoleId,
    ) -> BackendResult<Option<Profile>> {
        let rows: Vec<Profile> = self
            .update_rows(
                "profiles",
                &[("id", eq(id))],
                &json!({ "role_id": role }),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_roles(&self) -> BackendResult<Vec<RoleRecord>> {
        self.select(
            "roles",
            &[("select", "*".to_string()), ("order", "id.asc".to_string())],
        )
        .await
    }

    async fn find_role(&self, id: &RoleId) -> BackendResult<Option<RoleRecord>> {
        let rows: Vec<RoleRecord> = self
            .select("roles", &[("select", "*".to_string()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_role_by_name(&self, name: &Role) -> BackendResult<Option<RoleRecord>> {
        let rows: Vec<RoleRecord> = self
            .select("roles", &[("select", "*".to_string()), ("name", eq(name))])
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl ProductRepository for SupabaseBackend {
    async fn list(&self, filter: &ProductFilter) -> BackendResult<Vec<Product>> {
        let mut query = vec![
            ("select", PRODUCT_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if filter.active_only {
            query.push(("is_active", "eq.true".to_string()));
        }
        if let Some(category) = &filter.category_id {
            query.push(("category_id", eq(category)));
        }
        if let Some(term) = filter.search_term() {
            query.push(("or", search_expression(term)));
        }

        let rows: Vec<ProductRow> = self.select("products", &query).await?;

        // Column-to-column comparison is not expressible as a query filter.
        let local = ProductFilter {
            low_stock_only: filter.low_stock_only,
            ..ProductFilter::default()
        };
        Ok(local.apply(rows.into_iter().map(|r| r.into_product(false))))
    }

    async fn get(&self, id: &ProductId) -> BackendResult<Option<Product>> {
        let rows: Vec<ProductRow> = self
            .select(
                "products",
                &[("select", PRODUCT_SELECT.to_string()), ("id", eq(id))],
            )
            .await?;
        Ok(rows.into_iter().next().map(|r| r.into_product(true)))
    }

    async fn insert(&self, input: NewProduct) -> BackendResult<Product> {
        let body = insert_body(&input)?;
        let rows: Vec<Product> = self.insert_rows("products", &body).await?;
        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::decode("product insert returned no row"))?;

        if let Some(url) = &input.image_url {
            if let Err(e) = self.add_image(&created.id, url).await {
                tracing::warn!(product_id = %created.id, error = %e, "failed to attach product image");
            }
        }

        Ok(self.get(&created.id).await?.unwrap_or(created))
    }

    async fn update(&self, id: &ProductId, patch: &ProductPatch) -> BackendResult<Option<Product>> {
        let rows: Vec<JsonValue> = self
            .update_rows("products", &[("id", eq(id))], patch)
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        if let Some(url) = &patch.image_url {
            if let Err(e) = self.add_image(id, url).await {
                tracing::warn!(product_id = %id, error = %e, "failed to attach product image");
            }
        }

        self.get(id).await
    }

    async fn deactivate(&self, id: &ProductId) -> BackendResult<bool> {
        let rows: Vec<JsonValue> = self
            .update_rows(
                "products",
                &[("id", eq(id))],
                &json!({ "is_active": false }),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn add_image(&self, id: &ProductId, image_url: &str) -> BackendResult<()> {
        self.insert_silent(
            "product_images",
            &json!({ "product_id": id, "image_url": image_url }),
        )
        .await
    }

    async fn list_categories(&self) -> BackendResult<Vec<Category>> {
        self.select(
            "categories",
            &[("select", "*".to_string()), ("order", "name.asc".to_string())],
        )
        .await
    }
}

#[async_trait]
impl AuditLog for SupabaseBackend {
    async fn record(&self, entry: AuditEntry) -> BackendResult<()> {
        self.insert_silent("audit_logs", &entry).await
    }

    async fn query(&self, query: &AuditQuery) -> BackendResult<Vec<AuditRecord>> {
        let mut params = vec![
            ("select", "*,profiles(email,full_name)".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", query.limit().to_string()),
        ];
        if let Some(user) = &query.user_id {
            params.push(("profile_id", eq(user)));
        }
        if let Some(table) = &query.table_name {
            params.push(("table_name", eq(table)));
        }
        if let Some(action) = &query.action {
            params.push(("action", eq(action)));
        }
        self.select("audit_logs", &params).await
    }
}

#[async_trait]
impl ObjectStore for SupabaseBackend {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()> {
        let url = format!(
            "{}/storage/v1/object/{}/{key}",
            self.config.url, self.config.bucket
        );
        let resp = self
            .as_service(self.http.post(url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{key}",
            self.config.url, self.config.bucket
        )
    }
}

#[async_trait]
impl ProfileStore for SupabaseBackend {
    async fn get_profile(&self, id: &SubjectId) -> Result<Option<Profile>, StoreError> {
        Ok(self.find_profile(id).await?)
    }
}

#[async_trait]
impl RoleStore for SupabaseBackend {
    async fn get_role_name(&self, id: &RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.find_role(id).await?.map(|r| r.name))
    }
}
