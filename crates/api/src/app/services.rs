//! Backend wiring: one create-once backend handle shared by every component.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde_json::Value as JsonValue;

use tingo_auth::{Gate, ProfileStore, Role, RoleStore, TokenCodec};
use tingo_core::SubjectId;
use tingo_infra::{
    AuditEntry, AuditLog, BackendResult, Directory, IdentityProvider,
    InMemoryBackend, ObjectStore, ProductRepository, SupabaseBackend,
};

use crate::config::{AppConfig, BackendSettings};

/// Gate over type-erased backend stores.
pub type ApiGate = Gate<Arc<dyn ProfileStore>, Arc<dyn RoleStore>>;

pub struct AppServices {
    pub codec: Arc<TokenCodec>,
    pub gate: Arc<ApiGate>,
    pub identity: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn Directory>,
    pub products: Arc<dyn ProductRepository>,
    pub audit: Arc<dyn AuditLog>,
    pub objects: Arc<dyn ObjectStore>,
}

impl AppServices {
    /// Wire every port to the same backend.
    pub fn from_backend<B>(backend: Arc<B>, codec: Arc<TokenCodec>, lookup_timeout: Duration) -> Self
    where
        B: IdentityProvider
            + Directory
            + ProductRepository
            + AuditLog
            + ObjectStore
            + ProfileStore
            + RoleStore
            + 'static,
    {
        let profiles: Arc<dyn ProfileStore> = backend.clone();
        let roles: Arc<dyn RoleStore> = backend.clone();
        let gate = Gate::new(codec.clone(), profiles, roles).with_lookup_timeout(lookup_timeout);

        Self {
            codec,
            gate: Arc::new(gate),
            identity: backend.clone(),
            directory: backend.clone(),
            products: backend.clone(),
            audit: backend.clone(),
            objects: backend,
        }
    }

    /// Append to the audit trail. Failures are logged and never surface to the caller.
    pub async fn record_audit(
        &self,
        actor: &SubjectId,
        action: &str,
        resource: &str,
        record_id: Option<String>,
        details: Option<JsonValue>,
    ) {
        let mut entry = AuditEntry::new(actor.clone(), action, resource, record_id, now());
        if let Some(details) = details {
            entry = entry.with_details(details);
        }

        if let Err(e) = self.audit.record(entry).await {
            tracing::warn!(
                error = %e,
                actor = %actor,
                action,
                resource,
                "failed to record audit entry"
            );
        }
    }
}

/// Build services for the configured backend.
pub async fn build_services(config: &AppConfig) -> BackendResult<AppServices> {
    let codec = Arc::new(
        TokenCodec::new(config.jwt_secret.as_bytes())
            .with_validity(config.token_validity),
    );

    match &config.backend {
        BackendSettings::Supabase(supabase) => {
            tracing::info!(url = %supabase.url, bucket = %supabase.bucket, "using supabase backend");
            let backend = Arc::new(SupabaseBackend::new(supabase.clone())?);
            Ok(AppServices::from_backend(backend, codec, config.lookup_timeout))
        }
        BackendSettings::InMemory { seed_admin } => {
            tracing::warn!("SUPABASE_URL not set; using in-memory backend (data is lost on restart)");
            let backend = Arc::new(InMemoryBackend::new());
            if let Some(admin) = seed_admin {
                let id = backend.seed_account(&admin.email, &admin.password, "Administrator", &Role::ADMIN)?;
                tracing::info!(subject = %id, email = %admin.email, "seeded admin account");
            }
            Ok(AppServices::from_backend(backend, codec, config.lookup_timeout))
        }
    }
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
