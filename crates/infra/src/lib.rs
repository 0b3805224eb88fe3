//! Infrastructure layer: adapters onto the hosted backend-as-a-service.

pub mod audit;
pub mod error;
pub mod memory;
pub mod ports;
pub mod supabase;

pub use audit::{table_for_resource, AuditEntry, AuditQuery, AuditRecord};
pub use error::BackendError;
pub use memory::InMemoryBackend;
pub use ports::{
    AuditLog, BackendResult, Directory, IdentityProvider, ObjectStore, ProductRepository,
    ProviderSession, ProviderUser, RoleRecord,
};
pub use supabase::{SupabaseBackend, SupabaseConfig};
