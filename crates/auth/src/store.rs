//! Store ports the gate reads identities and roles through.
//!
//! The gate only ever reads; implementations live in infrastructure crates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tingo_core::{RoleId, SubjectId};

use crate::Role;

/// Externally stored record associating a subject with application attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: SubjectId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Single role reference; `None` means no role is assigned.
    #[serde(default)]
    pub role_id: Option<RoleId>,
    /// Creation timestamp as reported by the backend.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Transient failure of a backing store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store lookup timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: &SubjectId) -> Result<Option<Profile>, StoreError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get_role_name(&self, id: &RoleId) -> Result<Option<Role>, StoreError>;
}

#[async_trait]
impl<S> ProfileStore for Arc<S>
where
    S: ProfileStore + ?Sized,
{
    async fn get_profile(&self, id: &SubjectId) -> Result<Option<Profile>, StoreError> {
        (**self).get_profile(id).await
    }
}

#[async_trait]
impl<S> RoleStore for Arc<S>
where
    S: RoleStore + ?Sized,
{
    async fn get_role_name(&self, id: &RoleId) -> Result<Option<Role>, StoreError> {
        (**self).get_role_name(id).await
    }
}
