//! Audit trail records.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use tingo_core::{AuditLogId, SubjectId};

pub const DEFAULT_AUDIT_LIMIT: usize = 100;
pub const MAX_AUDIT_LIMIT: usize = 1000;

/// Table an audit `resource` is recorded under. Unknown resources map to themselves.
pub fn table_for_resource(resource: &str) -> &str {
    match resource {
        "product" => "products",
        "user" => "profiles",
        "auth" => "auth",
        "product_image" => "product_images",
        other => other,
    }
}

/// New audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub profile_id: SubjectId,
    pub action: String,
    pub table_name: String,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
    pub created_at: String,
}

impl AuditEntry {
    pub fn new(
        profile_id: SubjectId,
        action: impl Into<String>,
        resource: &str,
        record_id: Option<String>,
        created_at: String,
    ) -> Self {
        Self {
            profile_id,
            action: action.into(),
            table_name: table_for_resource(resource).to_string(),
            record_id,
            details: None,
            created_at,
        }
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}

/// Author summary joined onto listed entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAuthor {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Stored audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditLogId,
    #[serde(flatten)]
    pub entry: AuditEntry,
    #[serde(default)]
    pub profiles: Option<AuditAuthor>,
}

/// Listing filter; newest entries first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    pub user_id: Option<SubjectId>,
    pub table_name: Option<String>,
    pub action: Option<String>,
    limit: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            table_name: None,
            action: None,
            limit: DEFAULT_AUDIT_LIMIT,
        }
    }
}

impl AuditQuery {
    /// Set the page size, clamped to `1..=MAX_AUDIT_LIMIT`.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_AUDIT_LIMIT);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.user_id.as_ref().is_none_or(|u| &entry.profile_id == u)
            && self.table_name.as_ref().is_none_or(|t| &entry.table_name == t)
            && self.action.as_ref().is_none_or(|a| &entry.action == a)
    }
}
