//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are minted by the hosted backend, not by this service. Depending
//! on the table they arrive as UUID strings or as integer keys, so every id is
//! kept as an opaque string and accepts either JSON representation on input.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainError;

/// Identifier of an authenticated subject (auth user / profile row).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubjectId(String);

/// Identifier of a product row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

/// Identifier of a role row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoleId(String);

/// Identifier of a product category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryId(String);

/// Identifier of an audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AuditLogId(String);

/// Raw wire form of an identifier (string or integer key).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap an identifier. Blank values are rejected by `FromStr`, not here.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value.to_string())
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty identifier", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl<'de> Deserialize<'de> for $t {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                match RawId::deserialize(deserializer)? {
                    RawId::Text(s) => Ok(Self(s)),
                    RawId::Int(n) => Ok(Self(n.to_string())),
                }
            }
        }
    };
}

impl_string_newtype!(SubjectId, "SubjectId");
impl_string_newtype!(ProductId, "ProductId");
impl_string_newtype!(RoleId, "RoleId");
impl_string_newtype!(CategoryId, "CategoryId");
impl_string_newtype!(AuditLogId, "AuditLogId");
