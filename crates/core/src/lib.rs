//! `tingo-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no HTTP).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{AuditLogId, CategoryId, ProductId, RoleId, SubjectId};
