//! `tingo-auth`: token codec and authorization gate.
//!
//! This crate is intentionally decoupled from HTTP and from any concrete
//! backend: the gate reads identities through the [`store`] ports.

pub mod claims;
pub mod codec;
pub mod gate;
pub mod principal;
pub mod roles;
pub mod store;
pub mod unverified;

pub use claims::{validate_claims, TokenClaims, TokenError};
pub use codec::{IssueError, IssuedToken, TokenCodec, TokenGrant, DEFAULT_VALIDITY_HOURS};
pub use gate::{AuthError, Gate, Rejection, DEFAULT_LOOKUP_TIMEOUT};
pub use principal::Identity;
pub use roles::{role_satisfies, Role, RoleClaim};
pub use store::{Profile, ProfileStore, RoleStore, StoreError};
