use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for authorization.
///
/// Roles form a flat namespace of opaque names. Exactly one role, `admin`, is
/// privileged: it satisfies every role requirement (see [`role_satisfies`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// The privileged role.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    /// Role granted to every newly registered account.
    pub const DEFAULT: Role = Role(Cow::Borrowed("usuario"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN.as_str()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role as carried inside a token: either a role name or a numeric role key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleClaim {
    Id(i64),
    Name(Role),
}

impl From<Role> for RoleClaim {
    fn from(value: Role) -> Self {
        RoleClaim::Name(value)
    }
}

/// Whether a held role set satisfies `required`.
///
/// `admin` is a hard-coded override, not a computed superset.
pub fn role_satisfies(held: &[Role], required: &Role) -> bool {
    held.iter().any(|r| r.is_admin() || r == required)
}
