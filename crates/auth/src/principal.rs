use serde::Serialize;

use tingo_core::SubjectId;

use crate::{Profile, Role, RoleClaim, TokenClaims};

/// The resolved caller of one request.
///
/// Built by the gate after the token verified and the profile was found.
/// `role` is only filled in once role resolution ran (`Gate::authorize`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: SubjectId,
    pub email: Option<String>,
    pub claimed_role: RoleClaim,
    pub role: Option<Role>,
    pub profile: Profile,
}

impl Identity {
    pub fn new(claims: TokenClaims, profile: Profile) -> Self {
        let email = claims.email.or_else(|| profile.email.clone());
        Self {
            subject: claims.sub,
            email,
            claimed_role: claims.role,
            role: None,
            profile,
        }
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_admin)
    }
}
