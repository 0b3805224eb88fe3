use tingo_auth::Identity;

/// Caller identity on routes where authentication is optional.
///
/// Always present in request extensions on those routes; `None` for anonymous
/// callers or credentials that did not verify.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}
