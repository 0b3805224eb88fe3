use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tingo_core::SubjectId;

use crate::RoleClaim;

/// Claims carried by a session token.
///
/// Timestamps are Unix-epoch seconds. The signature covers every field, so
/// none of them can change after issuance without invalidating the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject / auth user identifier.
    pub sub: SubjectId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub role: RoleClaim,

    /// Issued-at timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration timestamp.
    pub exp: i64,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Why a token was rejected.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,
}

/// Deterministically validate decoded claims against `now`.
///
/// Signature checking happens in the codec; this only looks at the claim set.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.sub.as_str().trim().is_empty() {
        return Err(TokenError::Malformed);
    }
    if let Some(iat) = claims.iat {
        if claims.exp <= iat {
            return Err(TokenError::Malformed);
        }
    }
    if now.timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn claims(iat: Option<i64>, exp: i64) -> TokenClaims {
        TokenClaims {
            sub: SubjectId::new("u1"),
            email: None,
            role: RoleClaim::Name(Role::DEFAULT),
            iat,
            exp,
        }
    }

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn accepts_claims_inside_window() {
        assert_eq!(validate_claims(&claims(Some(100), 200), at(150)), Ok(()));
    }

    #[test]
    fn expiry_instant_is_exclusive() {
        assert_eq!(validate_claims(&claims(Some(100), 200), at(200)), Err(TokenError::Expired));
        assert_eq!(validate_claims(&claims(Some(100), 200), at(199)), Ok(()));
    }

    #[test]
    fn inverted_window_is_malformed() {
        assert_eq!(validate_claims(&claims(Some(200), 200), at(150)), Err(TokenError::Malformed));
    }

    #[test]
    fn blank_subject_is_malformed() {
        let mut c = claims(None, 200);
        c.sub = SubjectId::new(" ");
        assert_eq!(validate_claims(&c, at(150)), Err(TokenError::Malformed));
    }

    #[test]
    fn email_is_omitted_from_json_when_absent() {
        let json = serde_json::to_value(claims(Some(1), 2)).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["role"], "usuario");
        assert_eq!(json["exp"], 2);
    }
}
