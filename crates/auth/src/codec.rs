//! Token codec: issues and verifies signed, time-bound session tokens.
//!
//! Tokens are compact JWS strings signed with HS256 and a process-wide secret.
//! Verification is a boundary function: every decode failure is folded into
//! [`TokenError`], so attacker-controlled input can never surface a raw
//! parsing error or panic.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use tingo_core::SubjectId;

use crate::claims::{validate_claims, TokenClaims, TokenError};
use crate::RoleClaim;

/// Default validity window for issued tokens, in hours.
pub const DEFAULT_VALIDITY_HOURS: i64 = 24;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// What a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub subject: SubjectId,
    pub email: Option<String>,
    pub role: RoleClaim,
}

/// A freshly issued token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("failed to encode token: {0}")]
    Encode(#[from] JwtError),

    #[error("token expiry is out of range (validity {validity})")]
    ExpiryOutOfRange { validity: Duration },
}

/// HS256 token codec bound to one signing secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validity: Duration::hours(DEFAULT_VALIDITY_HOURS),
        }
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    pub fn issue(&self, grant: TokenGrant) -> Result<IssuedToken, IssueError> {
        self.issue_at(grant, Utc::now())
    }

    /// Issue a token as of `now`; expiry is `now + validity`.
    pub fn issue_at(&self, grant: TokenGrant, now: DateTime<Utc>) -> Result<IssuedToken, IssueError> {
        let expires_at = now
            .checked_add_signed(self.validity)
            .ok_or(IssueError::ExpiryOutOfRange {
                validity: self.validity,
            })?;
        let claims = TokenClaims {
            sub: grant.subject,
            email: grant.email,
            role: grant.role,
            iat: Some(now.timestamp()),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        let expires_at = claims.expires_at().unwrap_or(expires_at);

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Check signature and expiry as of `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &verifying_validation())
            .map_err(|e| classify(&e))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Signature-checking validation. Expiry is checked by `validate_claims`
/// against an explicit clock instead of the library's wall clock.
fn verifying_validation() -> Validation {
    let mut validation = Validation::new(ALGORITHM);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation
}

fn classify(err: &JwtError) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
