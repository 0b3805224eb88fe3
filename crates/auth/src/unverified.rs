//! Unverified token inspection, for diagnostics only.
//!
//! Nothing decoded here is trustworthy: the signature and expiry are **not**
//! checked. Authorization decisions must go through [`crate::TokenCodec::verify`].

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::claims::{TokenClaims, TokenError};

/// Extract claims without checking the signature or expiry.
pub fn decode_unverified(token: &str) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| TokenError::Malformed)
}
