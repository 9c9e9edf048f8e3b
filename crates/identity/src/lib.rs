//! Caller identity tokens.
//!
//! The election core only compares identities; this crate is where they are
//! vouched for. Tokens are HS256 JWTs whose `sub` claim is the identity.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::domain::Identity;
use thiserror::Error;

pub const ISSUER: &str = "election";

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("identity must not be empty")]
    EmptyIdentity,
    #[error("missing bearer token")]
    Missing,
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

pub fn mint_token(cfg: &TokenConfig, identity: &Identity) -> Result<String, TokenError> {
    if identity.is_blank() {
        return Err(TokenError::EmptyIdentity);
    }
    let now = Utc::now();
    let exp = now + Duration::seconds(cfg.ttl_seconds);
    let claims = Claims {
        iss: ISSUER.to_string(),
        sub: identity.as_str().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )?)
}

pub fn verify_token(cfg: &TokenConfig, token: &str) -> Result<Identity, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation,
    )?;
    let identity = Identity::new(data.claims.sub);
    if identity.is_blank() {
        return Err(TokenError::EmptyIdentity);
    }
    Ok(identity)
}

/// Pulls the identity out of an `Authorization` header value.
pub fn identity_from_authorization(
    cfg: &TokenConfig,
    header: Option<&str>,
) -> Result<Identity, TokenError> {
    let token = header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(TokenError::Missing)?;
    verify_token(cfg, token)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
