//! Authentication
//!
//! HS256 session tokens and salted password digests backing the register and
//! login endpoints. The scheduler never sees a token: authorization happens
//! at the HTTP layer, which hands the owner principal down as a plain
//! integer.

#[cfg(test)]
mod tests;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Session token lifetime.
const TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("failed to sign token")]
    TokenCreation,
}

/// JWT payload: the owner principal plus standard expiry bookkeeping.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Owner principal (user id).
    pub sub: i64,
    pub login: String,
    pub exp: u64,
    pub iat: u64,
}

/// Holds the derived signing keys for the process lifetime so the raw secret
/// is touched exactly once.
pub struct AuthContext {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl AuthContext {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Issues a session token for a logged-in user.
    pub fn issue_token(&self, user_id: i64, login: &str) -> Result<String, AuthError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = Claims {
            sub: user_id,
            login: login.to_string(),
            exp: now + TOKEN_TTL_SECS,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            tracing::error!("Token signing failed: {}", e);
            AuthError::TokenCreation
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Extracts and validates the bearer token from request headers,
    /// returning the caller's claims.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        self.validate_token(token)
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
                Some(token)
            } else {
                None
            }
        })
}

/// Digests a password with a fresh random salt. Stored form is
/// `<salt-hex>$<sha256-hex>`.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::random();
    let salt_hex = to_hex(&salt);
    format!("{}${}", salt_hex, digest_with_salt(&salt_hex, password))
}

/// Constant-shape verification against a stored digest.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest)) = stored.split_once('$') else {
        return false;
    };
    digest_with_salt(salt_hex, password) == digest
}

fn digest_with_salt(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
