//! JWT token generation and validation
//!
//! Tokens identify an authenticated account for the duration of
//! `jwt_expiry_seconds`. Validation never panics on a bad token; callers
//! get a `TokenValidationResult` and decide how to respond.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::types::{ContracterError, Result};

/// Claims embedded in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (hex object id)
    pub sub: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

/// Inputs for token generation.
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub account_id: String,
    pub email: String,
}

/// Result of validating a token.
#[derive(Debug, Clone)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// Issues and verifies HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("expiry_seconds", &self.expiry_seconds)
            .finish_non_exhaustive()
    }
}

const DEV_SECRET: &str = "dev-only-insecure-secret";

impl JwtValidator {
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self> {
        if secret.is_empty() {
            return Err(ContracterError::Config("JWT secret must not be empty".into()));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        })
    }

    /// Validator with a well-known secret for development mode only.
    pub fn new_dev() -> Self {
        warn!("Using development JWT secret; tokens are not secure");
        Self {
            encoding_key: EncodingKey::from_secret(DEV_SECRET.as_bytes()),
            decoding_key: DecodingKey::from_secret(DEV_SECRET.as_bytes()),
            expiry_seconds: 3600,
        }
    }

    pub fn generate_token(&self, input: TokenInput) -> Result<String> {
        let now = unix_now();
        let claims = Claims {
            sub: input.account_id,
            email: input.email,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ContracterError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(token, &self.decoding_key, &Validation::default()) {
            Ok(data) => TokenValidationResult {
                valid: true,
                claims: Some(data.claims),
                error: None,
            },
            Err(e) => TokenValidationResult {
                valid: false,
                claims: None,
                error: Some(format!("Invalid token: {}", e)),
            },
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret".into(), 3600).unwrap()
    }

    fn input() -> TokenInput {
        TokenInput {
            account_id: "64b7f1a2c9e77b0012345678".into(),
            email: "dev@example.com".into(),
        }
    }

    #[test]
    fn test_generate_and_verify() {
        let jwt = validator();
        let token = jwt.generate_token(input()).unwrap();

        let result = jwt.verify_token(&token);
        assert!(result.valid);
        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "64b7f1a2c9e77b0012345678");
        assert_eq!(claims.email, "dev@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = validator().generate_token(input()).unwrap();
        let other = JwtValidator::new("different-secret".into(), 3600).unwrap();

        let result = other.verify_token(&token);
        assert!(!result.valid);
        assert!(result.claims.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let result = validator().verify_token("not.a.token");
        assert!(!result.valid);
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the validator's 60 second default leeway
        let now = unix_now();
        let claims = Claims {
            sub: "64b7f1a2c9e77b0012345678".into(),
            email: "dev@example.com".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let result = validator().verify_token(&token);
        assert!(!result.valid);
        assert!(result.claims.is_none());
    }

    #[test]
    fn test_verification_is_idempotent() {
        let jwt = validator();
        let token = jwt.generate_token(input()).unwrap();

        let first = jwt.verify_token(&token);
        let second = jwt.verify_token(&token);
        assert!(first.valid && second.valid);
        assert_eq!(
            first.claims.as_ref().map(|c| c.exp),
            second.claims.as_ref().map(|c| c.exp)
        );
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(JwtValidator::new(String::new(), 3600).is_err());
    }
}
