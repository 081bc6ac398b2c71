//! Stateless HS256 access tokens.
//!
//! There is no server-side session store; a token is good until its `exp`
//! claim passes. The `jti` claim gives each token a stable identity for
//! audit logs.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use reelgen_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload signed into every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's internal database id.
    pub sub: DbId,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issue time, seconds since the Unix epoch.
    pub iat: i64,
    /// Per-token UUID.
    pub jti: String,
}

/// Signing secret and token lifetime.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
}

// 24 hours; device accounts have no refresh flow, so short-lived tokens
// would log anonymous users out of their credit balance.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 1440;

impl JwtConfig {
    /// Read `JWT_SECRET` (required, non-empty) and
    /// `JWT_ACCESS_EXPIRY_MINS` (default 1440) from the environment.
    ///
    /// # Panics
    ///
    /// Panics when `JWT_SECRET` is missing or empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
        }
    }
}

fn signing_key(config: &JwtConfig) -> EncodingKey {
    EncodingKey::from_secret(config.secret.as_bytes())
}

/// Issue an access token for `user_id`.
pub fn generate_access_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        exp: iat + config.access_token_expiry_mins * 60,
        iat,
        jti: Uuid::new_v4().to_string(),
    };

    // Header::default() is HS256.
    encode(&Header::default(), &claims, &signing_key(config))
}

/// Check signature and expiry, returning the decoded [`Claims`].
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_expiry_mins: 60,
        }
    }

    #[test]
    fn round_trips_claims() {
        let config = config_with("unit-test-secret-long-enough-for-hmac");
        let token = generate_access_token(42, &config).expect("generation");

        let claims = validate_token(&token, &config).expect("validation");
        assert_eq!(claims.sub, 42);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn rejects_expired_token() {
        let config = config_with("unit-test-secret-long-enough-for-hmac");

        // Hand-build a token expired well past the 60s default leeway.
        let now = chrono::Utc::now().timestamp();
        let stale = Claims {
            sub: 1,
            exp: now - 300,
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::default(), &stale, &signing_key(&config)).expect("encode");

        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn rejects_foreign_signature() {
        let issuer = config_with("secret-alpha");
        let verifier = config_with("secret-bravo");

        let token = generate_access_token(1, &issuer).expect("generation");
        assert!(validate_token(&token, &verifier).is_err());
    }
}
