/// Session tokens
///
/// Credentials are verified elsewhere; this service only issues and checks
/// signed session tokens that name a user. Tokens are HS256 JWTs signed with
/// the configured secret and carried in the `Authorization: Bearer` header or
/// the session cookie.
use crate::config::AuthConfig;
use crate::models::User;
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const SESSION_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// The requester a valid session token resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours.max(1)),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.session_ttl_hours)
    }

    /// Issue a session token for `user`.
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(SESSION_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| anyhow!("Failed to sign session token: {}", e))
    }

    /// Verify signature and expiry and return the requester.
    pub fn verify(&self, token: &str) -> Result<AuthUser> {
        let validation = Validation::new(SESSION_ALGORITHM);
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| anyhow!("Invalid session token: {}", e))?;

        let id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| anyhow!("Invalid subject in session token"))?;

        Ok(AuthUser {
            id,
            username: data.claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            username: "TestUser".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issued_token_verifies() {
        let keys = SessionKeys::new("secret", 1);
        let token = keys.issue(&user()).unwrap();
        let requester = keys.verify(&token).unwrap();
        assert_eq!(
            requester,
            AuthUser {
                id: 7,
                username: "TestUser".into()
            }
        );
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = SessionKeys::new("secret", 1).issue(&user()).unwrap();
        assert!(SessionKeys::new("other", 1).verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = SessionKeys::new("secret", 1);
        let claims = Claims {
            sub: "7".into(),
            username: "TestUser".into(),
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::new(SESSION_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(SessionKeys::new("secret", 1).verify("not-a-token").is_err());
    }
}
