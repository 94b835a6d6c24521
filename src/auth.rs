//! Handshake credential resolution.
//!
//! The hub never issues tokens. It only asks an [`AuthResolver`] to turn
//! the credential presented at handshake time into an identity. The
//! default resolver verifies HS256 JWTs signed by the platform's auth
//! service, taking the identity from the `sub` claim.

use std::fmt;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::error::HubError;

/// Maximum accepted credential size, checked before any parsing.
pub const MAX_TOKEN_BYTES: usize = 8 * 1024;

/// Resolves a handshake credential to an identity.
#[async_trait]
pub trait AuthResolver: Send + Sync {
    /// Verifies `credential` and returns the identity it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidCredential`] if the credential is
    /// malformed, expired, or not signed by a trusted key.
    async fn resolve(&self, credential: &str) -> Result<UserId, HubError>;
}

/// Claims the hub reads from an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Identity id.
    pub sub: String,
    /// Expiry (seconds since the Unix epoch).
    pub exp: u64,
    /// Issued-at (seconds since the Unix epoch).
    #[serde(default)]
    pub iat: Option<u64>,
}

/// HS256 JWT verifier.
pub struct JwtAuthResolver {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthResolver {
    /// Creates a resolver trusting tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl fmt::Debug for JwtAuthResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthResolver")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthResolver for JwtAuthResolver {
    async fn resolve(&self, credential: &str) -> Result<UserId, HubError> {
        if credential.len() > MAX_TOKEN_BYTES {
            return Err(HubError::InvalidCredential("token too large".to_string()));
        }
        let data = jsonwebtoken::decode::<AccessClaims>(credential, &self.key, &self.validation)
            .map_err(|e| HubError::InvalidCredential(describe(&e)))?;
        if data.claims.sub.is_empty() {
            return Err(HubError::InvalidCredential("empty subject".to_string()));
        }
        Ok(UserId::from(data.claims.sub))
    }
}

/// Short client-facing reason; never echoes token contents.
fn describe(err: &jsonwebtoken::errors::Error) -> String {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => "token expired".to_string(),
        ErrorKind::InvalidSignature => "bad signature".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("missing claim: {claim}"),
        _ => "malformed token".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    fn now() -> u64 {
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
    }

    fn token(sub: &str, exp: u64, secret: &[u8]) -> String {
        let claims = AccessClaims {
            sub: sub.to_string(),
            exp,
            iat: Some(now()),
        };
        let Ok(token) = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        ) else {
            panic!("encoding failed");
        };
        token
    }

    #[tokio::test]
    async fn valid_token_resolves_subject() {
        let resolver = JwtAuthResolver::new(SECRET);
        let result = resolver.resolve(&token("alice", now() + 600, SECRET)).await;
        let Ok(user) = result else {
            panic!("expected identity, got {result:?}");
        };
        assert_eq!(user, UserId::from("alice"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let resolver = JwtAuthResolver::new(SECRET);
        let result = resolver.resolve(&token("alice", now() - 600, SECRET)).await;
        let Err(HubError::InvalidCredential(reason)) = result else {
            panic!("expected invalid credential, got {result:?}");
        };
        assert_eq!(reason, "token expired");
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() {
        let resolver = JwtAuthResolver::new(SECRET);
        let result = resolver
            .resolve(&token("alice", now() + 600, b"other-secret"))
            .await;
        assert!(matches!(result, Err(HubError::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn garbage_and_oversized_tokens_are_rejected() {
        let resolver = JwtAuthResolver::new(SECRET);
        assert!(resolver.resolve("not-a-jwt").await.is_err());
        let huge = "a".repeat(MAX_TOKEN_BYTES + 1);
        assert!(resolver.resolve(&huge).await.is_err());
    }
}
