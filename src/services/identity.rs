//! Bearer-token verification.
//!
//! The custodian only needs a verified subject identifier per request; how the
//! token is checked sits behind [`IdentityVerifier`].

use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::{AuthConfig, JwtAlgorithm};
use crate::error::{AppError, Result};

/// A verified subject identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);

impl Subject {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Turns a bearer token into a verified subject.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Subject>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
}

/// Verifies signed JWTs issued by the configured identity provider.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(key: DecodingKey, validation: Validation) -> Self {
        Self { key, validation }
    }

    /// Builds a verifier from the auth section of the configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let (key, algorithm) = match config.algorithm {
            JwtAlgorithm::Rs256 => (
                DecodingKey::from_rsa_pem(&config.public_key_pem),
                jsonwebtoken::Algorithm::RS256,
            ),
            JwtAlgorithm::Es256 => (
                DecodingKey::from_ec_pem(&config.public_key_pem),
                jsonwebtoken::Algorithm::ES256,
            ),
        };
        let key = key.map_err(|e| {
            AppError::Validation(format!(
                "JWT public key at {} is not a valid PEM: {}",
                config.public_key_path.display(),
                e
            ))
        })?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[config.issuer.as_str()]);
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }

        Ok(Self::new(key, validation))
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Subject> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::warn!("❌ Token rejected: {}", e);
            AppError::Unauthorized
        })?;

        match data.claims.sub {
            Some(sub) if !sub.is_empty() => Ok(Subject(sub)),
            _ => {
                tracing::warn!("❌ Token carries no subject");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Maps fixed tokens to subjects. For tests and local development.
#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), subject.into());
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Subject> {
        self.tokens
            .get(token)
            .map(|subject| Subject(subject.clone()))
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const SECRET: &[u8] = b"test-signing-secret";

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: Option<&'a str>,
        iss: &'a str,
        exp: u64,
    }

    fn token(sub: Option<&str>, iss: &str, exp: u64) -> String {
        encode(
            &Header::default(),
            &TestClaims { sub, iss, exp },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn verifier() -> JwtVerifier {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.set_issuer(&["https://id.example/realms/wallet"]);
        validation.validate_aud = false;
        JwtVerifier::new(DecodingKey::from_secret(SECRET), validation)
    }

    fn far_future() -> u64 {
        (chrono::Utc::now().timestamp() + 3600) as u64
    }

    #[tokio::test]
    async fn valid_token_yields_subject() {
        let t = token(Some("alice"), "https://id.example/realms/wallet", far_future());
        assert_eq!(verifier().verify(&t).await.unwrap(), Subject("alice".into()));
    }

    #[tokio::test]
    async fn wrong_issuer_or_expired_is_rejected() {
        let t = token(Some("alice"), "https://evil.example", far_future());
        assert!(matches!(verifier().verify(&t).await, Err(AppError::Unauthorized)));

        let t = token(Some("alice"), "https://id.example/realms/wallet", 1_000);
        assert!(matches!(verifier().verify(&t).await, Err(AppError::Unauthorized)));

        assert!(verifier().verify("not.a.jwt").await.is_err());
    }

    #[tokio::test]
    async fn missing_subject_is_rejected() {
        let t = token(None, "https://id.example/realms/wallet", far_future());
        assert!(matches!(verifier().verify(&t).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn static_tokens() {
        let v = StaticTokenVerifier::new().with_token("t-alice", "alice");
        assert_eq!(v.verify("t-alice").await.unwrap().as_str(), "alice");
        assert!(v.verify("t-bob").await.is_err());
    }
}
