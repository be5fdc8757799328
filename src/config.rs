use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use anyhow::{Context, Result};
use http::HeaderValue;
use zeroize::{Zeroize, Zeroizing};

/// Which record store backs sessions and shares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Signature algorithm of the identity provider's tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JwtAlgorithm {
    Rs256,
    Es256,
}

/// Bearer-token verification settings.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Expected `iss` claim.
    pub issuer: String,
    /// Expected `aud` claim, if any.
    pub audience: Option<String>,
    /// Where the verification key was read from.
    pub public_key_path: PathBuf,
    /// The PEM-encoded verification key.
    pub public_key_pem: Vec<u8>,
    pub algorithm: JwtAlgorithm,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database. Required for the Postgres backend.
    pub database_url: Option<String>,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    /// The static key sealing session keys and shares at rest.
    pub at_rest_key: Zeroizing<Vec<u8>>,
    pub auth: AuthConfig,
    /// Browser origins allowed to call the API. Empty disables CORS.
    pub cors_origins: Vec<HeaderValue>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Creates a new `Config` from any variable source.
    ///
    /// Every field is validated here; a `Config` that exists is usable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut at_rest_key_hex = lookup("AT_REST_KEY")
            .context("AT_REST_KEY must be set (generate with: openssl rand -hex 32)")?;

        let at_rest_key = hex::decode(at_rest_key_hex.trim())
            .context("AT_REST_KEY must be valid hexadecimal");
        at_rest_key_hex.zeroize();
        let at_rest_key = Zeroizing::new(at_rest_key?);

        if at_rest_key.len() != 32 {
            anyhow::bail!("AT_REST_KEY must be exactly 32 bytes (64 hex characters)");
        }

        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => anyhow::bail!("Unknown STORAGE_BACKEND '{}' (expected postgres or memory)", other),
        };

        let database_url = lookup("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORAGE_BACKEND is postgres");
        }

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3015".to_string())
            .parse()
            .context("Invalid BIND_ADDR")?;

        let cors_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid origin '{}' in CORS_ALLOWED_ORIGINS", origin))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            database_url,
            bind_addr,
            storage,
            at_rest_key,
            auth: AuthConfig::from_lookup(&lookup)?,
            cors_origins,
        })
    }
}

impl AuthConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let issuer = lookup("JWT_ISSUER").context("JWT_ISSUER must be set")?;
        if issuer.trim().is_empty() {
            anyhow::bail!("JWT_ISSUER must not be empty");
        }

        let algorithm = match lookup("JWT_ALGORITHM").as_deref() {
            None | Some("RS256") => JwtAlgorithm::Rs256,
            Some("ES256") => JwtAlgorithm::Es256,
            Some(other) => anyhow::bail!("Unsupported JWT_ALGORITHM '{}' (expected RS256 or ES256)", other),
        };

        let public_key_path = PathBuf::from(
            lookup("JWT_PUBLIC_KEY_PATH").context("JWT_PUBLIC_KEY_PATH must be set")?,
        );
        let public_key_pem = std::fs::read(&public_key_path).with_context(|| {
            format!("Cannot read JWT public key at {}", public_key_path.display())
        })?;

        Ok(Self {
            issuer,
            audience: lookup("JWT_AUDIENCE").filter(|a| !a.is_empty()),
            public_key_path,
            public_key_pem,
            algorithm,
        })
    }
}
