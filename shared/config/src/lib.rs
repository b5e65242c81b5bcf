//! Environment-driven configuration for the auth core.
//!
//! Values are read from the process environment after loading a `.env`
//! file if one is present. Only `JWT_SECRET` is required.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_SECRET_LEN: usize = 32;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 6 * 60 * 60;
/// Upper bound for both the token lifetime and the expiry leeway.
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;
pub const DEFAULT_ISSUER: &str = "authcore";
pub const DEFAULT_AUDIENCE: &str = "authcore-clients";
pub const DEFAULT_BCRYPT_COST: u32 = 10;
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("JWT_SECRET must be at least 32 bytes")]
    WeakSecret,
}

/// Signing secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(**redacted**)")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Bcrypt,
    Argon2,
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcrypt" => Ok(Self::Bcrypt),
            "argon2" | "argon2id" => Ok(Self::Argon2),
            other => Err(ConfigError::Invalid {
                name: "PASSWORD_HASHER",
                reason: format!("unknown algorithm '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub jwt_secret: Secret,
    pub token_ttl: Duration,
    pub issuer: String,
    pub audience: String,
    pub leeway: Duration,
    pub hasher: HashAlgorithm,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Defaults for everything except the secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Secret::new(jwt_secret),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            leeway: Duration::ZERO,
            hasher: HashAlgorithm::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let mut config = Self::new(secret);

        if let Some(ttl) = get("JWT_TTL_SECS") {
            config.token_ttl = Duration::from_secs(parse_number("JWT_TTL_SECS", &ttl)?);
        }
        if let Some(leeway) = get("JWT_LEEWAY_SECS") {
            config.leeway = Duration::from_secs(parse_number("JWT_LEEWAY_SECS", &leeway)?);
        }
        if let Some(issuer) = get("JWT_ISSUER") {
            config.issuer = issuer;
        }
        if let Some(audience) = get("JWT_AUDIENCE") {
            config.audience = audience;
        }
        if let Some(hasher) = get("PASSWORD_HASHER") {
            config.hasher = hasher.parse()?;
        }
        if let Some(cost) = get("BCRYPT_COST") {
            config.bcrypt_cost = parse_number("BCRYPT_COST", &cost)?;
        }

        config.validate()?;

        tracing::debug!(
            issuer = %config.issuer,
            audience = %config.audience,
            ttl_secs = config.token_ttl.as_secs(),
            hasher = ?config.hasher,
            "Auth configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        if self.token_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                name: "JWT_TTL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.token_ttl.as_secs() > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid {
                name: "JWT_TTL_SECS",
                reason: format!("must be at most {} seconds", MAX_TOKEN_TTL_SECS),
            });
        }
        if self.leeway.as_secs() > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid {
                name: "JWT_LEEWAY_SECS",
                reason: format!("must be at most {} seconds", MAX_TOKEN_TTL_SECS),
            });
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                reason: format!("must be between {} and {}", MIN_BCRYPT_COST, MAX_BCRYPT_COST),
            });
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: format!("'{}' is not a valid number", raw),
    })
}
