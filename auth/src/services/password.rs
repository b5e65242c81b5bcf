//! Password hashing behind a swappable interface.
//!
//! `verify` never reports an error: a wrong password and an unreadable hash
//! both come back as `false`.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use authcore_config::{AuthConfig, HashAlgorithm, MAX_BCRYPT_COST, MIN_BCRYPT_COST};

use crate::errors::HashingError;

pub trait CredentialHasher: Send + Sync {
    /// Salted one-way hash of `plaintext`.
    fn hash(&self, plaintext: &str) -> Result<String, HashingError>;

    fn verify(&self, plaintext: &str, credential_hash: &str) -> bool;
}

/// bcrypt only reads this many bytes of input.
pub const BCRYPT_MAX_PASSWORD_LEN: usize = 72;

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Result<Self, HashingError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(HashingError::Internal(format!(
                "bcrypt cost {} outside {}..={}",
                cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        if plaintext.len() > BCRYPT_MAX_PASSWORD_LEN {
            return Err(HashingError::TooLong {
                max: BCRYPT_MAX_PASSWORD_LEN,
            });
        }
        bcrypt::hash(plaintext, self.cost).map_err(|e| HashingError::Internal(e.to_string()))
    }

    fn verify(&self, plaintext: &str, credential_hash: &str) -> bool {
        // Longer input could only match by its first 72 bytes.
        if plaintext.len() > BCRYPT_MAX_PASSWORD_LEN {
            return false;
        }
        match bcrypt::verify(plaintext, credential_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored bcrypt hash could not be parsed");
                false
            }
        }
    }
}

/// Argon2id with the crate's default parameters, stored as a PHC string.
#[derive(Default, Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashingError::Internal(e.to_string()))?;
        Ok(password_hash.to_string())
    }

    fn verify(&self, plaintext: &str, credential_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(credential_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored argon2 hash could not be parsed");
                return false;
            }
        };
        match self.argon2.verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Argon2 verification failed");
                false
            }
        }
    }
}

/// Build the hasher selected by `config.hasher`.
pub fn hasher_for(config: &AuthConfig) -> Result<Arc<dyn CredentialHasher>, HashingError> {
    Ok(match config.hasher {
        HashAlgorithm::Bcrypt => Arc::new(BcryptHasher::new(config.bcrypt_cost)?),
        HashAlgorithm::Argon2 => Arc::new(Argon2Hasher::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashers() -> Vec<(&'static str, Box<dyn CredentialHasher>)> {
        vec![
            (
                "bcrypt",
                Box::new(BcryptHasher::new(MIN_BCRYPT_COST).unwrap()) as Box<dyn CredentialHasher>,
            ),
            ("argon2", Box::new(Argon2Hasher::new()) as Box<dyn CredentialHasher>),
        ]
    }

    #[test]
    fn test_hash_then_verify() {
        for (name, hasher) in hashers() {
            let hash = hasher.hash("correct horse battery staple").unwrap();
            assert!(hasher.verify("correct horse battery staple", &hash), "{name}");
            assert!(!hasher.verify("correct horse battery stapler", &hash), "{name}");
        }
    }

    #[test]
    fn test_hashes_are_salted() {
        for (name, hasher) in hashers() {
            let first = hasher.hash("secret").unwrap();
            let second = hasher.hash("secret").unwrap();

            assert_ne!(first, second, "{name}");
            assert_eq!(first.len(), second.len(), "{name}");
            assert!(hasher.verify("secret", &first), "{name}");
            assert!(hasher.verify("secret", &second), "{name}");
        }
    }

    #[test]
    fn test_hash_is_never_the_plaintext() {
        for (name, hasher) in hashers() {
            let hash = hasher.hash("secret").unwrap();
            assert!(!hash.is_empty(), "{name}");
            assert_ne!(hash, "secret", "{name}");
        }
    }

    #[test]
    fn test_malformed_hash_verifies_false() {
        for (name, hasher) in hashers() {
            assert!(!hasher.verify("secret", ""), "{name}");
            assert!(!hasher.verify("secret", "secret"), "{name}");
            assert!(!hasher.verify("secret", "$2b$10$truncated"), "{name}");
            assert!(!hasher.verify("secret", "$argon2id$v=19$garbage"), "{name}");
        }
    }

    #[test]
    fn test_hashes_from_the_other_algorithm_do_not_verify() {
        let bcrypt_hasher = BcryptHasher::new(MIN_BCRYPT_COST).unwrap();
        let argon2_hasher = Argon2Hasher::new();

        let bcrypt_hash = bcrypt_hasher.hash("secret").unwrap();
        let argon2_hash = argon2_hasher.hash("secret").unwrap();

        assert!(!argon2_hasher.verify("secret", &bcrypt_hash));
        assert!(!bcrypt_hasher.verify("secret", &argon2_hash));
    }

    #[test]
    fn test_bcrypt_refuses_input_it_would_truncate() {
        let hasher = BcryptHasher::new(MIN_BCRYPT_COST).unwrap();
        let prefix = "p".repeat(BCRYPT_MAX_PASSWORD_LEN);

        let at_limit = hasher.hash(&prefix).unwrap();
        assert!(hasher.verify(&prefix, &at_limit));
        assert!(!hasher.verify(&format!("{prefix}-WRONG"), &at_limit));

        assert_eq!(
            hasher.hash(&format!("{prefix}-right")),
            Err(HashingError::TooLong {
                max: BCRYPT_MAX_PASSWORD_LEN
            })
        );
    }

    #[test]
    fn test_argon2_distinguishes_long_passwords() {
        let hasher = Argon2Hasher::new();
        let prefix = "p".repeat(BCRYPT_MAX_PASSWORD_LEN);

        let hash = hasher.hash(&format!("{prefix}-right")).unwrap();
        assert!(hasher.verify(&format!("{prefix}-right"), &hash));
        assert!(!hasher.verify(&format!("{prefix}-WRONG"), &hash));
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        assert!(BcryptHasher::new(MIN_BCRYPT_COST - 1).is_err());
        assert!(BcryptHasher::new(MAX_BCRYPT_COST + 1).is_err());
        assert_eq!(BcryptHasher::new(10).unwrap().cost(), 10);
    }

    #[test]
    fn test_hasher_for_config() {
        let mut config = AuthConfig::new("0123456789abcdef0123456789abcdef");
        config.bcrypt_cost = MIN_BCRYPT_COST;
        let hasher = hasher_for(&config).unwrap();
        let hash = hasher.hash("pw").unwrap();
        assert!(hash.starts_with("$2"));

        config.hasher = HashAlgorithm::Argon2;
        let hasher = hasher_for(&config).unwrap();
        let hash = hasher.hash("pw").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }
}
