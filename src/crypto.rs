//! Password hashing.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;

/// Marks a password that can never match.
pub const UNUSABLE_PASSWORD_PREFIX: &str = "!";
const UNUSABLE_PASSWORD_SUFFIX_LENGTH: usize = 40;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone)]
pub struct Argon2Config {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
///
/// Every hash is peppered with the instance secret key.
pub struct PasswordManager {
    params: Params,
    pepper: Vec<u8>,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(
        config: Option<Argon2Config>,
        pepper: impl AsRef<[u8]>,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self {
            params,
            pepper: pepper.as_ref().to_vec(),
        })
    }

    fn argon2(&self) -> Result<Argon2<'_>> {
        Argon2::new_with_secret(
            &self.pepper,
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))
    }

    /// Hash password using Argon2id.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify password against a PHC string.
    ///
    /// Unusable and malformed hashes never match.
    pub fn verify_password(
        &self,
        password: impl AsRef<[u8]>,
        phc_hash: &str,
    ) -> bool {
        if !is_usable(phc_hash) {
            return false;
        }

        let Ok(parsed) = PasswordHash::new(phc_hash) else {
            return false;
        };

        self.argon2()
            .map(|argon2| {
                argon2.verify_password(password.as_ref(), &parsed).is_ok()
            })
            .unwrap_or(false)
    }
}

/// Produce a password value that no input can match.
pub fn make_unusable() -> String {
    format!(
        "{UNUSABLE_PASSWORD_PREFIX}{}",
        Alphanumeric.sample_string(&mut OsRng, UNUSABLE_PASSWORD_SUFFIX_LENGTH)
    )
}

/// Whether a stored password can ever be verified.
pub fn is_usable(stored: &str) -> bool {
    !stored.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PasswordManager {
        PasswordManager::new(
            Some(Argon2Config {
                memory_cost: 1024,
                iterations: 1,
                parallelism: 1,
                hash_length: 32,
            }),
            "pepper",
        )
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let pwd = manager();
        let hash = pwd.hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(pwd.verify_password("correct horse", &hash));
        assert!(!pwd.verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_pepper_is_required() {
        let hash = manager().hash_password("correct horse").unwrap();
        let other = PasswordManager::new(
            Some(Argon2Config {
                memory_cost: 1024,
                iterations: 1,
                parallelism: 1,
                hash_length: 32,
            }),
            "another pepper",
        )
        .unwrap();

        assert!(!other.verify_password("correct horse", &hash));
    }

    #[test]
    fn test_unusable_password() {
        let pwd = manager();
        let unusable = make_unusable();

        assert_eq!(unusable.len(), 41);
        assert!(!is_usable(&unusable));
        assert!(!pwd.verify_password("", &unusable));
        assert!(!pwd.verify_password(&unusable[1..], &unusable));
        assert!(!pwd.verify_password("anything", "not a phc string"));
    }
}
