//! Password hashing and verification using Argon2id.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::config::AuthConfig;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("Invalid hashing parameters: {0}")]
    Params(String),

    #[error("Failed to hash password: {0}")]
    Hash(String),
}

/// Salted, tunable-cost password hashing.
///
/// Holds a hash of a throwaway password so that a login for an unknown
/// account costs the same as one with a wrong password.
#[derive(Clone)]
pub struct CredentialStore {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl CredentialStore {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut store = Self { argon2, decoy_hash: String::new() };
        store.decoy_hash = store.hash("decoy password for absent accounts")?;
        Ok(store)
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, HashError> {
        Self::new(config.hash_memory_kib, config.hash_iterations, config.hash_parallelism)
    }

    /// Returns the PHC-formatted hash string, salt and parameters included.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }

    /// Checks `password` against a stored hash. An unparseable hash never
    /// matches.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            // verification uses the parameters recorded in the hash itself
            Ok(parsed) => self.argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => {
                self.burn_decoy(password);
                false
            }
        }
    }

    /// Spends one verification worth of work for a login whose account does
    /// not exist. Always false.
    pub fn verify_absent(&self, password: &str) -> bool {
        self.burn_decoy(password);
        false
    }

    fn burn_decoy(&self, password: &str) {
        if let Ok(parsed) = PasswordHash::new(&self.decoy_hash) {
            let _ = self.argon2.verify_password(password.as_bytes(), &parsed);
        }
    }
}
