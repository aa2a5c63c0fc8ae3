//! Admin secret check.
//!
//! Both sides are hashed with SHA-256 before a constant-time comparison, so neither
//! the content nor the length of the configured secret leaks through timing.

use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

#[derive(Debug)]
pub struct SecretValidator {
    secret: SecretString,
}

impl SecretValidator {
    /// # Errors
    /// Returns an error if the configured secret is empty.
    pub fn new(secret: SecretString) -> Result<Self> {
        if secret.expose_secret().is_empty() {
            return Err(anyhow!("admin secret must not be empty"));
        }
        Ok(Self { secret })
    }

    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        let expected = Sha256::digest(self.secret.expose_secret().as_bytes());
        let candidate = Sha256::digest(submitted.as_bytes());
        expected.as_slice().ct_eq(candidate.as_slice()).into()
    }
}
