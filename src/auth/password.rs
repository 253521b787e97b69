use crate::error::AppError;
use bcrypt::{hash, verify, DEFAULT_COST};

/// Produces and checks salted bcrypt digests.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl CredentialHasher {
    /// `cost` is the bcrypt work factor (4..=31).
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Returns a self-salted `$2b$` digest of `password`.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    /// Checks `password` against `digest`. A malformed digest is a mismatch, not an error.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        match verify(password, digest) {
            Ok(matches) => matches,
            Err(e) => {
                log::warn!("stored password digest could not be parsed: {}", e);
                false
            }
        }
    }
}
