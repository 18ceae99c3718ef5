//! Password hashing and credential generation.

use anyhow::Context;
use bcrypt::{DEFAULT_COST, hash, verify};
use rand::{Rng, distributions::Alphanumeric};

use crate::errors::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const GENERATED_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .context("Failed to hash password")
        .map_err(AppError::internal)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .context("Failed to verify password")
        .map_err(AppError::internal)
}

/// Random alphanumeric password handed out to provisioned accounts.
pub fn generate_password(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("NO001").unwrap();
        assert_ne!(hashed, "NO001");
        assert!(verify_password("NO001", &hashed).unwrap());
        assert!(!verify_password("NO002", &hashed).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_errors() {
        assert!(verify_password("secret", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_generate_password() {
        let pw = generate_password(GENERATED_PASSWORD_LENGTH);
        assert_eq!(pw.len(), 8);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(pw, generate_password(GENERATED_PASSWORD_LENGTH));
    }
}
