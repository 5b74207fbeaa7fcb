// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and policy.
//!
//! bcrypt is CPU-bound, so both hashing and verification run on the
//! blocking pool rather than the async workers.

use crate::error::{AppError, FieldError};

/// bcrypt work factor for stored hashes.
pub const BCRYPT_COST: u32 = 10;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Symbols accepted (and required, at least one) in passwords.
const SYMBOLS: &str = "@$!%*?&";

/// Valid cost-10 hash of a random string; verified against when the account
/// does not exist so unknown emails cost the same as wrong passwords.
const DUMMY_HASH: &str = "$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

/// Hash a password for storage.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hash task failed: {}", e)))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bcrypt hash failed: {}", e)))
}

/// Compare a candidate password to a stored hash.
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Verify task failed: {}", e)))?;

    match result {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            Ok(false)
        }
    }
}

/// Burn one bcrypt verification without a real account.
pub async fn verify_dummy(password: &str) {
    let _ = verify_password(password, DUMMY_HASH).await;
}

/// Check a new password against the account password policy.
pub fn validate_password_policy(field: &str, password: &str) -> Result<(), AppError> {
    let problems = password_policy_violations(field, password);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems))
    }
}

/// Every rule `password` breaks, attributed to `field`.
pub fn password_policy_violations(field: &str, password: &str) -> Vec<FieldError> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(FieldError::new(
            field,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    if password
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || SYMBOLS.contains(c)))
    {
        problems.push(FieldError::new(
            field,
            format!("Password may only contain letters, digits and {}", SYMBOLS),
        ));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| SYMBOLS.contains(c));
    if !(has_lower && has_upper && has_digit && has_symbol) {
        problems.push(FieldError::new(
            field,
            "Password must contain an uppercase letter, a lowercase letter, a number and a special character",
        ));
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_accepts_reference_password() {
        assert!(validate_password_policy("password", "Aa1!aaaa").is_ok());
    }

    #[test]
    fn test_policy_rejections() {
        for bad in ["Aa1!aaa", "aa1!aaaa", "AA1!AAAA", "Aaa!aaaa", "Aa1aaaaa", "Aa1!aaa#"] {
            let err = validate_password_policy("password", bad).unwrap_err();
            match err {
                AppError::Validation(fields) => {
                    assert!(!fields.is_empty(), "{bad} should fail");
                    assert!(fields.iter().all(|f| f.field == "password"));
                }
                other => panic!("unexpected error for {bad}: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("Aa1!aaaa").await.unwrap();
        assert!(hash.starts_with("$2b$10$"));
        assert_ne!(hash, "Aa1!aaaa");
        assert!(verify_password("Aa1!aaaa", &hash).await.unwrap());
        assert!(!verify_password("Aa1!aaab", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_mismatch() {
        assert!(!verify_password("Aa1!aaaa", "not-a-hash").await.unwrap());
        assert!(!verify_password("Aa1!aaaa", DUMMY_HASH).await.unwrap());
    }
}
