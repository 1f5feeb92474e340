//! Password hashing using Argon2id
//!
//! The stored credential of a user is always the output of [`hash_password`]
//! or an unusable marker from [`make_unusable_password`]; a raw password is
//! never written to storage.
//!
//! # Parameters
//!
//! - **Algorithm**: Argon2id
//! - **Memory**: 64 MB (65536 KB)
//! - **Iterations**: 3 passes
//! - **Parallelism**: 4 lanes
//! - **Output**: 32-byte hash
//!
//! # Example
//!
//! ```
//! use orgauth_shared::auth::password::{hash_password, verify_password};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("super_secret_password_123")?;
//!
//! assert!(verify_password("super_secret_password_123", &hash)?);
//! assert!(!verify_password("wrong_password", &hash)?);
//! # Ok(())
//! # }
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use rand::{distributions::Alphanumeric, Rng};

/// Prefix marking a stored credential that can never match any password
pub const UNUSABLE_PASSWORD_PREFIX: &str = "!";

/// Length of the random suffix appended to unusable credentials
const UNUSABLE_PASSWORD_SUFFIX_LENGTH: usize = 40;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password using Argon2id
///
/// A fresh 16-byte salt is drawn from the OS RNG for every call, so hashing
/// the same password twice yields different strings.
///
/// # Returns
///
/// PHC string format hash (algorithm, parameters, salt and hash):
///
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored credential
///
/// Unusable credentials never verify and are not treated as errors.
///
/// # Returns
///
/// `Ok(true)` if the password matches, `Ok(false)` otherwise
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if the stored value is neither a PHC
/// string nor an unusable marker. A value that parses as a PHC string but is
/// otherwise malformed is not an error; it simply fails to verify.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if !is_password_usable(hash) {
        return Ok(false);
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters are embedded in the hash
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Produces a credential that no password will ever match
///
/// Used when an account is provisioned without a password (for example a
/// user who will only sign in through an invitation link).
pub fn make_unusable_password() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UNUSABLE_PASSWORD_SUFFIX_LENGTH)
        .map(char::from)
        .collect();

    format!("{}{}", UNUSABLE_PASSWORD_PREFIX, suffix)
}

/// Returns false for credentials produced by [`make_unusable_password`]
pub fn is_password_usable(hash: &str) -> bool {
    !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

/// Validates password strength
///
/// Checks that password meets minimum requirements:
/// - At least 8 characters long
/// - Contains at least one uppercase letter
/// - Contains at least one lowercase letter
/// - Contains at least one digit
/// - Contains at least one special character
///
/// # Example
///
/// ```
/// use orgauth_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("MyP@ssw0rd!").is_ok());
/// assert!(validate_password_strength("Sh0rt!").is_err());
/// assert!(validate_password_strength("Password123").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}
