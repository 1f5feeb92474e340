//! Crate-level error type
//!
//! Every operation that can fail returns [`AccountResult`]. Errors from the
//! storage layer, the password hasher and the mail transport are wrapped
//! without being interpreted, so callers see the original failure as the
//! error source. Nothing is retried or recovered at this layer.

use validator::ValidationErrors;

use crate::auth::password::PasswordError;
use crate::mail::MailError;
use crate::store::StoreError;

/// Result type alias for account operations
pub type AccountResult<T> = Result<T, AccountError>;

/// Errors returned by account operations
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// A rule on the requested record was broken before anything was written
    #[error("{0}")]
    Validation(String),

    /// One or more fields failed format or length validation
    #[error("Invalid fields: {0}")]
    InvalidFields(#[from] ValidationErrors),

    /// The storage layer rejected the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Password hashing failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// The mail transport failed
    #[error(transparent)]
    Mail(#[from] MailError),
}

impl AccountError {
    /// True if the storage layer reported a duplicate unique value
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, AccountError::Store(StoreError::UniqueViolation { .. }))
    }

    /// True if the storage layer reported a missing referenced record
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, AccountError::Store(StoreError::ForeignKeyViolation { .. }))
    }
}
