//! Storage backends for account records
//!
//! The [`AccountStore`] trait is the seam between account logic and
//! persistence. Every backend enforces the same rules:
//!
//! 1. `email` is unique among organizations and, separately, among users
//! 2. A user must reference an existing organization
//! 3. Deleting an organization deletes its users
//! 4. `updated_at` is refreshed on every user mutation; `created_at` never changes
//!
//! # Backends
//!
//! - [`PgAccountStore`]: PostgreSQL via `sqlx`, constraints enforced by the schema
//! - [`MemoryAccountStore`]: in-process maps, constraints enforced in code
//!
//! # Example
//!
//! ```no_run
//! use orgauth_shared::store::{AccountStore, PgAccountStore};
//! use orgauth_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//! let store = PgAccountStore::new(pool);
//!
//! let users = store.list_users_in_organization(1).await?;
//! println!("{} users", users.len());
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use tracing::debug;

use crate::models::organization::{CreateOrganization, Organization};
use crate::models::user::{CreateUser, UpdateUser, User};

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Unique constraint on organization email
pub const ORGANIZATIONS_EMAIL_KEY: &str = "organizations_email_key";

/// Unique constraint on user email
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// Foreign key from users to organizations
pub const USERS_ORGANIZATION_FKEY: &str = "users_organization_id_fkey";

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Name of the violated constraint
        constraint: String,
    },

    /// A referenced record does not exist
    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation {
        /// Name of the violated constraint
        constraint: String,
    },

    /// A value does not fit its column
    #[error("Value too long: {0}")]
    ValueTooLong(String),

    /// No connection pool is configured under this alias
    #[error("Unknown database alias: {0}")]
    UnknownAlias(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();

            if db_err.is_unique_violation() {
                debug!(constraint = %constraint, "Unique constraint violation");
                return StoreError::UniqueViolation { constraint };
            }
            if db_err.is_foreign_key_violation() {
                debug!(constraint = %constraint, "Foreign key constraint violation");
                return StoreError::ForeignKeyViolation { constraint };
            }
            // string_data_right_truncation
            if db_err.code().as_deref() == Some("22001") {
                return StoreError::ValueTooLong(db_err.message().to_string());
            }
        }

        StoreError::Database(err)
    }
}

/// Persistence operations for organizations and users
///
/// Each method performs at most one write and never retries.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Connection alias this store writes through (for logging)
    fn alias(&self) -> &str;

    /// Inserts an organization
    async fn insert_organization(&self, data: CreateOrganization) -> StoreResult<Organization>;

    /// Finds an organization by ID
    async fn find_organization(&self, id: i64) -> StoreResult<Option<Organization>>;

    /// Deletes an organization and, by cascade, its users
    ///
    /// Returns false if the organization didn't exist
    async fn delete_organization(&self, id: i64) -> StoreResult<bool>;

    /// Inserts a user
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User>;

    /// Finds a user by ID
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    /// Finds a user by (normalized) email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Lists the users of an organization ordered by ID
    async fn list_users_in_organization(&self, organization_id: i64) -> StoreResult<Vec<User>>;

    /// Applies a partial update to a user
    ///
    /// Returns None if the user didn't exist
    async fn update_user(&self, id: i64, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Deletes a user
    ///
    /// Returns false if the user didn't exist
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;
}
