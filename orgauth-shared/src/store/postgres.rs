//! PostgreSQL account store
//!
//! Delegates to the model functions in [`crate::models`] and translates
//! constraint failures into [`StoreError`] variants. Uniqueness, reference
//! integrity and the organization → user cascade are enforced by the schema
//! in `migrations/`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use super::{AccountStore, StoreResult};
use crate::db::aliases::DEFAULT_DB_ALIAS;
use crate::models::organization::{CreateOrganization, Organization};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Account store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
    alias: String,
}

impl PgAccountStore {
    /// Creates a store on the default alias
    pub fn new(pool: PgPool) -> Self {
        Self::with_alias(pool, DEFAULT_DB_ALIAS)
    }

    /// Creates a store labelled with a connection alias
    pub fn with_alias(pool: PgPool, alias: impl Into<String>) -> Self {
        PgAccountStore {
            pool,
            alias: alias.into(),
        }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    fn alias(&self) -> &str {
        &self.alias
    }

    async fn insert_organization(&self, data: CreateOrganization) -> StoreResult<Organization> {
        let organization = Organization::create(&self.pool, data).await?;
        info!(alias = %self.alias, organization_id = organization.id, "Organization created");
        Ok(organization)
    }

    async fn find_organization(&self, id: i64) -> StoreResult<Option<Organization>> {
        Ok(Organization::find_by_id(&self.pool, id).await?)
    }

    async fn delete_organization(&self, id: i64) -> StoreResult<bool> {
        let deleted = Organization::delete(&self.pool, id).await?;
        info!(alias = %self.alias, organization_id = id, deleted, "Organization delete");
        Ok(deleted)
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        let user = User::create(&self.pool, data).await?;
        debug!(alias = %self.alias, user_id = user.id, "User row inserted");
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn list_users_in_organization(&self, organization_id: i64) -> StoreResult<Vec<User>> {
        Ok(User::list_by_organization(&self.pool, organization_id).await?)
    }

    async fn update_user(&self, id: i64, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }
}
