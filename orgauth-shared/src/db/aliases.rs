//! Named connection pools
//!
//! An application may talk to more than one database (a primary and a
//! reporting replica, or one database per region). Each is registered under
//! an alias, and writes are directed at an alias explicitly. The alias
//! `default` is used when none is named.
//!
//! # Example
//!
//! ```no_run
//! use orgauth_shared::db::aliases::{DatabaseAliases, DEFAULT_DB_ALIAS};
//! use orgauth_shared::db::pool::DatabaseConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let aliases = DatabaseAliases::connect(vec![
//!     (DEFAULT_DB_ALIAS.to_string(), DatabaseConfig {
//!         url: "postgresql://localhost/orgauth".to_string(),
//!         ..Default::default()
//!     }),
//! ])
//! .await?;
//!
//! let pool = aliases.get(DEFAULT_DB_ALIAS)?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use sqlx::PgPool;
use tracing::info;

use super::pool::{close_pool, create_pool, DatabaseConfig};
use crate::store::{PgAccountStore, StoreError};

/// Alias used when a caller does not name one
pub const DEFAULT_DB_ALIAS: &str = "default";

/// Registry of connection pools keyed by alias
#[derive(Debug, Clone, Default)]
pub struct DatabaseAliases {
    pools: BTreeMap<String, PgPool>,
}

impl DatabaseAliases {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a pool for every `(alias, config)` pair
    ///
    /// # Errors
    ///
    /// Returns the first connection failure; pools opened before it are
    /// dropped.
    pub async fn connect<I>(configs: I) -> Result<Self, sqlx::Error>
    where
        I: IntoIterator<Item = (String, DatabaseConfig)>,
    {
        let mut aliases = Self::new();

        for (alias, config) in configs {
            info!(alias = %alias, "Connecting database alias");
            let pool = create_pool(config).await?;
            aliases.insert(alias, pool);
        }

        Ok(aliases)
    }

    /// Registers (or replaces) the pool for an alias
    pub fn insert(&mut self, alias: impl Into<String>, pool: PgPool) {
        self.pools.insert(alias.into(), pool);
    }

    /// Returns the pool registered under `alias`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownAlias` if nothing is registered under it
    pub fn get(&self, alias: &str) -> Result<&PgPool, StoreError> {
        self.pools
            .get(alias)
            .ok_or_else(|| StoreError::UnknownAlias(alias.to_string()))
    }

    /// Returns an account store writing through `alias`
    pub fn store(&self, alias: &str) -> Result<PgAccountStore, StoreError> {
        let pool = self.get(alias)?;
        Ok(PgAccountStore::with_alias(pool.clone(), alias))
    }

    /// Registered alias names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.pools.keys().map(String::as_str).collect()
    }

    /// Closes every pool
    pub async fn close(self) {
        for (alias, pool) in self.pools {
            info!(alias = %alias, "Closing database alias");
            close_pool(pool).await;
        }
    }
}
