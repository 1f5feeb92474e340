//! Database connection pool management
//!
//! One pool is built per connection alias (see [`super::aliases`]). The
//! pool is checked with `SELECT 1` before it is handed out, so a bad URL or
//! an unreachable server fails at startup rather than on the first write.
//!
//! # Example
//!
//! ```no_run
//! use orgauth_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/orgauth")).await?;
//!     Ok(())
//! }
//! ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings for one alias's connection pool
///
/// Durations are whole seconds, matching how they arrive from the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Upper bound on open connections
    ///
    /// Default: 10
    pub max_connections: u32,

    /// Connections kept open while idle
    ///
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a free connection (seconds)
    ///
    /// Default: 30
    pub connect_timeout_seconds: u64,

    /// Idle time after which a connection is closed (seconds); None keeps it
    ///
    /// Default: Some(600)
    pub idle_timeout_seconds: Option<u64>,

    /// Age after which a connection is recycled (seconds)
    ///
    /// Default: Some(1800)
    pub max_lifetime_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

impl DatabaseConfig {
    /// Default settings for `url`
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// The URL with any password replaced by `***`, for logging
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        let Some((credentials, host)) = rest.rsplit_once('@') else {
            return self.url.clone();
        };

        match credentials.split_once(':') {
            Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
            None => self.url.clone(),
        }
    }

    fn pool_options(&self) -> PgPoolOptions {
        // sqlx has its own non-None defaults, so None is passed explicitly
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(Duration::from_secs(self.connect_timeout_seconds))
            .idle_timeout(self.idle_timeout_seconds.map(Duration::from_secs))
            .max_lifetime(self.max_lifetime_seconds.map(Duration::from_secs))
    }
}

/// Opens a pool for `config` and checks that the server answers
///
/// # Errors
///
/// Returns an error if the URL does not parse, the server cannot be reached
/// within the acquire timeout, or the health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        url = %config.redacted_url(),
        max_connections = config.max_connections,
        "Opening database pool"
    );

    let pool = config.pool_options().connect(&config.url).await?;
    health_check(&pool).await?;

    debug!(url = %config.redacted_url(), "Database pool ready");
    Ok(pool)
}

/// Runs `SELECT 1` against the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let (value,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if value != 1 {
        warn!(value, "Database health check returned an unexpected value");
        return Err(sqlx::Error::Protocol(
            "health check returned an unexpected value".into(),
        ));
    }

    Ok(())
}

/// Closes the pool after checked-out connections are returned
pub async fn close_pool(pool: PgPool) {
    pool.close().await;
    debug!("Database pool closed");
}
