//! Configuration management for the admin tool
//!
//! This module loads configuration from environment variables (and a `.env`
//! file when present) and provides a type-safe configuration struct.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string for the `default` alias (required)
//! - `DATABASE_URL_<ALIAS>`: Connection string for an extra alias, e.g.
//!   `DATABASE_URL_REPORTING` registers `reporting`
//! - `DATABASE_MAX_CONNECTIONS`: Pool size per alias (default: 10)
//! - `DEFAULT_FROM_EMAIL`: Sender for outgoing mail (default: webmaster@localhost)
//! - `RUST_LOG`: Log filter (default: orgauth_admin=info,orgauth_shared=info)
//!
//! # Example
//!
//! ```no_run
//! use orgauth_admin::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Aliases: {:?}", config.aliases());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::env;

use orgauth_shared::db::aliases::DEFAULT_DB_ALIAS;
use orgauth_shared::db::pool::DatabaseConfig;
use orgauth_shared::mail::DEFAULT_FROM_EMAIL;
use serde::{Deserialize, Serialize};

const DATABASE_URL: &str = "DATABASE_URL";
const DATABASE_URL_PREFIX: &str = "DATABASE_URL_";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: String, value: String },
}

/// Complete admin tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Connection URL per alias; always contains `default`
    pub databases: BTreeMap<String, String>,

    /// Maximum number of connections in each pool
    pub max_connections: u32,

    /// Mail configuration
    pub mail: MailConfig,
}

/// Mail configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender used when a command does not name one
    pub default_from_email: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing
    /// - `DATABASE_MAX_CONNECTIONS` is not a positive integer
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(env::vars())
    }

    /// Builds configuration from `(name, value)` pairs
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut databases = BTreeMap::new();
        let mut max_connections = DEFAULT_MAX_CONNECTIONS;
        let mut default_from_email = DEFAULT_FROM_EMAIL.to_string();

        for (name, value) in vars {
            if name == DATABASE_URL {
                databases.insert(DEFAULT_DB_ALIAS.to_string(), value);
            } else if let Some(alias) = name.strip_prefix(DATABASE_URL_PREFIX) {
                if !alias.is_empty() {
                    databases.insert(alias.to_lowercase(), value);
                }
            } else if name == "DATABASE_MAX_CONNECTIONS" {
                max_connections = match value.parse::<u32>() {
                    Ok(n) if n > 0 => n,
                    _ => return Err(ConfigError::Invalid { name, value }),
                };
            } else if name == "DEFAULT_FROM_EMAIL" && !value.trim().is_empty() {
                default_from_email = value;
            }
        }

        if !databases.contains_key(DEFAULT_DB_ALIAS) {
            return Err(ConfigError::Missing(DATABASE_URL));
        }

        Ok(Self {
            databases,
            max_connections,
            mail: MailConfig { default_from_email },
        })
    }

    /// Returns the configured alias names
    pub fn aliases(&self) -> Vec<&str> {
        self.databases.keys().map(String::as_str).collect()
    }

    /// Returns one pool configuration per alias
    pub fn database_configs(&self) -> Vec<(String, DatabaseConfig)> {
        self.databases
            .iter()
            .map(|(alias, url)| {
                (
                    alias.clone(),
                    DatabaseConfig {
                        url: url.clone(),
                        max_connections: self.max_connections,
                        ..Default::default()
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&[("DATABASE_URL", "postgresql://localhost/orgauth")]))
            .unwrap();

        assert_eq!(config.aliases(), vec!["default"]);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.mail.default_from_email, "webmaster@localhost");
    }

    #[test]
    fn test_missing_database_url() {
        let result = Config::from_vars(vars(&[("DATABASE_URL_REPORTING", "postgresql://r/db")]));
        assert_eq!(result, Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_extra_aliases() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgresql://primary/db"),
            ("DATABASE_URL_REPORTING", "postgresql://replica/db"),
            ("DATABASE_URL_", "postgresql://ignored/db"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();

        assert_eq!(config.aliases(), vec!["default", "reporting"]);

        let configs = config.database_configs();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[1].0, "reporting");
        assert_eq!(configs[1].1.url, "postgresql://replica/db");
        assert_eq!(configs[1].1.max_connections, 4);
    }

    #[test]
    fn test_invalid_max_connections() {
        for bad in ["zero", "0", "-1"] {
            let result = Config::from_vars(vars(&[
                ("DATABASE_URL", "postgresql://localhost/orgauth"),
                ("DATABASE_MAX_CONNECTIONS", bad),
            ]));
            assert!(matches!(result, Err(ConfigError::Invalid { .. })), "{}", bad);
        }
    }

    #[test]
    fn test_default_from_email_override() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgresql://localhost/orgauth"),
            ("DEFAULT_FROM_EMAIL", "noreply@example.jp"),
        ]))
        .unwrap();

        assert_eq!(config.mail.default_from_email, "noreply@example.jp");
    }
}
