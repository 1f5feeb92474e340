//! Schema bootstrap
//!
//! Applies the SQL files in `orgauth-shared/migrations/` with sqlx's
//! migrator. The files are embedded at compile time, so the binary carries
//! its own schema. Only forward application is supported.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Applies every pending schema file
///
/// Already-applied files are skipped, so calling this repeatedly is safe.
///
/// # Errors
///
/// Returns an error if a file fails to apply or the connection is lost;
/// the failing file is rolled back.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Applying database schema");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!("Schema migration failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_schema_files_are_embedded() {
        let migrator = sqlx::migrate!("./migrations");
        let descriptions: Vec<_> = migrator
            .iter()
            .map(|m| m.description.to_string())
            .collect();

        assert_eq!(descriptions, vec!["create organizations", "create users"]);
    }
}
