//! Organization model and database operations
//!
//! Organizations are the tenants of the application. Every user belongs to
//! exactly one organization, and deleting an organization deletes its users.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE organizations (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(256) NOT NULL,
//!     rep_user BIGINT,
//!     email VARCHAR(254) NOT NULL,
//!     address VARCHAR(512) NOT NULL,
//!     tel VARCHAR(32) NOT NULL,
//!     status INTEGER NOT NULL,
//!     CONSTRAINT organizations_email_key UNIQUE (email),
//!     CONSTRAINT organizations_status_check CHECK (status IN (0, 1))
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use orgauth_shared::models::organization::{CreateOrganization, Organization, OrganizationStatus};
//! use orgauth_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let org = Organization::create(&pool, CreateOrganization {
//!     name: "山田商事".to_string(),
//!     rep_user: None,
//!     email: "info@yamada.example.jp".to_string(),
//!     address: "東京都千代田区1-1".to_string(),
//!     tel: "03-0000-0000".to_string(),
//!     status: OrganizationStatus::Active,
//! }).await?;
//!
//! Organization::update_status(&pool, org.id, OrganizationStatus::Inactive).await?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use super::user::User;

/// Organization lifecycle status
///
/// Stored as an integer: `0` active, `1` inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    /// Organization is in use
    Active = 0,

    /// Organization is suspended or closed
    Inactive = 1,
}

impl OrganizationStatus {
    /// Numeric value as stored in the database
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Parses a stored numeric value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(OrganizationStatus::Active),
            1 => Some(OrganizationStatus::Inactive),
            _ => None,
        }
    }

    /// Human-readable label shown in administrative screens
    pub fn label(&self) -> &'static str {
        match self {
            OrganizationStatus::Active => "アクティブ",
            OrganizationStatus::Inactive => "非アクティブ",
        }
    }
}

/// Organization model representing a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    /// Unique organization ID
    pub id: i64,

    /// Organization name
    pub name: String,

    /// ID of the user responsible for this organization
    ///
    /// This is a loose reference: it is not a foreign key and may point at a
    /// user that no longer exists. Use [`Organization::representative`] to
    /// resolve it.
    pub rep_user: Option<i64>,

    /// Address that receives notices for the organization
    ///
    /// Must be unique across all organizations
    pub email: String,

    /// Postal address
    pub address: String,

    /// Main telephone number
    pub tel: String,

    /// Lifecycle status
    pub status: OrganizationStatus,
}

/// Input for creating a new organization
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrganization {
    /// Organization name
    #[validate(length(max = 256))]
    pub name: String,

    /// ID of the responsible user, if known
    pub rep_user: Option<i64>,

    /// Notice address (unique)
    #[validate(email, length(max = 254))]
    pub email: String,

    /// Postal address
    #[validate(length(max = 512))]
    pub address: String,

    /// Main telephone number
    #[validate(length(max = 32))]
    pub tel: String,

    /// Initial status (defaults to Active)
    #[serde(default = "default_status")]
    pub status: OrganizationStatus,
}

fn default_status() -> OrganizationStatus {
    OrganizationStatus::Active
}

/// Input for updating an existing organization
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrganization {
    /// New name
    pub name: Option<String>,

    /// New responsible user (use Some(None) to clear)
    pub rep_user: Option<Option<i64>>,

    /// New notice address
    pub email: Option<String>,

    /// New postal address
    pub address: Option<String>,

    /// New telephone number
    pub tel: Option<String>,

    /// New status
    pub status: Option<OrganizationStatus>,
}

const ORGANIZATION_COLUMNS: &str = "id, name, rep_user, email, address, tel, status";

impl Organization {
    /// Creates a new organization in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (`organizations_email_key` violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateOrganization) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO organizations (name, rep_user, email, address, tel, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ORGANIZATION_COLUMNS
        );

        let organization = sqlx::query_as::<_, Organization>(&query)
            .bind(data.name)
            .bind(data.rep_user)
            .bind(data.email)
            .bind(data.address)
            .bind(data.tel)
            .bind(data.status)
            .fetch_one(pool)
            .await?;

        Ok(organization)
    }

    /// Finds an organization by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM organizations WHERE id = $1", ORGANIZATION_COLUMNS);

        let organization = sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(organization)
    }

    /// Finds an organization by its notice address (exact match)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM organizations WHERE email = $1", ORGANIZATION_COLUMNS);

        let organization = sqlx::query_as::<_, Organization>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(organization)
    }

    /// Updates an existing organization
    ///
    /// Only non-None fields in `data` are written.
    ///
    /// # Returns
    ///
    /// The updated organization if found, None if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the new email belongs to another organization or
    /// the database connection fails
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateOrganization,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut assignments = Vec::new();
        let mut bind_count = 1;

        for (column, present) in [
            ("name", data.name.is_some()),
            ("rep_user", data.rep_user.is_some()),
            ("email", data.email.is_some()),
            ("address", data.address.is_some()),
            ("tel", data.tel.is_some()),
            ("status", data.status.is_some()),
        ] {
            if present {
                bind_count += 1;
                assignments.push(format!("{} = ${}", column, bind_count));
            }
        }

        if assignments.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let query = format!(
            "UPDATE organizations SET {} WHERE id = $1 RETURNING {}",
            assignments.join(", "),
            ORGANIZATION_COLUMNS
        );

        let mut q = sqlx::query_as::<_, Organization>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(rep_user) = data.rep_user {
            q = q.bind(rep_user);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(address) = data.address {
            q = q.bind(address);
        }
        if let Some(tel) = data.tel {
            q = q.bind(tel);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        let organization = q.fetch_optional(pool).await?;

        Ok(organization)
    }

    /// Changes an organization's status
    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        status: OrganizationStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        Self::update(
            pool,
            id,
            UpdateOrganization {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes an organization by ID
    ///
    /// ⚠️  **WARNING**: This cascades to every user of the organization.
    ///
    /// # Returns
    ///
    /// True if the organization was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists organizations ordered by ID
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM organizations ORDER BY id LIMIT $1 OFFSET $2",
            ORGANIZATION_COLUMNS
        );

        let organizations = sqlx::query_as::<_, Organization>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(organizations)
    }

    /// Counts total number of organizations
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Resolves `rep_user` to a user record
    ///
    /// Returns None when no representative is set or when the stored ID no
    /// longer matches a user.
    pub async fn representative(&self, pool: &PgPool) -> Result<Option<User>, sqlx::Error> {
        match self.rep_user {
            Some(user_id) => User::find_by_id(pool, user_id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input(email: &str) -> CreateOrganization {
        CreateOrganization {
            name: "山田商事".to_string(),
            rep_user: None,
            email: email.to_string(),
            address: "東京都千代田区1-1".to_string(),
            tel: "03-0000-0000".to_string(),
            status: OrganizationStatus::Active,
        }
    }

    #[test]
    fn test_status_values() {
        assert_eq!(OrganizationStatus::Active.as_i32(), 0);
        assert_eq!(OrganizationStatus::Inactive.as_i32(), 1);
        assert_eq!(OrganizationStatus::from_i32(0), Some(OrganizationStatus::Active));
        assert_eq!(OrganizationStatus::from_i32(1), Some(OrganizationStatus::Inactive));
        assert_eq!(OrganizationStatus::from_i32(2), None);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(OrganizationStatus::Active.label(), "アクティブ");
        assert_eq!(OrganizationStatus::Inactive.label(), "非アクティブ");
    }

    #[test]
    fn test_create_organization_default_status() {
        let input: CreateOrganization = serde_json::from_value(serde_json::json!({
            "name": "Acme",
            "rep_user": null,
            "email": "acme@example.com",
            "address": "1 Main St",
            "tel": "555-0100"
        }))
        .expect("Should deserialize");

        assert_eq!(input.status, OrganizationStatus::Active);
    }

    #[test]
    fn test_create_organization_validation() {
        assert!(create_input("info@example.com").validate().is_ok());
        assert!(create_input("not-an-email").validate().is_err());

        let mut long_tel = create_input("info@example.com");
        long_tel.tel = "0".repeat(33);
        assert!(long_tel.validate().is_err());
    }

    #[test]
    fn test_update_organization_default() {
        let update = UpdateOrganization::default();
        assert!(update.name.is_none());
        assert!(update.rep_user.is_none());
        assert!(update.status.is_none());
    }

    // Integration tests for database operations are in tests/store_postgres_tests.rs
}
