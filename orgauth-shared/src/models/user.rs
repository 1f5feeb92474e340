//! User model and database operations
//!
//! Users sign in with their email address and belong to exactly one
//! organization. Records should be created through
//! [`UserManager`](crate::manager::UserManager), which normalizes the email
//! and hashes the password; inserting a [`CreateUser`] directly skips both.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id BIGSERIAL PRIMARY KEY,
//!     password VARCHAR(255) NOT NULL,
//!     last_login TIMESTAMPTZ,
//!     email VARCHAR(254) NOT NULL,
//!     username VARCHAR(254),
//!     first_name VARCHAR(256) NOT NULL,
//!     last_name VARCHAR(256) NOT NULL,
//!     icon VARCHAR(512),
//!     organization_id BIGINT NOT NULL
//!         REFERENCES organizations(id) ON DELETE CASCADE,
//!     role INTEGER NOT NULL,
//!     is_active BOOLEAN NOT NULL DEFAULT FALSE,
//!     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
//!     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CONSTRAINT users_email_key UNIQUE (email)
//! );
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::auth::password::{
    hash_password, is_password_usable, make_unusable_password, verify_password, PasswordError,
};
use crate::email::normalize_email;
use crate::error::AccountResult;
use crate::mail::{send_mail, MailOptions, MailTransport};

/// Coarse permission tier of a user
///
/// Stored as an integer. Values between `OrgAdmin` (1) and `SysAdminGen` (50)
/// are reserved for intermediate tiers, so roles compare by value.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular member of an organization
    #[default]
    General = 0,

    /// Manages the users of their own organization
    OrgAdmin = 1,

    /// General system administrator
    SysAdminGen = 50,
}

impl Role {
    /// Numeric value as stored in the database
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Parses a stored numeric value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Role::General),
            1 => Some(Role::OrgAdmin),
            50 => Some(Role::SysAdminGen),
            _ => None,
        }
    }

    /// Human-readable label shown in administrative screens
    pub fn label(&self) -> &'static str {
        match self {
            Role::General => "一般ユーザー",
            Role::OrgAdmin => "組織管理者",
            Role::SysAdminGen => "システム管理者（一般）",
        }
    }

    /// Checks if this role is at least the required tier
    ///
    /// Hierarchy: SysAdminGen > OrgAdmin > General
    pub fn has_permission(&self, required: Role) -> bool {
        self.as_i32() >= required.as_i32()
    }

    /// Can manage users of an organization
    pub fn can_manage_users(&self) -> bool {
        self.has_permission(Role::OrgAdmin)
    }
}

/// User model representing an account
///
/// `password` holds an Argon2id PHC string or an unusable marker, never the
/// raw password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, Validate)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Stored credential
    #[serde(skip_serializing)]
    pub password: String,

    /// When the user last logged in (None if never)
    pub last_login: Option<DateTime<Utc>>,

    /// Email address, also the login identifier
    ///
    /// Unique across all users and always normalized
    #[validate(email, length(max = 254))]
    pub email: String,

    /// Login name, set to the email for superusers
    #[validate(length(max = 254))]
    pub username: Option<String>,

    /// Given name
    #[validate(length(max = 256))]
    pub first_name: String,

    /// Family name
    #[validate(length(max = 256))]
    pub last_name: String,

    /// Path of the profile icon
    #[validate(length(max = 512))]
    pub icon: Option<String>,

    /// Owning organization
    pub organization_id: i64,

    /// Permission tier
    pub role: Role,

    /// Whether the account may sign in
    pub is_active: bool,

    /// Whether the account may use administrative screens
    pub is_staff: bool,

    /// Whether the account bypasses permission checks
    pub is_superuser: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a user record
///
/// `email` must already be normalized and `password` already hashed. The
/// length limits mirror the column sizes in `migrations/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    /// Normalized email address
    #[validate(length(max = 254))]
    pub email: String,

    /// Hashed credential (NOT a plaintext password!)
    #[serde(skip_serializing)]
    #[validate(length(max = 255))]
    pub password: String,

    /// Optional login name
    #[validate(length(max = 254))]
    pub username: Option<String>,

    /// Given name
    #[validate(length(max = 256))]
    pub first_name: String,

    /// Family name
    #[validate(length(max = 256))]
    pub last_name: String,

    /// Optional icon path
    #[validate(length(max = 512))]
    pub icon: Option<String>,

    /// Owning organization
    pub organization_id: i64,

    /// Permission tier
    pub role: Role,

    /// Active flag
    pub is_active: bool,

    /// Staff flag
    pub is_staff: bool,

    /// Superuser flag
    pub is_superuser: bool,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address (normalized before it is written)
    pub email: Option<String>,

    /// New hashed credential
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// New login name (use Some(None) to clear)
    pub username: Option<Option<String>>,

    /// New given name
    pub first_name: Option<String>,

    /// New family name
    pub last_name: Option<String>,

    /// New icon path (use Some(None) to clear)
    pub icon: Option<Option<String>>,

    /// New permission tier
    pub role: Option<Role>,

    /// New active flag
    pub is_active: Option<bool>,

    /// New staff flag
    pub is_staff: Option<bool>,

    /// New superuser flag
    pub is_superuser: Option<bool>,
}

const USER_COLUMNS: &str = "id, password, last_login, email, username, first_name, last_name, \
                            icon, organization_id, role, is_active, is_staff, is_superuser, \
                            created_at, updated_at";

impl User {
    /// Returns the user's full name, family name first
    ///
    /// ```
    /// # use orgauth_shared::models::user::{Role, User};
    /// # let now = chrono::Utc::now();
    /// # let user = User {
    /// #     id: 1, password: String::new(), last_login: None,
    /// #     email: "taro@example.jp".into(), username: None,
    /// #     first_name: "太郎".into(), last_name: "山田".into(), icon: None,
    /// #     organization_id: 1, role: Role::General,
    /// #     is_active: true, is_staff: false, is_superuser: false,
    /// #     created_at: now, updated_at: now,
    /// # };
    /// assert_eq!(user.full_name(), "山田 太郎");
    /// ```
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// The value users sign in with, which is the email address
    pub fn username_value(&self) -> &str {
        &self.email
    }

    /// Normalizes the email and validates field formats
    ///
    /// Run before saving a record that was edited in memory. Calling it on
    /// an already clean record changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidFields` if the email is malformed or a
    /// field exceeds its maximum length.
    pub fn clean(&mut self) -> AccountResult<()> {
        self.email = normalize_email(&self.email);
        self.validate()?;
        Ok(())
    }

    /// Replaces the stored credential with a hash of `raw_password`
    ///
    /// Only the in-memory record changes; persist it with [`User::update`].
    pub fn set_password(&mut self, raw_password: &str) -> Result<(), PasswordError> {
        self.password = hash_password(raw_password)?;
        Ok(())
    }

    /// Checks a raw password against the stored credential
    pub fn check_password(&self, raw_password: &str) -> Result<bool, PasswordError> {
        verify_password(raw_password, &self.password)
    }

    /// Replaces the stored credential with one no password matches
    pub fn set_unusable_password(&mut self) {
        self.password = make_unusable_password();
    }

    /// Returns false if the account was given an unusable credential
    pub fn has_usable_password(&self) -> bool {
        is_password_usable(&self.password)
    }

    /// Sends an email to this user
    ///
    /// The message goes to the user's address only. `from_email` falls back
    /// to the transport's default sender. Transport failures are returned
    /// unchanged unless `options.fail_silently` is set; nothing is retried.
    ///
    /// # Returns
    ///
    /// Number of messages handed to the transport (0 or 1)
    pub async fn email_user<T>(
        &self,
        transport: &T,
        subject: &str,
        message: &str,
        from_email: Option<&str>,
        options: MailOptions,
    ) -> AccountResult<usize>
    where
        T: MailTransport + ?Sized,
    {
        let sent = send_mail(
            transport,
            subject,
            message,
            from_email,
            &[self.email.as_str()],
            options,
        )
        .await?;

        Ok(sent)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.email)
    }
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (`users_email_key` violation)
    /// - The organization doesn't exist (`users_organization_id_fkey` violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, password, username, first_name, last_name, icon,
                               organization_id, role, is_active, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password)
            .bind(data.username)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.icon)
            .bind(data.organization_id)
            .bind(data.role)
            .bind(data.is_active)
            .bind(data.is_staff)
            .bind(data.is_superuser)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// The lookup address is normalized first, so `taro@EXAMPLE.jp` finds
    /// `taro@example.jp`. The local part stays case-sensitive.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Lists the users of an organization ordered by ID
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users WHERE organization_id = $1 ORDER BY id",
            USER_COLUMNS
        );

        let users = sqlx::query_as::<_, User>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated. `updated_at` is always
    /// refreshed and `created_at` is never written.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the new email belongs to another user or the
    /// database connection fails
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        for (column, present) in [
            ("email", data.email.is_some()),
            ("password", data.password.is_some()),
            ("username", data.username.is_some()),
            ("first_name", data.first_name.is_some()),
            ("last_name", data.last_name.is_some()),
            ("icon", data.icon.is_some()),
            ("role", data.role.is_some()),
            ("is_active", data.is_active.is_some()),
            ("is_staff", data.is_staff.is_some()),
            ("is_superuser", data.is_superuser.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(normalize_email(&email));
        }
        if let Some(password) = data.password {
            q = q.bind(password);
        }
        if let Some(username) = data.username {
            q = q.bind(username);
        }
        if let Some(first_name) = data.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            q = q.bind(last_name);
        }
        if let Some(icon) = data.icon {
            q = q.bind(icon);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }
        if let Some(is_staff) = data.is_staff {
            q = q.bind(is_staff);
        }
        if let Some(is_superuser) = data.is_superuser {
            q = q.bind(is_superuser);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Records a successful login
    ///
    /// # Returns
    ///
    /// True if user was found and updated, false otherwise
    pub async fn update_last_login(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user by ID
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts total number of users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccountError;
    use crate::mail::memory::MemoryTransport;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            password: make_unusable_password(),
            last_login: None,
            email: "taro.yamada@example.jp".to_string(),
            username: None,
            first_name: "太郎".to_string(),
            last_name: "山田".to_string(),
            icon: None,
            organization_id: 1,
            role: Role::General,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_values() {
        assert_eq!(Role::General.as_i32(), 0);
        assert_eq!(Role::OrgAdmin.as_i32(), 1);
        assert_eq!(Role::SysAdminGen.as_i32(), 50);
        assert_eq!(Role::from_i32(50), Some(Role::SysAdminGen));
        assert_eq!(Role::from_i32(2), None);
        assert_eq!(Role::default(), Role::General);
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::SysAdminGen.has_permission(Role::OrgAdmin));
        assert!(Role::OrgAdmin.has_permission(Role::OrgAdmin));
        assert!(!Role::General.has_permission(Role::OrgAdmin));
        assert!(Role::OrgAdmin.can_manage_users());
        assert!(!Role::General.can_manage_users());
        assert!(Role::General < Role::SysAdminGen);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::General.label(), "一般ユーザー");
        assert_eq!(Role::OrgAdmin.label(), "組織管理者");
        assert_eq!(Role::SysAdminGen.label(), "システム管理者（一般）");
    }

    #[test]
    fn test_full_name_is_family_name_first() {
        assert_eq!(sample_user().full_name(), "山田 太郎");
    }

    #[test]
    fn test_full_name_with_empty_parts() {
        let mut user = sample_user();
        user.first_name = String::new();
        user.last_name = String::new();
        assert_eq!(user.full_name(), " ");
    }

    #[test]
    fn test_display_is_email() {
        let user = sample_user();
        assert_eq!(user.to_string(), "taro.yamada@example.jp");
        assert_eq!(user.username_value(), "taro.yamada@example.jp");
    }

    #[test]
    fn test_clean_normalizes_email() {
        let mut user = sample_user();
        user.email = "Taro.Yamada@EXAMPLE.JP".to_string();

        user.clean().expect("Clean should succeed");
        assert_eq!(user.email, "Taro.Yamada@example.jp");

        // Second pass changes nothing
        let before = user.clone();
        user.clean().expect("Clean should succeed");
        assert_eq!(user, before);
    }

    #[test]
    fn test_clean_rejects_invalid_fields() {
        let mut user = sample_user();
        user.email = "not-an-email".to_string();
        assert!(matches!(user.clean(), Err(AccountError::InvalidFields(_))));

        let mut user = sample_user();
        user.icon = Some("a".repeat(513));
        assert!(matches!(user.clean(), Err(AccountError::InvalidFields(_))));
    }

    #[test]
    fn test_password_helpers() {
        let mut user = sample_user();
        assert!(!user.has_usable_password());
        assert!(!user.check_password("anything").expect("Check should succeed"));

        user.set_password("S3cret!pass").expect("Hash should succeed");
        assert!(user.has_usable_password());
        assert_ne!(user.password, "S3cret!pass");
        assert!(user.check_password("S3cret!pass").expect("Check should succeed"));

        user.set_unusable_password();
        assert!(!user.check_password("S3cret!pass").expect("Check should succeed"));
    }

    #[test]
    fn test_password_is_not_serialized() {
        let json = serde_json::to_value(sample_user()).expect("Should serialize");
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "general");
    }

    #[tokio::test]
    async fn test_email_user_sends_to_own_address() {
        let transport = MemoryTransport::new("noreply@example.jp");
        let user = sample_user();

        let sent = user
            .email_user(&transport, "件名", "本文", None, MailOptions::default())
            .await
            .expect("Send should succeed");

        assert_eq!(sent, 1);
        let outbox = transport.outbox().await;
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, vec!["taro.yamada@example.jp".to_string()]);
        assert_eq!(outbox[0].subject, "件名");
        assert_eq!(outbox[0].body, "本文");
        assert_eq!(outbox[0].from_email, "noreply@example.jp");
    }

    #[tokio::test]
    async fn test_email_user_propagates_transport_failure() {
        let transport = MemoryTransport::new("noreply@example.jp");
        transport.fail_next("connection refused").await;

        let result = sample_user()
            .email_user(&transport, "s", "m", Some("admin@example.jp"), MailOptions::default())
            .await;

        assert!(matches!(result, Err(AccountError::Mail(_))));
        assert!(transport.outbox().await.is_empty());
    }

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.email.is_none());
        assert!(update.password.is_none());
        assert!(update.username.is_none());
        assert!(update.icon.is_none());
        assert!(update.is_superuser.is_none());
    }
}
