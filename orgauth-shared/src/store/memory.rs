//! In-memory account store
//!
//! Enforces the same constraints as the PostgreSQL schema so that account
//! logic can be exercised without a database: unique emails per table, a
//! foreign key from users to organizations, cascading organization deletes
//! and the `VARCHAR` column limits. Constraint names match the schema's.
//! The `status` and `role` CHECK constraints need no counterpart here since
//! their Rust enums cannot hold other values.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    AccountStore, StoreError, StoreResult, ORGANIZATIONS_EMAIL_KEY, USERS_EMAIL_KEY,
    USERS_ORGANIZATION_FKEY,
};
use crate::db::aliases::DEFAULT_DB_ALIAS;
use crate::email::normalize_email;
use crate::models::organization::{CreateOrganization, Organization};
use crate::models::user::{CreateUser, UpdateUser, User};

/// `(column, max chars)` as declared in `migrations/`
const ORGANIZATION_LIMITS: [(&str, usize); 4] = [
    ("organizations.name", 256),
    ("organizations.email", 254),
    ("organizations.address", 512),
    ("organizations.tel", 32),
];

fn check_length(column: &str, value: &str, max: usize) -> StoreResult<()> {
    if value.chars().count() > max {
        return Err(StoreError::ValueTooLong(format!(
            "{} exceeds {} characters",
            column, max
        )));
    }
    Ok(())
}

fn check_user_lengths(
    email: Option<&str>,
    password: Option<&str>,
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    icon: Option<&str>,
) -> StoreResult<()> {
    for (column, value, max) in [
        ("users.email", email, 254),
        ("users.password", password, 255),
        ("users.username", username, 254),
        ("users.first_name", first_name, 256),
        ("users.last_name", last_name, 256),
        ("users.icon", icon, 512),
    ] {
        if let Some(value) = value {
            check_length(column, value, max)?;
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Tables {
    organizations: BTreeMap<i64, Organization>,
    users: BTreeMap<i64, User>,
    next_organization_id: i64,
    next_user_id: i64,
}

impl Tables {
    fn user_email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// Account store holding records in process memory
#[derive(Debug)]
pub struct MemoryAccountStore {
    alias: String,
    tables: Mutex<Tables>,
}

impl MemoryAccountStore {
    /// Creates an empty store on the default alias
    pub fn new() -> Self {
        Self::with_alias(DEFAULT_DB_ALIAS)
    }

    /// Creates an empty store labelled with a connection alias
    pub fn with_alias(alias: impl Into<String>) -> Self {
        MemoryAccountStore {
            alias: alias.into(),
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    /// Number of stored organizations
    pub async fn organization_count(&self) -> usize {
        self.tables.lock().await.organizations.len()
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    fn alias(&self) -> &str {
        &self.alias
    }

    async fn insert_organization(&self, data: CreateOrganization) -> StoreResult<Organization> {
        let values = [&data.name, &data.email, &data.address, &data.tel];
        for ((column, max), value) in ORGANIZATION_LIMITS.iter().zip(values) {
            check_length(column, value, *max)?;
        }

        let mut tables = self.tables.lock().await;

        if tables.organizations.values().any(|o| o.email == data.email) {
            return Err(StoreError::UniqueViolation {
                constraint: ORGANIZATIONS_EMAIL_KEY.to_string(),
            });
        }

        tables.next_organization_id += 1;
        let organization = Organization {
            id: tables.next_organization_id,
            name: data.name,
            rep_user: data.rep_user,
            email: data.email,
            address: data.address,
            tel: data.tel,
            status: data.status,
        };
        tables
            .organizations
            .insert(organization.id, organization.clone());

        debug!(alias = %self.alias, organization_id = organization.id, "Organization stored in memory");
        Ok(organization)
    }

    async fn find_organization(&self, id: i64) -> StoreResult<Option<Organization>> {
        Ok(self.tables.lock().await.organizations.get(&id).cloned())
    }

    async fn delete_organization(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;

        if tables.organizations.remove(&id).is_none() {
            return Ok(false);
        }

        let before = tables.users.len();
        tables.users.retain(|_, u| u.organization_id != id);
        debug!(
            alias = %self.alias,
            organization_id = id,
            cascaded_users = before - tables.users.len(),
            "Organization deleted from memory"
        );

        Ok(true)
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        check_user_lengths(
            Some(&data.email),
            Some(&data.password),
            data.username.as_deref(),
            Some(&data.first_name),
            Some(&data.last_name),
            data.icon.as_deref(),
        )?;

        let mut tables = self.tables.lock().await;

        if !tables.organizations.contains_key(&data.organization_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: USERS_ORGANIZATION_FKEY.to_string(),
            });
        }
        if tables.user_email_taken(&data.email, None) {
            return Err(StoreError::UniqueViolation {
                constraint: USERS_EMAIL_KEY.to_string(),
            });
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.next_user_id,
            password: data.password,
            last_login: None,
            email: data.email,
            username: data.username,
            first_name: data.first_name,
            last_name: data.last_name,
            icon: data.icon,
            organization_id: data.organization_id,
            role: data.role,
            is_active: data.is_active,
            is_staff: data.is_staff,
            is_superuser: data.is_superuser,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        debug!(alias = %self.alias, user_id = user.id, "User stored in memory");
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.lock().await;

        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users_in_organization(&self, organization_id: i64) -> StoreResult<Vec<User>> {
        let tables = self.tables.lock().await;

        Ok(tables
            .users
            .values()
            .filter(|u| u.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: i64, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.lock().await;

        if !tables.users.contains_key(&id) {
            return Ok(None);
        }

        let email = data.email.as_deref().map(normalize_email);
        check_user_lengths(
            email.as_deref(),
            data.password.as_deref(),
            data.username.as_ref().and_then(|u| u.as_deref()),
            data.first_name.as_deref(),
            data.last_name.as_deref(),
            data.icon.as_ref().and_then(|i| i.as_deref()),
        )?;
        if let Some(ref email) = email {
            if tables.user_email_taken(email, Some(id)) {
                return Err(StoreError::UniqueViolation {
                    constraint: USERS_EMAIL_KEY.to_string(),
                });
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(email) = email {
            user.email = email;
        }
        if let Some(password) = data.password {
            user.password = password;
        }
        if let Some(username) = data.username {
            user.username = username;
        }
        if let Some(first_name) = data.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = data.last_name {
            user.last_name = last_name;
        }
        if let Some(icon) = data.icon {
            user.icon = icon;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        if let Some(is_active) = data.is_active {
            user.is_active = is_active;
        }
        if let Some(is_staff) = data.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_superuser) = data.is_superuser {
            user.is_superuser = is_superuser;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().await.users.remove(&id).is_some())
    }
}
