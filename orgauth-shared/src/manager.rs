//! User creation
//!
//! [`UserManager`] is the sanctioned way to create user records. Every user
//! it creates has a normalized email and a hashed (or deliberately unusable)
//! password. Building a [`CreateUser`] by hand skips both.
//!
//! # Flag defaults
//!
//! | Flag           | `create_user` | `create_superuser`      |
//! |----------------|---------------|-------------------------|
//! | `is_staff`     | `false`       | `true` (must stay true) |
//! | `is_superuser` | `false`       | `true` (must stay true) |
//!
//! An explicit `false` for either flag passed to `create_superuser` is
//! rejected with a validation error before anything is written.
//!
//! # Example
//!
//! ```
//! use orgauth_shared::manager::{UserFields, UserManager};
//! use orgauth_shared::models::organization::{CreateOrganization, OrganizationStatus};
//! use orgauth_shared::store::{AccountStore, MemoryAccountStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = UserManager::new(MemoryAccountStore::new());
//! let org = manager.store().insert_organization(CreateOrganization {
//!     name: "山田商事".to_string(),
//!     rep_user: None,
//!     email: "info@yamada.example.jp".to_string(),
//!     address: "東京都千代田区1-1".to_string(),
//!     tel: "03-0000-0000".to_string(),
//!     status: OrganizationStatus::Active,
//! }).await?;
//!
//! let user = manager
//!     .create_user(
//!         "Taro@Example.JP",
//!         Some("s3cret"),
//!         UserFields::new(org.id).name("太郎", "山田"),
//!     )
//!     .await?;
//!
//! assert_eq!(user.email, "Taro@example.jp");
//! assert!(!user.is_staff);
//! # Ok(())
//! # }
//! ```

use tracing::{info, warn};
use validator::Validate;

use crate::auth::password::{hash_password, make_unusable_password};
use crate::db::aliases::DatabaseAliases;
use crate::email::normalize_email;
use crate::error::{AccountError, AccountResult};
use crate::models::user::{CreateUser, Role, User};
use crate::store::{AccountStore, PgAccountStore};

/// Fields of a new user other than email and password
///
/// `is_staff` and `is_superuser` are tri-state: `None` means "not specified"
/// and lets the manager apply its defaults, while `Some(value)` is an
/// explicit choice that the manager honours or rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Optional icon path
    pub icon: Option<String>,

    /// Owning organization (must exist)
    pub organization_id: i64,

    /// Permission tier
    pub role: Role,

    /// Active flag
    pub is_active: bool,

    /// Explicit staff flag, if any
    pub is_staff: Option<bool>,

    /// Explicit superuser flag, if any
    pub is_superuser: Option<bool>,

    /// Login name; overwritten with the email by `create_superuser`
    pub username: Option<String>,
}

impl UserFields {
    /// Fields for a general, inactive user of `organization_id` with empty names
    pub fn new(organization_id: i64) -> Self {
        UserFields {
            first_name: String::new(),
            last_name: String::new(),
            icon: None,
            organization_id,
            role: Role::default(),
            is_active: false,
            is_staff: None,
            is_superuser: None,
            username: None,
        }
    }

    /// Sets given and family name
    pub fn name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Sets the icon path
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the role
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets the active flag
    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Explicitly sets the staff flag
    pub fn staff(mut self, is_staff: bool) -> Self {
        self.is_staff = Some(is_staff);
        self
    }

    /// Explicitly sets the superuser flag
    pub fn superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = Some(is_superuser);
        self
    }

    /// Sets the login name
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Creates users through an [`AccountStore`]
#[derive(Debug, Clone)]
pub struct UserManager<S> {
    store: S,
}

impl UserManager<PgAccountStore> {
    /// Returns a manager that writes through the pool registered as `alias`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownAlias` (wrapped) if no pool is registered
    /// under `alias`.
    pub fn using(aliases: &DatabaseAliases, alias: &str) -> AccountResult<Self> {
        Ok(Self::new(aliases.store(alias)?))
    }
}

impl<S: AccountStore> UserManager<S> {
    /// Creates a manager over `store`
    pub fn new(store: S) -> Self {
        UserManager { store }
    }

    /// The store this manager writes through
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Normalizes an email the way the manager does before storing it
    pub fn normalize_email(email: &str) -> String {
        normalize_email(email)
    }

    /// Creates a regular user
    ///
    /// `is_staff` and `is_superuser` default to false unless set in
    /// `fields`. A `None` password produces an account that cannot sign in
    /// with a password until one is set.
    ///
    /// # Errors
    ///
    /// - `AccountError::InvalidFields` if a field exceeds its column size;
    ///   nothing is written
    /// - `AccountError::Store` if the email is taken or the organization is missing
    /// - `AccountError::Password` if hashing fails
    pub async fn create_user(
        &self,
        email: &str,
        password: Option<&str>,
        fields: UserFields,
    ) -> AccountResult<User> {
        let is_staff = fields.is_staff.unwrap_or(false);
        let is_superuser = fields.is_superuser.unwrap_or(false);
        let username = fields.username.clone();

        self.build_user(email, password, fields, is_staff, is_superuser, username)
            .await
    }

    /// Creates a superuser
    ///
    /// Both `is_staff` and `is_superuser` default to true and the login name
    /// is set to the normalized email.
    ///
    /// # Errors
    ///
    /// - `AccountError::Validation` if `fields` explicitly sets `is_staff` or
    ///   `is_superuser` to false; nothing is written
    /// - Otherwise the same errors as [`UserManager::create_user`]
    pub async fn create_superuser(
        &self,
        email: &str,
        password: Option<&str>,
        fields: UserFields,
    ) -> AccountResult<User> {
        let is_staff = fields.is_staff.unwrap_or(true);
        let is_superuser = fields.is_superuser.unwrap_or(true);

        if !is_staff {
            warn!(alias = self.store.alias(), "Rejected superuser with is_staff=false");
            return Err(AccountError::Validation(
                "Superuser must have is_staff=True.".to_string(),
            ));
        }
        if !is_superuser {
            warn!(alias = self.store.alias(), "Rejected superuser with is_superuser=false");
            return Err(AccountError::Validation(
                "Superuser must have is_superuser=True.".to_string(),
            ));
        }

        let username = Some(normalize_email(email));

        self.build_user(email, password, fields, is_staff, is_superuser, username)
            .await
    }

    async fn build_user(
        &self,
        email: &str,
        password: Option<&str>,
        fields: UserFields,
        is_staff: bool,
        is_superuser: bool,
        username: Option<String>,
    ) -> AccountResult<User> {
        let email = normalize_email(email);

        let password = match password {
            Some(raw) => hash_password(raw)?,
            None => make_unusable_password(),
        };

        let data = CreateUser {
            email,
            password,
            username,
            first_name: fields.first_name,
            last_name: fields.last_name,
            icon: fields.icon,
            organization_id: fields.organization_id,
            role: fields.role,
            is_active: fields.is_active,
            is_staff,
            is_superuser,
        };

        data.validate()?;

        let user = self.store.insert_user(data).await?;

        info!(
            alias = self.store.alias(),
            user_id = user.id,
            organization_id = user.organization_id,
            is_staff = user.is_staff,
            is_superuser = user.is_superuser,
            "User created"
        );

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::models::organization::{CreateOrganization, OrganizationStatus};
    use crate::store::{MemoryAccountStore, StoreError};

    async fn manager_with_org() -> (UserManager<MemoryAccountStore>, i64) {
        let manager = UserManager::new(MemoryAccountStore::new());
        let org = manager
            .store()
            .insert_organization(CreateOrganization {
                name: "山田商事".to_string(),
                rep_user: None,
                email: "info@yamada.example.jp".to_string(),
                address: "東京都千代田区1-1".to_string(),
                tel: "03-0000-0000".to_string(),
                status: OrganizationStatus::Active,
            })
            .await
            .expect("Organization should be created");

        (manager, org.id)
    }

    #[tokio::test]
    async fn test_create_user_defaults() {
        let (manager, org_id) = manager_with_org().await;

        let user = manager
            .create_user("taro@EXAMPLE.jp", Some("password"), UserFields::new(org_id))
            .await
            .expect("User should be created");

        assert_eq!(user.email, "taro@example.jp");
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(!user.is_active);
        assert_eq!(user.role, Role::General);
        assert_eq!(user.username, None);
        assert_ne!(user.password, "password");
        assert!(verify_password("password", &user.password).expect("Verify should succeed"));
    }

    #[tokio::test]
    async fn test_create_user_honours_explicit_flags() {
        let (manager, org_id) = manager_with_org().await;

        let user = manager
            .create_user(
                "staff@example.jp",
                Some("password"),
                UserFields::new(org_id)
                    .staff(true)
                    .role(Role::OrgAdmin)
                    .active(true)
                    .icon("icons/staff.png"),
            )
            .await
            .expect("User should be created");

        assert!(user.is_staff);
        assert!(!user.is_superuser);
        assert!(user.is_active);
        assert_eq!(user.role, Role::OrgAdmin);
        assert_eq!(user.icon.as_deref(), Some("icons/staff.png"));
    }

    #[tokio::test]
    async fn test_create_user_without_password_is_unusable() {
        let (manager, org_id) = manager_with_org().await;

        let user = manager
            .create_user("nopass@example.jp", None, UserFields::new(org_id))
            .await
            .expect("User should be created");

        assert!(!user.has_usable_password());
        assert!(!user.check_password("").expect("Check should succeed"));
    }

    #[tokio::test]
    async fn test_create_superuser_defaults() {
        let (manager, org_id) = manager_with_org().await;

        let user = manager
            .create_superuser("Admin@EXAMPLE.JP", Some("password"), UserFields::new(org_id))
            .await
            .expect("Superuser should be created");

        assert!(user.is_staff);
        assert!(user.is_superuser);
        assert_eq!(user.email, "Admin@example.jp");
        assert_eq!(user.username.as_deref(), Some("Admin@example.jp"));
    }

    #[tokio::test]
    async fn test_create_superuser_overrides_supplied_username() {
        let (manager, org_id) = manager_with_org().await;

        let user = manager
            .create_superuser(
                "root@example.jp",
                Some("password"),
                UserFields::new(org_id).username("root"),
            )
            .await
            .expect("Superuser should be created");

        assert_eq!(user.username.as_deref(), Some("root@example.jp"));
    }

    #[tokio::test]
    async fn test_create_superuser_accepts_explicit_true() {
        let (manager, org_id) = manager_with_org().await;

        let user = manager
            .create_superuser(
                "root@example.jp",
                Some("password"),
                UserFields::new(org_id).staff(true).superuser(true),
            )
            .await
            .expect("Superuser should be created");

        assert!(user.is_staff && user.is_superuser);
    }

    #[tokio::test]
    async fn test_create_superuser_rejects_is_staff_false() {
        let (manager, org_id) = manager_with_org().await;

        let err = manager
            .create_superuser("root@example.jp", Some("password"), UserFields::new(org_id).staff(false))
            .await
            .unwrap_err();

        match err {
            AccountError::Validation(msg) => assert_eq!(msg, "Superuser must have is_staff=True."),
            other => panic!("Expected validation error, got {:?}", other),
        }
        assert_eq!(manager.store().user_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_superuser_rejects_is_superuser_false() {
        let (manager, org_id) = manager_with_org().await;

        let err = manager
            .create_superuser(
                "root@example.jp",
                Some("password"),
                UserFields::new(org_id).superuser(false),
            )
            .await
            .unwrap_err();

        match err {
            AccountError::Validation(msg) => {
                assert_eq!(msg, "Superuser must have is_superuser=True.")
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
        assert_eq!(manager.store().user_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_fails_on_second_create() {
        let (manager, org_id) = manager_with_org().await;

        manager
            .create_user("dup@example.jp", Some("a"), UserFields::new(org_id))
            .await
            .expect("First create should succeed");

        // Differs only in domain case, so it normalizes to the same address
        let err = manager
            .create_user("dup@EXAMPLE.JP", Some("b"), UserFields::new(org_id))
            .await
            .unwrap_err();

        assert!(err.is_unique_violation());
        assert_eq!(manager.store().user_count().await, 1);
    }

    #[tokio::test]
    async fn test_local_part_case_makes_a_distinct_user() {
        let (manager, org_id) = manager_with_org().await;

        manager
            .create_user("taro@example.jp", None, UserFields::new(org_id))
            .await
            .expect("First create should succeed");

        assert!(manager
            .create_user("Taro@example.jp", None, UserFields::new(org_id))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_organization_is_a_reference_error() {
        let manager = UserManager::new(MemoryAccountStore::new());

        let err = manager
            .create_user("orphan@example.jp", None, UserFields::new(999))
            .await
            .unwrap_err();

        assert!(err.is_foreign_key_violation());
        assert!(matches!(
            err,
            AccountError::Store(StoreError::ForeignKeyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_organization_delete_cascades_to_created_users() {
        let (manager, org_id) = manager_with_org().await;

        let user = manager
            .create_user("member@example.jp", None, UserFields::new(org_id))
            .await
            .expect("User should be created");
        manager
            .create_superuser("root@example.jp", None, UserFields::new(org_id))
            .await
            .expect("Superuser should be created");

        assert!(manager.store().delete_organization(org_id).await.unwrap());
        assert!(manager.store().find_user(user.id).await.unwrap().is_none());
        assert_eq!(manager.store().user_count().await, 0);
    }

    #[tokio::test]
    async fn test_overlong_first_name_is_rejected_before_write() {
        let (manager, org_id) = manager_with_org().await;

        let err = manager
            .create_user(
                "long@example.jp",
                None,
                UserFields::new(org_id).name("太".repeat(257), "山田"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::InvalidFields(_)));
        assert_eq!(manager.store().user_count().await, 0);

        // Exactly at the column size is accepted
        assert!(manager
            .create_user(
                "long@example.jp",
                None,
                UserFields::new(org_id).name("太".repeat(256), "山田"),
            )
            .await
            .is_ok());
    }

    #[test]
    fn test_normalize_email_matches_module_function() {
        assert_eq!(
            UserManager::<MemoryAccountStore>::normalize_email("a@B.C"),
            "a@b.c"
        );
    }

    #[test]
    fn test_user_fields_builder() {
        let fields = UserFields::new(3)
            .name("太郎", "山田")
            .role(Role::SysAdminGen)
            .username("taro");

        assert_eq!(fields.organization_id, 3);
        assert_eq!(fields.first_name, "太郎");
        assert_eq!(fields.last_name, "山田");
        assert_eq!(fields.role, Role::SysAdminGen);
        assert_eq!(fields.username.as_deref(), Some("taro"));
        assert_eq!(fields.is_staff, None);
        assert_eq!(fields.is_superuser, None);
    }
}
