//! Command-line interface
//!
//! Each subcommand maps to one account operation. Handlers are generic over
//! [`AccountStore`] and [`MailTransport`] so they run the same against
//! PostgreSQL and the in-memory backends.
//!
//! # Example
//!
//! ```bash
//! orgauth-admin create-organization --name "山田商事" --email info@example.jp
//! orgauth-admin create-superuser admin@example.jp --organization 1 --password 'S3cret!pass'
//! orgauth-admin --database reporting delete-organization 1
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use orgauth_shared::auth::password::validate_password_strength;
use orgauth_shared::db::aliases::{DatabaseAliases, DEFAULT_DB_ALIAS};
use orgauth_shared::db::migrations::run_migrations;
use orgauth_shared::mail::{ConsoleTransport, MailOptions, MailTransport};
use orgauth_shared::models::organization::{CreateOrganization, Organization, OrganizationStatus};
use orgauth_shared::models::user::{Role, User};
use orgauth_shared::store::AccountStore;
use orgauth_shared::{UserFields, UserManager};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::config::Config;

/// `orgauth-admin` command arguments
#[derive(Debug, Parser)]
#[command(
    name = "orgauth-admin",
    about = "Manage organizations and user accounts",
    version
)]
pub struct Cli {
    /// Database alias to run against
    #[arg(long, global = true, value_name = "alias", default_value = DEFAULT_DB_ALIAS)]
    pub database: String,

    /// Apply the bundled schema before running the command
    #[arg(long, global = true)]
    pub apply_schema: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an organization
    CreateOrganization(CreateOrganizationArgs),

    /// Create a regular user
    CreateUser(CreateUserArgs),

    /// Create a superuser (staff and superuser flags set)
    CreateSuperuser(CreateSuperuserArgs),

    /// Delete an organization and all of its users
    DeleteOrganization {
        /// Organization ID
        id: i64,
    },

    /// Send an email to a user
    EmailUser(EmailUserArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CreateOrganizationArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// Contact email (unique among organizations)
    #[arg(long)]
    pub email: String,

    /// Postal address
    #[arg(long, default_value = "")]
    pub address: String,

    /// Phone number
    #[arg(long, default_value = "")]
    pub tel: String,

    /// Representative user ID
    #[arg(long, value_name = "user-id")]
    pub rep_user: Option<i64>,

    /// Create the organization as inactive
    #[arg(long)]
    pub inactive: bool,
}

/// Profile fields shared by `create-user` and `create-superuser`
#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    /// Owning organization ID
    #[arg(long, value_name = "id")]
    pub organization: i64,

    /// Given name
    #[arg(long, default_value = "")]
    pub first_name: String,

    /// Family name
    #[arg(long, default_value = "")]
    pub last_name: String,

    /// Icon path
    #[arg(long)]
    pub icon: Option<String>,

    /// Permission tier
    #[arg(long, value_enum, default_value_t = RoleArg::General)]
    pub role: RoleArg,

    /// Mark the account active
    #[arg(long)]
    pub active: bool,

    /// Skip the password strength check
    #[arg(long)]
    pub allow_weak_password: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CreateUserArgs {
    /// Login email
    pub email: String,

    /// Password; omit to create an account without a usable password
    #[arg(long)]
    pub password: Option<String>,

    /// Login name
    #[arg(long)]
    pub username: Option<String>,

    /// Grant admin-site access
    #[arg(long)]
    pub staff: bool,

    /// Grant every permission
    #[arg(long)]
    pub superuser: bool,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CreateSuperuserArgs {
    /// Login email
    pub email: String,

    /// Password
    #[arg(long, env = "ORGAUTH_SUPERUSER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Debug, Clone, Args)]
pub struct EmailUserArgs {
    /// Recipient's login email
    pub email: String,

    /// Subject line
    #[arg(long)]
    pub subject: String,

    /// Plain-text body
    #[arg(long)]
    pub message: String,

    /// Sender address; defaults to DEFAULT_FROM_EMAIL
    #[arg(long = "from", value_name = "address")]
    pub from_email: Option<String>,

    /// HTML alternative of the body
    #[arg(long)]
    pub html_message: Option<String>,

    /// Report zero messages sent instead of failing on delivery errors
    #[arg(long)]
    pub fail_silently: bool,
}

/// Permission tier as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    General,
    OrgAdmin,
    SysAdminGen,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::General => Role::General,
            RoleArg::OrgAdmin => Role::OrgAdmin,
            RoleArg::SysAdminGen => Role::SysAdminGen,
        }
    }
}

impl ProfileArgs {
    fn fields(&self) -> UserFields {
        let mut fields = UserFields::new(self.organization)
            .name(self.first_name.clone(), self.last_name.clone())
            .role(self.role.into())
            .active(self.active);
        if let Some(icon) = &self.icon {
            fields = fields.icon(icon.clone());
        }
        fields
    }

    fn check_password(&self, password: Option<&str>) -> anyhow::Result<()> {
        match password {
            Some(raw) if !self.allow_weak_password => {
                validate_password_strength(raw).map_err(anyhow::Error::msg)
            }
            _ => Ok(()),
        }
    }
}

/// Result of `delete-organization`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub organization_id: i64,
    pub deleted: bool,
    /// Users counted just before the delete; the cascade removes whatever
    /// is present when it runs, so this is informational
    pub users_before_delete: usize,
}

/// Result of `email-user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailOutcome {
    pub user_id: i64,
    pub email: String,
    pub sent: usize,
}

/// Creates an organization after field validation
pub async fn create_organization<S: AccountStore>(
    store: &S,
    args: CreateOrganizationArgs,
) -> anyhow::Result<Organization> {
    let data = CreateOrganization {
        name: args.name,
        rep_user: args.rep_user,
        email: args.email,
        address: args.address,
        tel: args.tel,
        status: if args.inactive {
            OrganizationStatus::Inactive
        } else {
            OrganizationStatus::Active
        },
    };
    data.validate().context("invalid organization fields")?;

    let org = store
        .insert_organization(data)
        .await
        .context("failed to create organization")?;
    info!(organization_id = org.id, alias = store.alias(), "Organization created");
    Ok(org)
}

/// Creates a regular user
pub async fn create_user<S: AccountStore>(
    manager: &UserManager<S>,
    args: CreateUserArgs,
) -> anyhow::Result<User> {
    args.profile.check_password(args.password.as_deref())?;

    let mut fields = args.profile.fields();
    if args.staff {
        fields = fields.staff(true);
    }
    if args.superuser {
        fields = fields.superuser(true);
    }
    if let Some(username) = args.username {
        fields = fields.username(username);
    }

    let user = manager
        .create_user(&args.email, args.password.as_deref(), fields)
        .await
        .context("failed to create user")?;
    Ok(user)
}

/// Creates a superuser
pub async fn create_superuser<S: AccountStore>(
    manager: &UserManager<S>,
    args: CreateSuperuserArgs,
) -> anyhow::Result<User> {
    let password = args
        .password
        .as_deref()
        .context("a password is required (--password or ORGAUTH_SUPERUSER_PASSWORD)")?;
    args.profile.check_password(Some(password))?;

    let user = manager
        .create_superuser(&args.email, Some(password), args.profile.fields())
        .await
        .context("failed to create superuser")?;
    Ok(user)
}

/// Deletes an organization together with its users
pub async fn delete_organization<S: AccountStore>(
    store: &S,
    id: i64,
) -> anyhow::Result<DeleteOutcome> {
    let users_before_delete = store.list_users_in_organization(id).await?.len();
    let deleted = store
        .delete_organization(id)
        .await
        .context("failed to delete organization")?;

    if !deleted {
        anyhow::bail!("organization {} not found", id);
    }

    info!(organization_id = id, users_before_delete, "Organization deleted");
    Ok(DeleteOutcome {
        organization_id: id,
        deleted,
        users_before_delete,
    })
}

/// Looks a user up by email and sends them a message
pub async fn email_user<S, T>(
    store: &S,
    transport: &T,
    args: EmailUserArgs,
) -> anyhow::Result<EmailOutcome>
where
    S: AccountStore,
    T: MailTransport + ?Sized,
{
    let user = store
        .find_user_by_email(&args.email)
        .await?
        .with_context(|| format!("no user with email {}", args.email))?;

    let options = MailOptions {
        fail_silently: args.fail_silently,
        html_message: args.html_message,
    };
    let sent = user
        .email_user(
            transport,
            &args.subject,
            &args.message,
            args.from_email.as_deref(),
            options,
        )
        .await
        .context("failed to send email")?;

    Ok(EmailOutcome {
        user_id: user.id,
        email: user.email,
        sent,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Connects the configured aliases and runs one command
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let aliases = DatabaseAliases::connect(config.database_configs())
        .await
        .context("failed to connect to database")?;

    let result = dispatch(&aliases, cli, &config).await;
    aliases.close().await;
    result
}

async fn dispatch(aliases: &DatabaseAliases, cli: Cli, config: &Config) -> anyhow::Result<()> {
    let manager = UserManager::using(aliases, &cli.database)?;

    if cli.apply_schema {
        run_migrations(manager.store().pool())
            .await
            .context("failed to apply schema")?;
    }

    match cli.command {
        Command::CreateOrganization(args) => {
            print_json(&create_organization(manager.store(), args).await?)
        }
        Command::CreateUser(args) => print_json(&create_user(&manager, args).await?),
        Command::CreateSuperuser(args) => print_json(&create_superuser(&manager, args).await?),
        Command::DeleteOrganization { id } => {
            print_json(&delete_organization(manager.store(), id).await?)
        }
        Command::EmailUser(args) => {
            let transport = ConsoleTransport::new(config.mail.default_from_email.clone());
            print_json(&email_user(manager.store(), &transport, args).await?)
        }
    }
}
