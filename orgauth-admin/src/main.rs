//! # orgauth Admin Tool
//!
//! Creates organizations and users, deletes organizations (with their users)
//! and sends mail to users, against any configured database alias.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p orgauth-admin -- --apply-schema create-organization \
//!     --name "山田商事" --email info@example.jp
//! ```

use clap::Parser;
use orgauth_admin::commands::{run, Cli};
use orgauth_admin::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orgauth_admin=info,orgauth_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(
        "orgauth-admin v{} using alias '{}'",
        env!("CARGO_PKG_VERSION"),
        cli.database
    );

    run(cli, config).await
}
