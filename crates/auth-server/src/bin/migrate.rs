//! Offline store maintenance
//!
//! `migrate` hashes every plaintext stored value and keeps the original as
//! `<store>.bak`. `restore` puts the backup back after an interrupted run.
//! Both refuse to run while the server holds the store lock.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use auth_core::migration::plan;
use auth_core::{CredentialHasher, HashScheme, Migration, SecretString, Settings};

#[derive(Parser, Debug)]
#[command(name = "auth-migrate")]
#[command(version)]
#[command(about = "Migrate a credential store from plaintext to hashed passwords")]
struct Args {
    /// Settings file (camelCase JSON)
    #[arg(long, global = true, env = "AUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Credential store file
    #[arg(long, global = true, env = "AUTH_STORE_PATH")]
    store: Option<PathBuf>,

    /// Hash scheme for new digests
    #[arg(long, global = true, value_enum)]
    scheme: Option<SchemeArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash every plaintext password in the store
    Migrate {
        /// Report what would change without touching any file
        #[arg(long)]
        dry_run: bool,
    },
    /// Move `<store>.bak` back onto the store path
    Restore,
    /// Print the stored form of a password read from the terminal
    HashPassword,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SchemeArg {
    Argon2,
    Pbkdf2,
}

impl From<SchemeArg> for HashScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Argon2 => HashScheme::Argon2,
            SchemeArg::Pbkdf2 => HashScheme::Pbkdf2,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::new(),
    };
    if let Some(store) = args.store {
        settings.store_path = store;
    }
    if let Some(scheme) = args.scheme {
        settings.hash_scheme = scheme.into();
    }
    settings.validate()?;

    match args.command {
        Command::Migrate { dry_run: true } => {
            let records = settings.storage().read().await?;
            let summary = plan(&records);
            println!(
                "{}: {} to hash, {} already hashed, {} empty",
                settings.store_path.display(),
                summary.hashed,
                summary.unchanged,
                summary.empty
            );
        }
        Command::Migrate { dry_run: false } => {
            let migration = Migration::new(settings.storage(), settings.hasher());
            let report = migration.run().await.with_context(|| {
                format!("Migration of {} failed", settings.store_path.display())
            })?;
            println!(
                "Migrated {} ({} hashed, {} already hashed, {} empty). Original saved to {}",
                settings.store_path.display(),
                report.summary.hashed,
                report.summary.unchanged,
                report.summary.empty,
                report.backup_path.display()
            );
        }
        Command::Restore => {
            let migration = Migration::new(settings.storage(), settings.hasher());
            let restored = migration.restore().await?;
            println!("Restored {}", restored.display());
        }
        Command::HashPassword => {
            let password = SecretString::new(rpassword::prompt_password("Password: ")?);
            let hasher: CredentialHasher = settings.hasher();
            let stored = tokio::task::spawn_blocking(move || hasher.hash(password.expose())).await??;
            info!("Hashed with {:?}", settings.hash_scheme);
            println!("{}", stored);
        }
    }

    Ok(())
}
