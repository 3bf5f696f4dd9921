//! Auth service HTTP server
//!
//! Serves login, registration and token lookups from a JSON credential store.
//! Settings come from an optional JSON file, overridden by flags and environment.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use auth_core::Settings;
use auth_server::AuthServer;

/// Credential login service
#[derive(Parser, Debug)]
#[command(name = "auth-server")]
#[command(version)]
#[command(about = "Login and registration service backed by a JSON credential store")]
struct Args {
    /// Settings file (camelCase JSON)
    #[arg(long, env = "AUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Credential store file
    #[arg(long, env = "AUTH_STORE_PATH")]
    store: Option<PathBuf>,

    /// Port for the HTTP server
    #[arg(long, env = "AUTH_PORT")]
    port: Option<u16>,

    /// Secret used to sign identity tokens
    #[arg(long, env = "AUTH_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,
}

impl Args {
    fn settings(self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::new(),
        };

        if let Some(store) = self.store {
            settings.store_path = store;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(secret) = self.token_secret {
            settings.token_secret = secret;
        }

        settings.validate()?;
        Ok(settings)
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

    let settings = Args::parse().settings()?;

    if settings.uses_dev_secret() {
        warn!("Using the built-in development token secret - set AUTH_TOKEN_SECRET in production");
    }

    let server = AuthServer::from_settings(&settings)
        .await
        .with_context(|| format!("Failed to open store {}", settings.store_path.display()))?;

    info!("Starting auth server on http://localhost:{}", settings.port);
    server.run().await?;

    Ok(())
}
