//! Auth server orchestration

use std::sync::Arc;
use tracing::info;

use crate::transport::HttpTransport;
use auth_core::{AuthService, Settings};

/// Auth server
pub struct AuthServer {
    service: Arc<AuthService>,
    port: u16,
}

impl AuthServer {
    /// Create a server for an opened service
    pub fn new(service: Arc<AuthService>, port: u16) -> Self {
        Self { service, port }
    }

    /// Open the store described by the settings and build a server for it
    pub async fn from_settings(settings: &Settings) -> auth_core::Result<Self> {
        let service = AuthService::open(settings).await?;
        Ok(Self::new(Arc::new(service), settings.port))
    }

    /// Run until Ctrl-C. The store lock is released when the server is dropped.
    pub async fn run(&self) -> std::io::Result<()> {
        let transport = HttpTransport::new(self.service.clone(), self.port);
        transport.run(shutdown_signal()).await?;
        info!("Auth server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
