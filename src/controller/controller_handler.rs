use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::configuration::config::Config;
use crate::data_capture::frame_source::{ScreenProvider, SyntheticScreen};
use crate::data_capture::recorder::CaptureLoop;
use crate::error_handling::types::*;
use crate::session_management::session::CaptureSession;
use crate::storage::file_storage::FileStorage;
use crate::storage::storage_trait::Storage;
use crate::storage::types::PurgeReport;
use crate::web_interface::web_server::ArtifactServer;

/// Lifecycle owner of the capture-and-serve pipeline.
///
/// Plays the part of the platform: it starts the artifact server, grants capture
/// authorization, runs the capture loop and tears everything down again.
pub struct Controller {
    pub config: Config,
    storage: Arc<dyn Storage>,
    server: ArtifactServer,
    capture: CaptureLoop,
}

impl Controller {
    /// Controller capturing from the synthetic test-pattern screen.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        let provider = Arc::new(SyntheticScreen::new(config.screen.row_padding));
        Self::with_provider(config, provider)
    }

    pub fn with_provider(
        config: Config,
        provider: Arc<dyn ScreenProvider>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&config.content_dir)?);
        // The server and the capture loop only share the directory, not each other.
        let server = ArtifactServer::new(Arc::clone(&storage));
        let capture = CaptureLoop::new(Arc::clone(&storage), provider, config.quality);
        Ok(Self {
            config,
            storage,
            server,
            capture,
        })
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_running()
    }

    /// Grants a capture session for the configured screen.
    pub fn grant_authorization(&self) -> CaptureSession {
        CaptureSession::new(Uuid::new_v4().to_string(), self.config.screen.into())
    }

    /// Starts the server, then capture. Returns the address the server is bound to.
    pub async fn start(&mut self) -> Result<SocketAddr, ControllerError> {
        let addr = self.server.start(self.config.bind_address, self.config.port)?;

        let session = self.grant_authorization();
        if let Err(e) = self
            .capture
            .start(session, self.config.capture_interval())
            .await
        {
            error!("Capture authorization failed: {}", e);
            self.server.stop().await;
            return Err(e.into());
        }
        info!(
            "Capturing every {}s into {}",
            self.config.capture_interval_secs,
            self.config.content_dir.display()
        );
        Ok(addr)
    }

    /// Stops capturing after the platform revoked the authorization. The server stays up.
    pub async fn on_authorization_revoked(&mut self) {
        warn!("Capture authorization revoked");
        self.capture.stop().await;
    }

    /// Stops capture and server, then purges the content directory if configured to.
    pub async fn shutdown(&mut self) -> Option<PurgeReport> {
        info!("Shutting down");
        self.capture.stop().await;
        self.server.stop().await;

        if !self.config.purge_on_exit {
            info!(
                "Keeping captured files in {}",
                self.config.content_dir.display()
            );
            return None;
        }
        let report = self.storage.purge_all();
        for (name, e) in &report.failed {
            error!("Could not delete {}: {}", name, e);
        }
        Some(report)
    }

    /// Runs until Ctrl-C, then shuts down.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        self.start().await?;
        let signal = tokio::signal::ctrl_c().await;
        self.shutdown().await;
        signal.map_err(ControllerError::SignalError)
    }
}
