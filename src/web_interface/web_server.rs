use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error_handling::types::WebError;
use crate::storage::storage_trait::Storage;

use super::routes::routes;

/// How long `stop()` lets open connections drain before dropping them.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// HTTP server exposing the content directory.
///
/// Reads the store on every request and holds no state of its own besides the listening
/// socket, so it never interferes with the capture loop writing to the same directory.
pub struct ArtifactServer {
    storage: Arc<dyn Storage>,
    running: Option<RunningServer>,
}

impl ArtifactServer {
    /// Create a new ArtifactServer instance
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            running: None,
        }
    }

    /// Start the server on `bind_address:port` and return the bound address.
    ///
    /// The socket is bound before returning, so an unavailable port is reported here as
    /// [`WebError::BindError`]. Port `0` binds an ephemeral port. Must be called from within
    /// a tokio runtime.
    pub fn start(&mut self, bind_address: IpAddr, port: u16) -> Result<SocketAddr, WebError> {
        if self.running.is_some() {
            return Err(WebError::AlreadyRunning);
        }

        let requested = SocketAddr::new(bind_address, port);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(routes(self.storage.clone()))
            .try_bind_with_graceful_shutdown(requested, async move {
                let _ = shutdown_rx.await;
            })
            .map_err(|e| {
                error!("Unable to bind artifact server on {}: {}", requested, e);
                WebError::BindError(format!("{}: {}", requested, e))
            })?;

        let task = tokio::spawn(server);
        info!("Serving artifacts on http://{}", addr);
        self.running = Some(RunningServer {
            addr,
            shutdown_tx,
            task,
        });
        Ok(addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Stop accepting connections and wait for in-flight responses to finish.
    ///
    /// Connections still open after [`SHUTDOWN_GRACE`] (e.g. a client that connected but never
    /// sent a request) are abandoned and the server task is aborted.
    pub async fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            debug!("Artifact server already stopped");
            return;
        };
        let _ = running.shutdown_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut running.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Artifact server task ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Artifact server on {} did not drain within {:?}, aborting",
                    running.addr, SHUTDOWN_GRACE
                );
                running.task.abort();
                let _ = running.task.await;
            }
        }
        info!("Artifact server on {} stopped", running.addr);
    }
}
