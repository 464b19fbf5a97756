//! Periodic screen capture.
//!
//! This module provides `CaptureLoop`, the producer side of the content directory. While a
//! capture session is active it wakes up once per interval, grabs the latest frame from the
//! session's frame source, encodes it and publishes it through the injected `Storage`.
//!
//! Highlights
//! - One tokio task per run: tick, then sleep, so ticks never overlap
//! - The tick itself runs on the blocking pool (frame copy, PNG encode, file write)
//! - Tick failures and panics are logged and dropped; the next tick is the retry
//! - `stop()` interrupts the pending sleep right away and releases the frame source
//!
//! Minimal usage
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use capserve::data_capture::{CaptureLoop, SyntheticScreen};
//! use capserve::session_management::{CaptureSession, FrameGeometry};
//! use capserve::storage::FileStorage;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(FileStorage::new("./captures")?);
//! let mut capture = CaptureLoop::new(storage, Arc::new(SyntheticScreen::default()), 30);
//! let geometry = FrameGeometry { width: 1080, height: 2400, density: 420 };
//! capture.start(CaptureSession::new("token", geometry), Duration::from_secs(180)).await?;
//! // ...
//! capture.stop().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error_handling::types::{AuthorizationError, CaptureError};
use crate::session_management::session::CaptureSession;
use crate::storage::storage_trait::Storage;
use crate::storage::types::ArtifactName;

use super::encoder::encode_png;
use super::frame_source::{FrameSource, ScreenProvider};

/// Capture period of the reference deployment.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(3 * 60);

/// Runs one tick: acquire, convert, encode, publish.
///
/// Returns `Ok(None)` when the source had no frame ready.
pub fn capture_once(
    source: &mut dyn FrameSource,
    storage: &dyn Storage,
    quality: u8,
    now: DateTime<Local>,
) -> Result<Option<ArtifactName>, CaptureError> {
    let Some(frame) = source.acquire_latest_frame()? else {
        return Ok(None);
    };
    let image = frame.to_rgba_image()?;
    let bytes = encode_png(&image, quality)?;
    let name = ArtifactName::for_capture(now);
    storage.save_artifact(&name, &bytes)?;
    debug!(
        "Encoded {}x{} frame into {} ({} bytes)",
        frame.width,
        frame.height,
        name,
        bytes.len()
    );
    Ok(Some(name))
}

struct RunningCapture {
    session_id: Uuid,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the periodic capture task of the current session, if any.
pub struct CaptureLoop {
    storage: Arc<dyn Storage>,
    provider: Arc<dyn ScreenProvider>,
    quality: u8,
    running: Option<RunningCapture>,
}

impl CaptureLoop {
    pub fn new(storage: Arc<dyn Storage>, provider: Arc<dyn ScreenProvider>, quality: u8) -> Self {
        Self {
            storage,
            provider,
            quality,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Starts capturing one frame every `interval` for `session`.
    ///
    /// The first tick happens immediately. A run that is already active is stopped, and its
    /// frame source released, before the new one is opened. The loop ends by itself once the
    /// session is no longer valid.
    pub async fn start(
        &mut self,
        session: CaptureSession,
        interval: Duration,
    ) -> Result<(), AuthorizationError> {
        session.validate()?;

        if let Some(previous) = &self.running {
            warn!(
                "[{}] Capture restarted, cancelling previous run",
                previous.session_id
            );
            self.stop().await;
        }

        let source = self.provider.open(&session)?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let session_id = session.id;
        info!(
            "[{}] Starting capture every {:?} at {}x{}",
            session_id, interval, session.geometry.width, session.geometry.height
        );

        let task = tokio::spawn(run_capture(
            session,
            source,
            Arc::clone(&self.storage),
            self.quality,
            interval,
            stop_rx,
        ));
        self.running = Some(RunningCapture {
            session_id,
            stop_tx,
            task,
        });
        Ok(())
    }

    /// Cancels the periodic task and waits until the frame source is released.
    ///
    /// Calling it on a stopped loop does nothing.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("Capture loop already stopped");
            return;
        };
        // The task may have ended on its own; a closed channel is fine.
        let _ = running.stop_tx.send(true);
        if let Err(e) = running.task.await {
            error!("[{}] Capture task ended abnormally: {}", running.session_id, e);
        }
        info!("[{}] Capture stopped", running.session_id);
    }
}

async fn run_capture(
    session: CaptureSession,
    source: Box<dyn FrameSource>,
    storage: Arc<dyn Storage>,
    quality: u8,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let source = Arc::new(Mutex::new(source));

    loop {
        if *stop_rx.borrow() {
            break;
        }
        if let Err(e) = session.validate() {
            info!("[{}] Capture session ended: {}", session.id, e);
            break;
        }

        let tick = {
            let source = Arc::clone(&source);
            let storage = Arc::clone(&storage);
            tokio::task::spawn_blocking(move || {
                // A panicking tick poisons the lock; the source itself is still usable.
                let mut source = source.lock().unwrap_or_else(|p| p.into_inner());
                capture_once(source.as_mut(), storage.as_ref(), quality, Local::now())
            })
        };

        match tick.await {
            Ok(Ok(Some(name))) => info!("[{}] Captured {}", session.id, name),
            Ok(Ok(None)) => debug!("[{}] No frame ready, tick skipped", session.id),
            Ok(Err(e)) => warn!("[{}] Capture tick failed: {}", session.id, e),
            Err(e) => error!("[{}] Capture tick panicked: {}", session.id, e),
        }

        tokio::select! {
            // Also fires when the sender is dropped together with its CaptureLoop.
            _ = stop_rx.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    debug!("[{}] Releasing frame source", session.id);
}
