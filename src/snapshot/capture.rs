//! Frame capture: raw render, wait for a stable file, normalize to JPEG.

use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use super::backend::CaptureBackend;
use super::types::{CapturedFrame, SnapshotError, SnapshotResult};
use super::utils::{generate_filename, normalize_to_jpeg};
use crate::config::CaptureSettings;

/// Anything that can produce a normalized still of the current view
#[async_trait]
pub trait FrameSource: Send {
    async fn capture(&mut self) -> SnapshotResult<CapturedFrame>;
}

/// [`FrameSource`] over a [`CaptureBackend`], writing into `output_dir`
pub struct FrameCapturer {
    backend: Arc<Mutex<Box<dyn CaptureBackend>>>,
    output_dir: PathBuf,
    settings: CaptureSettings,
    seq: AtomicU64,
}

impl FrameCapturer {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        output_dir: impl Into<PathBuf>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            output_dir: output_dir.into(),
            settings,
            seq: AtomicU64::new(0),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Poll the file until it is non-empty and its size holds across two polls
    async fn wait_until_stable(&self, path: &Path) -> SnapshotResult<()> {
        let mut last: Option<u64> = None;
        for _ in 0..self.settings.stable_polls {
            match tokio::fs::metadata(path).await {
                Ok(meta) => {
                    let size = meta.len();
                    if size > 0 && last == Some(size) {
                        return Ok(());
                    }
                    last = Some(size);
                }
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {}
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(self.settings.poll_interval()).await;
        }
        Err(SnapshotError::Unstable {
            path: path.to_path_buf(),
            polls: self.settings.stable_polls,
        })
    }
}

#[async_trait]
impl FrameSource for FrameCapturer {
    async fn capture(&mut self) -> SnapshotResult<CapturedFrame> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let filename = generate_filename("viewport", Utc::now().timestamp_millis(), seq);
        let raw_path = self.output_dir.join(filename);

        let backend = Arc::clone(&self.backend);
        let target = raw_path.clone();
        tokio::task::spawn_blocking(move || {
            backend
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write_capture(&target)
        })
        .await
        .map_err(|e| SnapshotError::Capture(format!("capture task failed: {}", e)))??;

        self.wait_until_stable(&raw_path).await?;

        let (scale, quality) = (self.settings.scale, self.settings.jpeg_quality);
        let source = raw_path.clone();
        let (jpg_path, width, height) =
            tokio::task::spawn_blocking(move || normalize_to_jpeg(&source, scale, quality))
                .await
                .map_err(|e| SnapshotError::Capture(format!("normalize task failed: {}", e)))??;

        tokio::fs::remove_file(&raw_path).await?;
        debug!(path = %jpg_path.display(), width, height, "captured frame");
        Ok(CapturedFrame::new(jpg_path, width, height))
    }
}
