//! Waiting for the viewport to reflect a camera move.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::AgentSettings;

/// Pause after a move so the next capture shows the new pose
#[async_trait]
pub trait Settle: Send + Sync {
    async fn settle(&self);
}

/// Waits a fixed number of render frames
#[derive(Debug, Clone)]
pub struct FrameSettle {
    frames: u32,
    frame_interval: Duration,
}

impl FrameSettle {
    pub fn new(frames: u32, frame_interval: Duration) -> Self {
        Self {
            frames,
            frame_interval,
        }
    }

    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self::new(
            settings.settle_frames,
            Duration::from_millis(settings.frame_interval_ms),
        )
    }

    pub fn total(&self) -> Duration {
        self.frame_interval * self.frames
    }
}

#[async_trait]
impl Settle for FrameSettle {
    async fn settle(&self) {
        for _ in 0..self.frames {
            tokio::time::sleep(self.frame_interval).await;
        }
    }
}

/// Returns at once; for tests and renderers that update synchronously
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

#[async_trait]
impl Settle for Immediate {
    async fn settle(&self) {}
}
