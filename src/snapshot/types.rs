// Define core types for frame capture

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A normalized still of the viewport, ready to send to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedFrame {
    /// Path to the re-encoded JPEG
    pub path: PathBuf,

    /// Width in pixels after resizing
    pub width: u32,

    /// Height in pixels after resizing
    pub height: u32,

    /// When the raw capture was requested
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub fn new(path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            path,
            width,
            height,
            captured_at: Utc::now(),
        }
    }
}

/// Result type for capture operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Error types for capture operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The renderer could not produce an image
    #[error("Capture error: {0}")]
    Capture(String),

    /// The raw capture file never reached a stable, non-empty size
    #[error("Capture file {} did not stabilize after {polls} polls", path.display())]
    Unstable { path: PathBuf, polls: u32 },

    /// Decoding, resizing or re-encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JPEG encoding failed
    #[error("Encode error: {0}")]
    Encode(#[from] jpeg_encoder::EncodingError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
