pub mod backend;
pub mod capture;
pub mod types;
pub mod utils;
pub mod viewport;

pub use backend::{CaptureBackend, CaptureResult, MockFramebuffer};
pub use capture::{FrameCapturer, FrameSource};
pub use types::{CapturedFrame, SnapshotError, SnapshotResult};
pub use utils::{generate_filename, mime_for_path, normalize_to_jpeg};
pub use viewport::{Scene, SceneObject, SceneViewport};
