//! Scene Vision - answer questions about a 3D viewport by steering its camera.
//!
//! This crate provides:
//! - A perception-action loop that captures the viewport, asks a vision model
//!   for a structured camera command and applies it until the model answers
//! - Two interchangeable vision clients (chat completions with local JSON
//!   validation, Responses API with a provider-enforced schema)
//! - Camera pose handling in camera-local terms with integer truncation
//! - Frame capture with stable-file polling and JPEG normalization
//! - A synthetic scene renderer, session directories and a CSV metrics ledger
//!
//! # Example
//!
//! ```rust,no_run
//! use scene_vision::{AnalysisRunner, Config, Coordinator, FrameCapturer, Scene, SceneCamera,
//!     SceneViewport, SharedCamera};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::from_env();
//! let scene = Scene::demo();
//! let camera = SharedCamera::new(SceneCamera::new(scene.start_pose));
//! let viewport = SceneViewport::new(scene, camera.clone(), 1280, 720);
//! let frames = FrameCapturer::new(Box::new(viewport), "/tmp/frames", config.capture.clone());
//!
//! let coordinator = Coordinator::from_config(&config, Box::new(camera), Box::new(frames))?;
//! let mut runner = AnalysisRunner::new(coordinator);
//! let outcome = runner.run("What color is the car?").await?;
//! println!("{}", outcome.describe());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod camera;
pub mod config;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod session;
pub mod snapshot;
pub mod vlm;

// Re-export the control loop
pub use agent::{AnalysisOutcome, Coordinator, FrameSettle, Immediate, RunMetrics, Settle};
pub use error::{AgentError, AgentResult};
pub use runner::AnalysisRunner;

// Re-export camera types
pub use camera::{CameraPoseTransport, Movement, Pose, SceneCamera, SharedCamera};

// Re-export configuration
pub use config::{Config, ConfigError, VisionMode};

// Re-export snapshot types and backends
pub use snapshot::{
    CaptureBackend, CapturedFrame, FrameCapturer, FrameSource, MockFramebuffer, Scene, SceneViewport,
    SnapshotError, SnapshotResult,
};

// Re-export session and metrics
pub use metrics::{MetricsLedger, MetricsRecord};
pub use session::Session;

// Re-export VLM client
pub use vlm::{CameraCommand, FailureKind, VisionClient, VisionRequest, VlmError, VlmResult, build_client};
