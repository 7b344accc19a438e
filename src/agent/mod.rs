//! The perception-action loop.
//!
//! Each iteration captures the viewport, asks the vision client for a
//! [`CameraCommand`](crate::vlm::CameraCommand), and either returns the
//! answer or applies the move, waits for the view to settle and goes again.
//!
//! Only capture failures become an [`AnalysisOutcome`]. Client failures
//! abort the run with an [`AgentError`].

pub mod outcome;
pub mod settle;

use std::time::Instant;
use tracing::{debug, info, warn};

pub use outcome::{AnalysisOutcome, RunMetrics};
pub use settle::{FrameSettle, Immediate, Settle};

use crate::camera::{CameraPoseTransport, Pose};
use crate::config::{Config, DEFAULT_MAX_ITERATIONS};
use crate::error::{AgentError, AgentResult};
use crate::snapshot::{CapturedFrame, FrameSource};
use crate::vlm::{VisionClient, VisionRequest, build_client};

/// Drives capture, model calls and camera moves for one question at a time
pub struct Coordinator {
    camera: Box<dyn CameraPoseTransport>,
    frames: Box<dyn FrameSource>,
    client: Box<dyn VisionClient>,
    settle: Box<dyn Settle>,
    max_iterations: u32,
}

/// Running totals for one analysis
struct LoopState {
    initial_pose: Pose,
    started: Instant,
    total_translation: f64,
    total_rotation: f64,
    previous_frame: Option<CapturedFrame>,
    last_action_summary: Option<String>,
    last_explanation: String,
}

impl LoopState {
    fn new(initial_pose: Pose) -> Self {
        Self {
            initial_pose,
            started: Instant::now(),
            total_translation: 0.0,
            total_rotation: 0.0,
            previous_frame: None,
            last_action_summary: None,
            last_explanation: String::new(),
        }
    }

    fn metrics(&self, iterations: u32) -> RunMetrics {
        RunMetrics {
            initial_pose: self.initial_pose,
            iterations,
            total_translation: self.total_translation,
            total_rotation: self.total_rotation,
            elapsed_time: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl Coordinator {
    pub fn new(
        camera: Box<dyn CameraPoseTransport>,
        frames: Box<dyn FrameSource>,
        client: Box<dyn VisionClient>,
    ) -> Self {
        Self {
            camera,
            frames,
            client,
            settle: Box::new(FrameSettle::from_settings(
                &crate::config::AgentSettings::defaults(),
            )),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Build the vision client from `config` and wire everything together.
    ///
    /// Fails on an unknown mode or missing endpoint settings.
    pub fn from_config(
        config: &Config,
        camera: Box<dyn CameraPoseTransport>,
        frames: Box<dyn FrameSource>,
    ) -> AgentResult<Self> {
        let client = build_client(config)?;
        Ok(Self::new(camera, frames, client)
            .with_settle(FrameSettle::from_settings(&config.agent))
            .max_iterations(config.agent.max_iterations))
    }

    pub fn with_settle(mut self, settle: impl Settle + 'static) -> Self {
        self.settle = Box::new(settle);
        self
    }

    /// Set the iteration budget (at least one)
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn camera(&self) -> &dyn CameraPoseTransport {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> &mut dyn CameraPoseTransport {
        self.camera.as_mut()
    }

    /// Answer `question` by looking around the scene.
    ///
    /// The camera is left wherever the last move put it; the starting pose
    /// is reported in the outcome so callers can restore it.
    pub async fn analyze(&mut self, question: &str) -> AgentResult<AnalysisOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AgentError::EmptyQuestion);
        }

        let mut state = LoopState::new(self.camera.pose());
        info!(question, mode = %self.client.mode(), max_iterations = self.max_iterations, "starting analysis");

        for iteration in 1..=self.max_iterations {
            let frame = match self.frames.capture().await {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(iteration, error = %e, "frame capture failed");
                    return Ok(AnalysisOutcome::CaptureFailed {
                        reason: e.to_string(),
                        metrics: state.metrics(iteration),
                    });
                }
            };
            debug!(iteration, path = %frame.path.display(), "captured frame");

            let request = VisionRequest {
                current_frame: frame.path.clone(),
                question: question.to_string(),
                iteration,
                previous_frame: state.previous_frame.as_ref().map(|f| f.path.clone()),
                last_action_summary: state.last_action_summary.clone(),
            };
            let command = self.client.call(&request).await?;
            info!(
                iteration,
                done = command.done,
                explanation = %command.explanation,
                "model replied"
            );

            if command.done {
                if !command.movement().is_zero() {
                    warn!(iteration, movement = ?command.movement(), "finished reply carried movement, ignoring it");
                }
                let metrics = state.metrics(iteration);
                info!(iterations = iteration, elapsed = metrics.elapsed_time, "analysis answered");
                return Ok(AnalysisOutcome::Done {
                    answer: command.answer,
                    explanation: command.explanation,
                    metrics,
                });
            }

            let movement = command.movement();
            state.total_translation += movement.translation_magnitude();
            state.total_rotation += movement.rotation_magnitude();
            self.camera.apply_delta(&movement);
            debug!(iteration, ?movement, pose = ?self.camera.pose(), "applied move");
            self.settle.settle().await;

            state.previous_frame = Some(frame);
            state.last_action_summary = Some(command.summary());
            state.last_explanation = command.explanation;
        }

        info!(iterations = self.max_iterations, "iteration budget exhausted");
        Ok(AnalysisOutcome::Exhausted {
            last_explanation: state.last_explanation.clone(),
            metrics: state.metrics(self.max_iterations),
        })
    }
}
