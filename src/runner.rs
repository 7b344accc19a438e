//! Single-flight execution of analyses with cancellation.
//!
//! The [`Coordinator`] assumes one question at a time. [`AnalysisRunner`] is
//! the caller-facing layer that enforces it: a second `start` while a run is
//! in flight is rejected, and a running analysis can be aborted at any await
//! point (capture, model call or settle wait).

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::agent::{AnalysisOutcome, Coordinator};
use crate::camera::Pose;
use crate::error::{AgentError, AgentResult};

pub struct AnalysisRunner {
    coordinator: Arc<Mutex<Coordinator>>,
    task: Option<JoinHandle<AgentResult<AnalysisOutcome>>>,
    last_outcome: Option<AnalysisOutcome>,
}

impl AnalysisRunner {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            task: None,
            last_outcome: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Spawn an analysis of `question` in the background
    pub async fn start(&mut self, question: impl Into<String>) -> AgentResult<()> {
        self.collect_finished().await;
        if self.is_running() {
            return Err(AgentError::Busy);
        }
        let question = question.into();
        if question.trim().is_empty() {
            return Err(AgentError::EmptyQuestion);
        }

        let coordinator = Arc::clone(&self.coordinator);
        self.task = Some(tokio::spawn(async move {
            coordinator.lock().await.analyze(&question).await
        }));
        debug!("analysis task spawned");
        Ok(())
    }

    /// Wait for the current run and return its outcome.
    ///
    /// Cancel-safe: dropping this future leaves the run in place, so it can
    /// still be awaited again or cancelled.
    pub async fn wait(&mut self) -> AgentResult<AnalysisOutcome> {
        let task = self.task.as_mut().ok_or(AgentError::Idle)?;
        let joined = task.await;
        self.task = None;
        match joined {
            Ok(Ok(outcome)) => {
                self.last_outcome = Some(outcome.clone());
                Ok(outcome)
            }
            Ok(Err(e)) => Err(e),
            Err(e) if e.is_cancelled() => Err(AgentError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }

    /// Start and wait in one step
    pub async fn run(&mut self, question: impl Into<String>) -> AgentResult<AnalysisOutcome> {
        self.start(question).await?;
        self.wait().await
    }

    /// Abort the current run. Returns false when nothing was in flight.
    ///
    /// A run that already finished is kept as the last outcome instead.
    /// Partial progress of an aborted run is discarded; the camera stays
    /// where the last applied move left it.
    pub async fn cancel(&mut self) -> bool {
        self.collect_finished().await;
        match self.task.take() {
            Some(task) => {
                task.abort();
                let _ = task.await;
                info!("analysis cancelled");
                true
            }
            None => false,
        }
    }

    pub fn last_outcome(&self) -> Option<&AnalysisOutcome> {
        self.last_outcome.as_ref()
    }

    /// Move the camera back to where the last completed run started.
    ///
    /// Returns the restored pose, or `None` if no run has completed yet.
    pub async fn reset_camera(&mut self) -> AgentResult<Option<Pose>> {
        self.collect_finished().await;
        if self.is_running() {
            return Err(AgentError::Busy);
        }
        let Some(pose) = self.last_outcome.as_ref().map(|o| o.metrics().initial_pose) else {
            return Ok(None);
        };
        self.coordinator.lock().await.camera_mut().set_pose(pose);
        info!(?pose, "camera reset to initial pose");
        Ok(Some(pose))
    }

    /// Current camera pose (waits for a running analysis to release the camera)
    pub async fn camera_pose(&self) -> Pose {
        self.coordinator.lock().await.camera().pose()
    }

    /// Join a run that ended without anyone waiting on it
    async fn collect_finished(&mut self) {
        let Some(task) = self.task.take_if(|task| task.is_finished()) else {
            return;
        };
        match task.await {
            Ok(Ok(outcome)) => {
                debug!(iterations = outcome.iterations(), "collected finished analysis");
                self.last_outcome = Some(outcome);
            }
            Ok(Err(e)) => warn!(error = %e, "unobserved analysis failed"),
            Err(e) if e.is_cancelled() => {}
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

impl Drop for AnalysisRunner {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
