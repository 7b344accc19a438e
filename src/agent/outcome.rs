//! Types for analysis run results.

use serde::{Deserialize, Serialize};

use crate::camera::Pose;

/// Accounting shared by every outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// Camera pose before the first move; the reset point
    pub initial_pose: Pose,
    /// Iterations started, including the one that ended the run
    pub iterations: u32,
    /// Sum of Euclidean step lengths (cm)
    pub total_translation: f64,
    /// Sum of |pitch| + |yaw| per step (degrees)
    pub total_rotation: f64,
    /// Wall time of the run (seconds)
    pub elapsed_time: f64,
}

/// How an analysis run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AnalysisOutcome {
    /// The model answered
    Done {
        answer: Option<String>,
        explanation: String,
        #[serde(flatten)]
        metrics: RunMetrics,
    },
    /// A frame could not be captured
    CaptureFailed {
        reason: String,
        #[serde(flatten)]
        metrics: RunMetrics,
    },
    /// The iteration budget ran out without an answer
    Exhausted {
        last_explanation: String,
        #[serde(flatten)]
        metrics: RunMetrics,
    },
}

impl AnalysisOutcome {
    pub fn metrics(&self) -> &RunMetrics {
        match self {
            AnalysisOutcome::Done { metrics, .. }
            | AnalysisOutcome::CaptureFailed { metrics, .. }
            | AnalysisOutcome::Exhausted { metrics, .. } => metrics,
        }
    }

    pub fn iterations(&self) -> u32 {
        self.metrics().iterations
    }

    pub fn is_done(&self) -> bool {
        matches!(self, AnalysisOutcome::Done { .. })
    }

    /// Human-readable summary for terminals and logs
    pub fn describe(&self) -> String {
        let m = self.metrics();
        let stats = format!(
            "{} iteration(s), {:.2} cm moved, {:.2} deg turned, {:.2} s",
            m.iterations, m.total_translation, m.total_rotation, m.elapsed_time
        );
        match self {
            AnalysisOutcome::Done {
                answer,
                explanation,
                ..
            } => format!(
                "Answer: {}\n\nExplanation: {}\n\n{}",
                answer.as_deref().unwrap_or("(none)"),
                explanation,
                stats
            ),
            AnalysisOutcome::CaptureFailed { reason, .. } => {
                format!("Screenshot failed: {}\n\n{}", reason, stats)
            }
            AnalysisOutcome::Exhausted {
                last_explanation, ..
            } => format!(
                "No answer within the iteration limit.\n\nLast explanation: {}\n\n{}",
                last_explanation, stats
            ),
        }
    }
}
