use thiserror::Error;

use crate::config::ConfigError;
use crate::vlm::VlmError;

/// Failures that abort an analysis run instead of producing an outcome.
///
/// Capture failures are not here: they end a run with
/// [`AnalysisOutcome::CaptureFailed`](crate::agent::AnalysisOutcome).
#[derive(Debug, Error)]
pub enum AgentError {
    /// Settings rejected before the first model call.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The vision client failed to produce a valid camera command.
    #[error(transparent)]
    Vision(#[from] VlmError),

    /// The run was cancelled from outside.
    #[error("Analysis cancelled")]
    Cancelled,

    /// Another analysis is still running.
    #[error("An analysis is already running")]
    Busy,

    /// Nothing was started, so there is nothing to wait for.
    #[error("No analysis has been started")]
    Idle,

    /// The question was empty or whitespace.
    #[error("Question must not be empty")]
    EmptyQuestion,
}

pub type AgentResult<T> = Result<T, AgentError>;
