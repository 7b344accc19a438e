//! Vision language model clients with structured camera-command output.
//!
//! Two wire contracts share one [`VisionClient`] trait:
//! - [`ChatStyleClient`]: chat completions, the model writes raw JSON and
//!   we validate it locally
//! - [`StructuredClient`]: the Responses API with a strict JSON schema that
//!   the provider enforces
//!
//! Both build the same [`Conversation`] so switching modes changes only
//! the request and response shapes.

pub mod chat;
pub mod command;
pub mod history;
pub mod prompt;
pub mod responses;

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use chat::ChatStyleClient;
pub use command::{COMMAND_SCHEMA, CameraCommand};
pub use history::{Conversation, Part};
pub use responses::StructuredClient;

use crate::config::{Config, VisionMode, VisionSettings};
use crate::error::AgentResult;

/// Result type for VLM operations
pub type VlmResult<T> = Result<T, VlmError>;

/// Errors that can occur during VLM operations
#[derive(Debug, Error)]
pub enum VlmError {
    /// Endpoint, credential or model left empty
    #[error("Missing {0}. Set it in the vision settings")]
    MissingSetting(&'static str),
    /// Failed to reach the endpoint
    #[error("Connection failed: {0}")]
    Connection(#[from] reqwest::Error),
    /// No response within the configured timeout
    #[error("No response within {0:?}")]
    Timeout(Duration),
    /// Endpoint answered with a non-success status
    #[error("Endpoint returned {status}: {body}")]
    Http { status: u16, body: String },
    /// A frame could not be read for upload
    #[error("Failed to read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The response envelope did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// The model declined to answer
    #[error("Model refused: {0}")]
    Refusal(String),
    /// The model's output does not match the camera command contract
    #[error("Response does not match the camera command contract: {0}")]
    Contract(String),
}

/// Broad class of a [`VlmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The model replied, but not with a usable camera command
    Validation,
    /// The call could not be made or did not complete
    Transport,
}

impl VlmError {
    pub fn kind(&self) -> FailureKind {
        match self {
            VlmError::InvalidResponse(_) | VlmError::Refusal(_) | VlmError::Contract(_) => {
                FailureKind::Validation
            }
            VlmError::MissingSetting(_)
            | VlmError::Connection(_)
            | VlmError::Timeout(_)
            | VlmError::Http { .. }
            | VlmError::Image { .. } => FailureKind::Transport,
        }
    }
}

/// Everything a client needs for one step
#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    pub current_frame: PathBuf,
    pub question: String,
    /// 1-based step number
    pub iteration: u32,
    pub previous_frame: Option<PathBuf>,
    /// The previous command, serialized
    pub last_action_summary: Option<String>,
}

/// A model that turns a view and a question into a [`CameraCommand`]
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn call(&self, request: &VisionRequest) -> VlmResult<CameraCommand>;

    fn mode(&self) -> VisionMode;
}

/// Build the client selected by `config.vision.mode`.
///
/// An unknown mode is a configuration error. Missing endpoint, credential
/// or model are reported here rather than on the first call.
pub fn build_client(config: &Config) -> AgentResult<Box<dyn VisionClient>> {
    let mode = config.vision.vision_mode()?;
    let max_iterations = config.agent.max_iterations;
    let client: Box<dyn VisionClient> = match mode {
        VisionMode::ChatStyle => Box::new(ChatStyleClient::new(&config.vision, max_iterations)?),
        VisionMode::NativeStructured => {
            Box::new(StructuredClient::new(&config.vision, max_iterations)?)
        }
    };
    debug!(mode = %mode, model = %config.vision.model, "built vision client");
    Ok(client)
}

/// Connection details both clients share
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    http: reqwest::Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl Endpoint {
    /// Validate settings and resolve `path` under the base URL
    pub(crate) fn new(settings: &VisionSettings, path: &str) -> VlmResult<Self> {
        let base = settings.endpoint.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(VlmError::MissingSetting("endpoint URL"));
        }
        if settings.api_key.trim().is_empty() {
            return Err(VlmError::MissingSetting("API key"));
        }
        if settings.model.trim().is_empty() {
            return Err(VlmError::MissingSetting("model name"));
        }

        let url = if base.ends_with(path) {
            base.to_string()
        } else {
            format!("{}{}", base, path)
        };
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            url,
            api_key: settings.api_key.clone(),
            timeout: settings.timeout(),
        })
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// POST a JSON body and return the decoded JSON reply
    pub(crate) async fn post_json(&self, body: &Value) -> VlmResult<Value> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VlmError::Http {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&text).map_err(|e| VlmError::InvalidResponse(format!("body is not JSON: {}", e)))
    }

    fn transport_error(&self, e: reqwest::Error) -> VlmError {
        if e.is_timeout() {
            VlmError::Timeout(self.timeout)
        } else {
            VlmError::Connection(e)
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
