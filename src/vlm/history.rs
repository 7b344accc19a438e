//! Per-call conversation shared by both client modes.
//!
//! Only the previous step survives into the next call: one prior image and
//! one prior command. Clients render this neutral form into their wire shape,
//! so switching modes never changes what the model is shown.

use base64::Engine;
use std::path::Path;

use super::prompt::FIRST_STEP_PLACEHOLDER;
use super::{VisionRequest, VlmError, VlmResult};
use crate::snapshot::mime_for_path;

/// One piece of the user turn
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 `data:` URL
    Image(String),
}

/// System, user and assistant turns for one model call
#[derive(Debug, Clone)]
pub struct Conversation {
    pub system: String,
    pub user: Vec<Part>,
    /// Previous command summary, or the first-step placeholder
    pub assistant: String,
}

impl Conversation {
    /// Assemble the turns for `request`, reading and encoding its images
    pub async fn build(system: &str, request: &VisionRequest) -> VlmResult<Self> {
        let mut user = vec![
            Part::Text("The user's question:".to_string()),
            Part::Text(request.question.clone()),
            Part::Text(format!("This is step {}.", request.iteration)),
        ];

        if let Some(previous) = &request.previous_frame {
            user.push(Part::Text("Previous view, for comparison:".to_string()));
            user.push(Part::Image(image_data_url(previous).await?));
        }
        user.push(Part::Text("Current view:".to_string()));
        user.push(Part::Image(image_data_url(&request.current_frame).await?));

        let assistant = request
            .last_action_summary
            .clone()
            .unwrap_or_else(|| FIRST_STEP_PLACEHOLDER.to_string());

        Ok(Self {
            system: system.to_string(),
            user,
            assistant,
        })
    }
}

/// Read an image file and encode it as a `data:` URL
pub async fn image_data_url(path: &Path) -> VlmResult<String> {
    let bytes = tokio::fs::read(path).await.map_err(|source| VlmError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime_for_path(path), encoded))
}
