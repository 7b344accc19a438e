//! Chat-completions client. The model writes JSON text; we validate it.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::history::{Conversation, Part};
use super::prompt::{CHAT_CONTRACT, system_prompt};
use super::{CameraCommand, Endpoint, VisionClient, VisionRequest, VlmError, VlmResult};
use crate::config::{VisionMode, VisionSettings};

pub struct ChatStyleClient {
    endpoint: Endpoint,
    model: String,
    max_tokens: Option<u32>,
    system_prompt: String,
}

impl ChatStyleClient {
    pub fn new(settings: &VisionSettings, max_iterations: u32) -> VlmResult<Self> {
        Ok(Self {
            endpoint: Endpoint::new(settings, "/chat/completions")?,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            system_prompt: format!(
                "{}\n\n{}",
                system_prompt(&settings.scene_hint, max_iterations),
                CHAT_CONTRACT
            ),
        })
    }

    /// Render the conversation as a chat completions body
    pub fn request_body(&self, convo: &Conversation) -> Value {
        let user: Vec<Value> = convo
            .user
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({ "type": "text", "text": text }),
                Part::Image(url) => json!({ "type": "image_url", "image_url": { "url": url } }),
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": convo.system },
                { "role": "user", "content": user },
                { "role": "assistant", "content": [{ "type": "text", "text": convo.assistant }] }
            ]
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

/// Pull the assistant text out of a chat completions reply
fn message_content(response: &Value) -> VlmResult<&str> {
    let message = &response["choices"][0]["message"];
    if let Some(refusal) = message["refusal"].as_str() {
        return Err(VlmError::Refusal(refusal.to_string()));
    }
    message["content"]
        .as_str()
        .ok_or_else(|| VlmError::InvalidResponse("no message content in reply".to_string()))
}

#[async_trait]
impl VisionClient for ChatStyleClient {
    async fn call(&self, request: &VisionRequest) -> VlmResult<CameraCommand> {
        let convo = Conversation::build(&self.system_prompt, request).await?;
        let body = self.request_body(&convo);
        debug!(url = %self.endpoint.url(), iteration = request.iteration, "chat completion request");

        let response = self.endpoint.post_json(&body).await?;
        let raw = message_content(&response)?;
        CameraCommand::parse(raw).inspect_err(|e| {
            warn!(error = %e, raw = %raw, "model reply failed validation");
        })
    }

    fn mode(&self) -> VisionMode {
        VisionMode::ChatStyle
    }
}
