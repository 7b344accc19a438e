//! Responses API client with provider-enforced JSON schema output.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::command::COMMAND_SCHEMA;
use super::history::{Conversation, Part};
use super::prompt::{STRUCTURED_CONTRACT, system_prompt};
use super::{CameraCommand, Endpoint, VisionClient, VisionRequest, VlmError, VlmResult};
use crate::config::{VisionMode, VisionSettings};

/// Schema name reported to the provider
const SCHEMA_NAME: &str = "camera_command";

pub struct StructuredClient {
    endpoint: Endpoint,
    model: String,
    max_tokens: Option<u32>,
    reasoning_effort: String,
    system_prompt: String,
}

impl StructuredClient {
    pub fn new(settings: &VisionSettings, max_iterations: u32) -> VlmResult<Self> {
        Ok(Self {
            endpoint: Endpoint::new(settings, "/responses")?,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            reasoning_effort: settings.reasoning_effort.clone(),
            system_prompt: format!(
                "{}\n\n{}",
                system_prompt(&settings.scene_hint, max_iterations),
                STRUCTURED_CONTRACT
            ),
        })
    }

    /// Render the conversation as a Responses API body
    pub fn request_body(&self, convo: &Conversation) -> Value {
        let user: Vec<Value> = convo
            .user
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({ "type": "input_text", "text": text }),
                Part::Image(url) => json!({ "type": "input_image", "image_url": url }),
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "input": [
                { "role": "system", "content": convo.system },
                { "role": "user", "content": user },
                { "role": "assistant", "content": [{ "type": "output_text", "text": convo.assistant }] }
            ],
            "text": {
                "format": {
                    "type": "json_schema",
                    "name": SCHEMA_NAME,
                    "strict": true,
                    "schema": &*COMMAND_SCHEMA
                }
            }
        });
        if !self.reasoning_effort.trim().is_empty() {
            body["reasoning"] = json!({ "effort": self.reasoning_effort });
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_output_tokens"] = json!(max_tokens);
        }
        body
    }
}

/// Collect the output text of a Responses API reply.
///
/// Refusals and incomplete replies are errors. Reasoning items are skipped.
fn output_text(response: &Value) -> VlmResult<String> {
    if response["status"].as_str() == Some("incomplete") {
        let reason = response["incomplete_details"]["reason"]
            .as_str()
            .unwrap_or("unknown");
        return Err(VlmError::InvalidResponse(format!("incomplete reply: {}", reason)));
    }

    let items = response["output"]
        .as_array()
        .ok_or_else(|| VlmError::InvalidResponse("reply has no output".to_string()))?;

    let mut text = String::new();
    for item in items.iter().filter(|i| i["type"] == "message") {
        for content in item["content"].as_array().into_iter().flatten() {
            match content["type"].as_str() {
                Some("output_text") => text.push_str(content["text"].as_str().unwrap_or_default()),
                Some("refusal") => {
                    let reason = content["refusal"].as_str().unwrap_or_default();
                    return Err(VlmError::Refusal(reason.to_string()));
                }
                _ => {}
            }
        }
    }

    if text.is_empty() {
        return Err(VlmError::InvalidResponse("reply has no output text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl VisionClient for StructuredClient {
    async fn call(&self, request: &VisionRequest) -> VlmResult<CameraCommand> {
        let convo = Conversation::build(&self.system_prompt, request).await?;
        let body = self.request_body(&convo);
        debug!(url = %self.endpoint.url(), iteration = request.iteration, "structured request");

        let response = self.endpoint.post_json(&body).await?;
        let text = output_text(&response)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| VlmError::Contract(format!("output is not JSON: {}", e)))?;
        CameraCommand::from_value(value)
    }

    fn mode(&self) -> VisionMode {
        VisionMode::NativeStructured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(effort: &str) -> StructuredClient {
        let mut settings = VisionSettings::new("http://localhost:1/v1", "key", "reasoner");
        settings.reasoning_effort = effort.to_string();
        StructuredClient::new(&settings, 10).unwrap()
    }

    fn convo() -> Conversation {
        Conversation {
            system: "sys".to_string(),
            user: vec![
                Part::Text("q".to_string()),
                Part::Image("data:image/jpeg;base64,AA==".to_string()),
            ],
            assistant: "prev".to_string(),
        }
    }

    #[test]
    fn test_request_body_uses_input_parts_and_schema() {
        let body = client("low").request_body(&convo());
        assert_eq!(body["input"][1]["content"][0], json!({ "type": "input_text", "text": "q" }));
        assert_eq!(
            body["input"][1]["content"][1],
            json!({ "type": "input_image", "image_url": "data:image/jpeg;base64,AA==" })
        );
        assert_eq!(body["input"][2]["content"][0]["type"], "output_text");
        assert_eq!(body["text"]["format"]["type"], "json_schema");
        assert_eq!(body["text"]["format"]["strict"], true);
        assert_eq!(body["text"]["format"]["schema"], *COMMAND_SCHEMA);
        assert_eq!(body["reasoning"]["effort"], "low");
        assert!(body.get("max_output_tokens").is_none());
    }

    #[test]
    fn test_empty_effort_omits_reasoning() {
        let body = client("").request_body(&convo());
        assert!(body.get("reasoning").is_none());
    }

    #[test]
    fn test_output_text_skips_reasoning_items() {
        let response = json!({
            "status": "completed",
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "message", "content": [{ "type": "output_text", "text": "{\"a\":1}" }] }
            ]
        });
        assert_eq!(output_text(&response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_output_text_refusal_and_incomplete() {
        let refused = json!({
            "output": [{ "type": "message", "content": [{ "type": "refusal", "refusal": "cannot help" }] }]
        });
        assert!(matches!(output_text(&refused), Err(VlmError::Refusal(r)) if r == "cannot help"));

        let incomplete = json!({
            "status": "incomplete",
            "incomplete_details": { "reason": "max_output_tokens" },
            "output": []
        });
        let err = output_text(&incomplete).unwrap_err();
        assert!(err.to_string().contains("max_output_tokens"));
    }
}
