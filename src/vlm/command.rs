//! The structured reply the model must produce each iteration.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{VlmError, VlmResult};
use crate::camera::Movement;

/// One decision from the model: either an answer or a camera move.
///
/// Movement fields are centimeters (`forward`, `upward`, `right`) and
/// degrees (`pitch`, `yaw`). A finished command should carry all zeros;
/// that is asked of the model, not enforced here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraCommand {
    #[serde(default)]
    pub answer: Option<String>,
    pub done: bool,
    pub explanation: String,
    pub forward: i32,
    pub upward: i32,
    pub right: i32,
    pub pitch: i32,
    pub yaw: i32,
}

/// JSON schema sent to providers that validate output themselves
pub static COMMAND_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "answer": { "type": ["string", "null"] },
            "done": { "type": "boolean" },
            "explanation": { "type": "string" },
            "forward": { "type": "integer" },
            "upward": { "type": "integer" },
            "right": { "type": "integer" },
            "pitch": { "type": "integer" },
            "yaw": { "type": "integer" }
        },
        "required": [
            "answer", "done", "explanation",
            "forward", "upward", "right", "pitch", "yaw"
        ],
        "additionalProperties": false
    })
});

impl CameraCommand {
    /// Strictly parse raw model text.
    ///
    /// The text must be exactly one JSON object: no fences, no prose, no
    /// extra keys, integers for every movement field.
    pub fn parse(raw: &str) -> VlmResult<Self> {
        serde_json::from_str(raw.trim()).map_err(|e| VlmError::Contract(e.to_string()))
    }

    /// Build from a value the provider already parsed
    pub fn from_value(value: Value) -> VlmResult<Self> {
        serde_json::from_value(value).map_err(|e| VlmError::Contract(e.to_string()))
    }

    pub fn movement(&self) -> Movement {
        Movement {
            forward: self.forward,
            upward: self.upward,
            right: self.right,
            pitch: self.pitch,
            yaw: self.yaw,
        }
    }

    /// Compact JSON form fed back to the model as the last action
    pub fn summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.explanation.clone())
    }
}
