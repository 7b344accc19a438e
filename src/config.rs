//! Configuration management with environment variable support.
//!
//! Everything the agent needs is carried by an explicit [`Config`] that the
//! caller builds once and hands to constructors. Nothing in the library reads
//! the environment on its own.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SCENE_VISION_ENDPOINT` | OpenAI-style API base URL | `https://api.openai.com/v1` |
//! | `SCENE_VISION_API_KEY` | API credential (falls back to `OPENAI_API_KEY`) | none |
//! | `SCENE_VISION_MODEL` | Vision model identifier | none |
//! | `SCENE_VISION_MODE` | `chat-style` or `native-structured` | `chat-style` |
//! | `SCENE_VISION_REQUEST_TIMEOUT` | Per-call timeout in seconds | `120` |
//! | `SCENE_VISION_REASONING_EFFORT` | Reasoning hint for native-structured mode | `low` |
//! | `SCENE_VISION_MAX_TOKENS` | Response token cap (unset = provider default) | none |
//! | `SCENE_VISION_MAX_ITERATIONS` | Loop iteration budget | `10` |
//! | `SCENE_VISION_SETTLE_FRAMES` | Render frames to wait after a move | `12` |
//! | `SCENE_VISION_FRAME_INTERVAL_MS` | Duration of one render frame | `33` |
//! | `SCENE_VISION_CAPTURE_SCALE` | Resize factor applied to captures | `0.816` |
//! | `SCENE_VISION_JPEG_QUALITY` | JPEG quality for captures | `90` |
//! | `SCENE_VISION_SESSION_DIR` | Base directory for capture sessions | `/tmp/scene-vision` |
//!
//! # Example
//!
//! ```bash
//! export SCENE_VISION_ENDPOINT="http://localhost:11434/v1"
//! export SCENE_VISION_MODEL="llava"
//! export SCENE_VISION_MODE="chat-style"
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// Default Values
// ============================================================================

/// Default API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default client mode
pub const DEFAULT_MODE: &str = "chat-style";

/// Default per-call timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 120;

/// Default reasoning effort hint
pub const DEFAULT_REASONING_EFFORT: &str = "low";

/// Default description of what the viewport shows
pub const DEFAULT_SCENE_HINT: &str = "a 3D factory scene";

/// Default iteration budget
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Default number of render frames to wait after a move
pub const DEFAULT_SETTLE_FRAMES: u32 = 12;

/// Default render frame duration (milliseconds, ~30 fps)
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

/// Default capture resize factor
pub const DEFAULT_CAPTURE_SCALE: f64 = 0.816;

/// Default JPEG quality
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default number of size polls while waiting for a capture file
pub const DEFAULT_STABLE_POLLS: u32 = 40;

/// Default delay between size polls (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default session base directory
pub const DEFAULT_SESSION_DIR: &str = "/tmp/scene-vision";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_ENDPOINT: &str = "SCENE_VISION_ENDPOINT";
pub const ENV_API_KEY: &str = "SCENE_VISION_API_KEY";
pub const ENV_MODEL: &str = "SCENE_VISION_MODEL";
pub const ENV_MODE: &str = "SCENE_VISION_MODE";
pub const ENV_REQUEST_TIMEOUT: &str = "SCENE_VISION_REQUEST_TIMEOUT";
pub const ENV_REASONING_EFFORT: &str = "SCENE_VISION_REASONING_EFFORT";
pub const ENV_MAX_TOKENS: &str = "SCENE_VISION_MAX_TOKENS";
pub const ENV_MAX_ITERATIONS: &str = "SCENE_VISION_MAX_ITERATIONS";
pub const ENV_SETTLE_FRAMES: &str = "SCENE_VISION_SETTLE_FRAMES";
pub const ENV_FRAME_INTERVAL_MS: &str = "SCENE_VISION_FRAME_INTERVAL_MS";
pub const ENV_CAPTURE_SCALE: &str = "SCENE_VISION_CAPTURE_SCALE";
pub const ENV_JPEG_QUALITY: &str = "SCENE_VISION_JPEG_QUALITY";
pub const ENV_SESSION_DIR: &str = "SCENE_VISION_SESSION_DIR";

/// Legacy credential variable honored when `SCENE_VISION_API_KEY` is unset
pub const ENV_API_KEY_LEGACY: &str = "OPENAI_API_KEY";

// ============================================================================
// Errors and mode selection
// ============================================================================

/// Configuration problems detected before any model call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown mode '{0}'. Use 'chat-style' or 'native-structured'")]
    UnknownMode(String),
}

/// Which wire contract the vision client speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionMode {
    /// Chat completions; the model writes raw JSON that we validate
    ChatStyle,
    /// Responses API with a strict JSON schema enforced by the provider
    NativeStructured,
}

impl VisionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisionMode::ChatStyle => "chat-style",
            VisionMode::NativeStructured => "native-structured",
        }
    }
}

impl FromStr for VisionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat-style" | "chat" | "chat completions" => Ok(VisionMode::ChatStyle),
            "native-structured" | "responses" | "responses api" => Ok(VisionMode::NativeStructured),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for VisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Centralized configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Model endpoint settings
    pub vision: VisionSettings,
    /// Control loop settings
    pub agent: AgentSettings,
    /// Frame capture settings
    pub capture: CaptureSettings,
    /// Session settings
    pub session: SessionSettings,
}

/// Model endpoint settings
#[derive(Clone)]
pub struct VisionSettings {
    /// API base URL (the client appends `/chat/completions` or `/responses`)
    pub endpoint: String,
    /// Bearer credential
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Raw mode selector, validated when the client is built
    pub mode: String,
    /// Per-call timeout (seconds)
    pub request_timeout: u64,
    /// Reasoning effort hint sent in native-structured mode
    pub reasoning_effort: String,
    /// Optional response token cap
    pub max_tokens: Option<u32>,
    /// What the viewport shows, for the system prompt
    pub scene_hint: String,
}

/// Control loop settings
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Iteration budget per question
    pub max_iterations: u32,
    /// Render frames to wait after applying a move
    pub settle_frames: u32,
    /// Duration of one render frame (milliseconds)
    pub frame_interval_ms: u64,
}

/// Frame capture settings
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Resize factor applied before re-encoding
    pub scale: f64,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Maximum number of file size polls
    pub stable_polls: u32,
    /// Delay between polls (milliseconds)
    pub poll_interval_ms: u64,
}

/// Session-related settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Base directory for session storage
    pub base_dir: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            vision: VisionSettings::from_env(),
            agent: AgentSettings::from_env(),
            capture: CaptureSettings::from_env(),
            session: SessionSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            vision: VisionSettings::defaults(),
            agent: AgentSettings::defaults(),
            capture: CaptureSettings::defaults(),
            session: SessionSettings::defaults(),
        }
    }
}

impl VisionSettings {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            ..Self::defaults()
        }
    }

    /// Create vision settings from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_ENDPOINT).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            api_key: env::var(ENV_API_KEY)
                .or_else(|_| env::var(ENV_API_KEY_LEGACY))
                .unwrap_or_default(),
            model: env::var(ENV_MODEL).unwrap_or_default(),
            mode: env::var(ENV_MODE).unwrap_or_else(|_| DEFAULT_MODE.to_string()),
            request_timeout: env_parse(ENV_REQUEST_TIMEOUT).unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            reasoning_effort: env::var(ENV_REASONING_EFFORT)
                .unwrap_or_else(|_| DEFAULT_REASONING_EFFORT.to_string()),
            max_tokens: env_parse(ENV_MAX_TOKENS),
            scene_hint: DEFAULT_SCENE_HINT.to_string(),
        }
    }

    /// Create vision settings with defaults; credential and model stay empty
    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: String::new(),
            mode: DEFAULT_MODE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reasoning_effort: DEFAULT_REASONING_EFFORT.to_string(),
            max_tokens: None,
            scene_hint: DEFAULT_SCENE_HINT.to_string(),
        }
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn scene_hint(mut self, hint: impl Into<String>) -> Self {
        self.scene_hint = hint.into();
        self
    }

    /// Parse the mode selector
    pub fn vision_mode(&self) -> Result<VisionMode, ConfigError> {
        self.mode.parse()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

// Keeps the credential out of logs
impl fmt::Debug for VisionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("model", &self.model)
            .field("mode", &self.mode)
            .field("request_timeout", &self.request_timeout)
            .field("reasoning_effort", &self.reasoning_effort)
            .field("max_tokens", &self.max_tokens)
            .field("scene_hint", &self.scene_hint)
            .finish()
    }
}

impl AgentSettings {
    pub fn from_env() -> Self {
        Self {
            max_iterations: env_parse(ENV_MAX_ITERATIONS).unwrap_or(DEFAULT_MAX_ITERATIONS),
            settle_frames: env_parse(ENV_SETTLE_FRAMES).unwrap_or(DEFAULT_SETTLE_FRAMES),
            frame_interval_ms: env_parse(ENV_FRAME_INTERVAL_MS).unwrap_or(DEFAULT_FRAME_INTERVAL_MS),
        }
    }

    pub fn defaults() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            settle_frames: DEFAULT_SETTLE_FRAMES,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl CaptureSettings {
    pub fn from_env() -> Self {
        Self {
            scale: env_parse(ENV_CAPTURE_SCALE).unwrap_or(DEFAULT_CAPTURE_SCALE),
            jpeg_quality: env_parse(ENV_JPEG_QUALITY).unwrap_or(DEFAULT_JPEG_QUALITY),
            ..Self::defaults()
        }
    }

    pub fn defaults() -> Self {
        Self {
            scale: DEFAULT_CAPTURE_SCALE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            stable_polls: DEFAULT_STABLE_POLLS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl SessionSettings {
    pub fn from_env() -> Self {
        Self {
            base_dir: env::var(ENV_SESSION_DIR).unwrap_or_else(|_| DEFAULT_SESSION_DIR.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            base_dir: DEFAULT_SESSION_DIR.to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
