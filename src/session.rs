//! Session management for organized capture file handling.
//!
//! Provides centralized management of analysis sessions with:
//! - Unique session directories under a configurable base location
//! - Removal on drop unless explicitly preserved
//! - Session metadata tracking

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::SessionSettings;

/// Metadata file written into every session directory
pub const METADATA_FILE: &str = ".session.json";

/// A capture session with organized file management
///
/// The directory is owned by exactly one handle, so sessions are not `Clone`:
///
/// ```compile_fail
/// let session = scene_vision::Session::new("/tmp/scene-vision");
/// let copy = session.clone();
/// ```
#[derive(Debug)]
pub struct Session {
    /// Unique session ID
    pub id: String,
    /// Root directory for this session
    pub dir: PathBuf,
    /// Whether to keep files after session ends
    pub keep: bool,
}

impl Session {
    /// Create a new session with a unique ID under `base`
    pub fn new(base: impl AsRef<Path>) -> Self {
        let id = generate_session_id();
        let dir = base.as_ref().join(&id);

        Self {
            id,
            dir,
            keep: false,
        }
    }

    /// Create a session under the configured base directory
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(&settings.base_dir)
    }

    /// Use an explicit directory; it is kept by default
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(generate_session_id);

        Self {
            id,
            dir,
            keep: true,
        }
    }

    /// Set whether to keep files after session ends
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Initialize the session directory
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let metadata = serde_json::json!({
            "id": self.id,
            "created": chrono::Utc::now().to_rfc3339(),
            "hostname": host,
        });

        fs::write(self.dir.join(METADATA_FILE), serde_json::to_string_pretty(&metadata)?)?;

        Ok(())
    }

    /// Path for a JSON copy of an outcome
    pub fn outcome_path(&self) -> PathBuf {
        self.dir.join("outcome.json")
    }

    /// List all normalized frames in the session, oldest first
    pub fn list_frames(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut frames = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let path = entry?.path();
                if path.extension().map(|e| e == "jpg").unwrap_or(false) {
                    frames.push(path);
                }
            }
        }
        frames.sort();
        Ok(frames)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }
}

/// Generate a unique session ID
fn generate_session_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let pid = std::process::id();
    format!("session_{}_{}", timestamp, pid)
}
