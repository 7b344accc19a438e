//! Evaluation ledger: one CSV row per analysed question.
//!
//! Semicolon separated with decimal commas so spreadsheets in comma-decimal
//! locales open it directly. The header is written when the file is empty.

use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::agent::AnalysisOutcome;

/// Column order of the ledger
pub const HEADER: [&str; 9] = [
    "model_name",
    "initial_cam_parameters",
    "question",
    "response_correctness",
    "navigation_correctness",
    "iterations",
    "total_translation",
    "total_rotation",
    "elapsed_time",
];

const DELIMITER: char = ';';

/// One evaluated run
#[derive(Debug, Clone)]
pub struct MetricsRecord {
    pub model_name: String,
    pub question: String,
    /// Free-form rating of the answer, filled in by a reviewer
    pub response_correctness: String,
    /// Free-form rating of the camera path, filled in by a reviewer
    pub navigation_correctness: String,
    pub outcome: AnalysisOutcome,
}

impl MetricsRecord {
    pub fn new(model_name: impl Into<String>, question: impl Into<String>, outcome: AnalysisOutcome) -> Self {
        Self {
            model_name: model_name.into(),
            question: question.into(),
            response_correctness: String::new(),
            navigation_correctness: String::new(),
            outcome,
        }
    }

    pub fn ratings(mut self, response: impl Into<String>, navigation: impl Into<String>) -> Self {
        self.response_correctness = response.into();
        self.navigation_correctness = navigation.into();
        self
    }

    /// Render as one CSV line, without the newline
    pub fn to_row(&self) -> io::Result<String> {
        let m = self.outcome.metrics();
        let pose = serde_json::to_string(&m.initial_pose).map_err(io::Error::other)?;
        let model = if self.model_name.is_empty() { "N/A" } else { &self.model_name };
        let fields = [
            model.to_string(),
            pose,
            self.question.clone(),
            self.response_correctness.clone(),
            self.navigation_correctness.clone(),
            m.iterations.to_string(),
            decimal_comma(m.total_translation),
            decimal_comma(m.total_rotation),
            decimal_comma(m.elapsed_time),
        ];
        Ok(join_row(fields.iter().map(String::as_str)))
    }
}

/// Append-only CSV file of [`MetricsRecord`]s
#[derive(Debug, Clone)]
pub struct MetricsLedger {
    path: PathBuf,
}

impl MetricsLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &MetricsRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut out = String::new();
        if file.metadata().await?.len() == 0 {
            out.push_str(&join_row(HEADER.iter().copied()));
            out.push('\n');
        }
        out.push_str(&record.to_row()?);
        out.push('\n');

        file.write_all(out.as_bytes()).await?;
        file.flush().await?;
        debug!(path = %self.path.display(), "metrics row appended");
        Ok(())
    }
}

fn decimal_comma(value: f64) -> String {
    format!("{:.2}", value).replace('.', ",")
}

fn join_row<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let separator = DELIMITER.to_string();
    fields.map(quote).collect::<Vec<_>>().join(separator.as_str())
}

/// Quote a field if it contains the delimiter, quotes or line breaks
fn quote(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
