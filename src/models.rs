//! Data models for the log analyzer.
//!
//! This module contains the core data structures used throughout
//! the application for representing pattern counts, model answers,
//! and completed analysis runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single error-keyword hit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    /// The matched keyword, trimmed.
    pub key: String,
    /// Number of lines the keyword appeared in.
    pub count: usize,
}

impl fmt::Display for PatternCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.count)
    }
}

/// The model's answer, either decoded JSON or free text.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModelAnswer {
    /// A JSON object was found in the reply.
    Structured(serde_json::Value),
    /// Plain (usually markdown) text.
    Text(String),
}

impl ModelAnswer {
    /// Convert to a JSON value for receipt persistence.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            ModelAnswer::Structured(v) => v.clone(),
            ModelAnswer::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Outcome of an analysis request.
#[derive(Debug)]
pub enum Outcome {
    /// No matching log files were found; nothing was analyzed.
    NoLogs,
    /// A full run completed.
    Report(Box<RunReport>),
}

/// Everything produced by one completed analysis run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Files that contributed content, newest first.
    pub files_used: Vec<String>,
    /// Top pattern counts across all files.
    pub patterns: Vec<PatternCount>,
    /// The model's answer.
    pub answer: ModelAnswer,
    /// Model name used for the run.
    pub model: String,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Where the receipt was written, if receipts are enabled.
    pub receipt_path: Option<PathBuf>,
    /// Whether any error-like line was seen during the scan.
    pub errors_found: bool,
}

/// The three contract sections extracted from a rendered analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub last_error: String,
    pub root_cause: String,
    pub steps: Vec<String>,
}

impl Sections {
    /// True when no section carries any content.
    pub fn is_empty(&self) -> bool {
        self.last_error.is_empty() && self.root_cause.is_empty() && self.steps.is_empty()
    }
}
