//! Append-only JSONL receipts of analysis runs.
//!
//! One receipt is appended per run, to a file named after the run's
//! local wall-clock second. Two runs in the same second land in the
//! same file as separate lines; the format is append-only.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Top pattern entries kept in a receipt.
pub const PATTERNS_IN_RECEIPT: usize = 10;
/// Characters of the prompt kept in a receipt.
pub const PROMPT_PREVIEW_CHARS: usize = 200;

/// One analysis run, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Microseconds since epoch at run start.
    pub run_id: i64,
    pub inputs: ReceiptInputs,
    pub limits: ReceiptLimits,
    /// Top `key:count` patterns.
    pub patterns: Vec<String>,
    /// First chars of the prompt sent to the model.
    pub prompt_preview: String,
    pub model: String,
    /// The model's answer, structured or plain text.
    pub answer: Value,
    pub metrics: ReceiptMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptInputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_files: Option<Vec<String>>,
    /// Files that actually contributed content.
    pub files_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLimits {
    pub max_bytes_total: usize,
    pub context_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptMetrics {
    pub duration_ms: u64,
    pub files_scanned: usize,
}

/// Append a receipt under `dir`, creating the directory if needed.
/// Returns the path written to.
pub fn write_receipt(dir: &Path, receipt: &Receipt) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create receipts dir: {}", dir.display()))?;

    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("{}.jsonl", stamp));

    let line = serde_json::to_string(receipt).context("Failed to serialize receipt")?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open receipt file: {}", path.display()))?;
    writeln!(file, "{}", line)
        .with_context(|| format!("Failed to append receipt to {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn make_receipt(run_id: i64) -> Receipt {
        Receipt {
            run_id,
            inputs: ReceiptInputs {
                project_folder: None,
                logs_folder: Some("logs".to_string()),
                log_files: None,
                files_used: vec!["logs/app.log".to_string()],
            },
            limits: ReceiptLimits {
                max_bytes_total: 10 * 1024 * 1024,
                context_lines: 4,
            },
            patterns: vec!["error:3".to_string(), "timeout:1".to_string()],
            prompt_preview: "You are a senior software diagnostics".to_string(),
            model: "llama3".to_string(),
            answer: json!({"root_cause": "stale cache"}),
            metrics: ReceiptMetrics {
                duration_ms: 1200,
                files_scanned: 1,
            },
        }
    }

    #[test]
    fn test_write_receipt_creates_dir_and_appends() {
        let dir = TempDir::new().unwrap();
        let receipts_dir = dir.path().join("receipts");

        let p1 = write_receipt(&receipts_dir, &make_receipt(1)).unwrap();
        let p2 = write_receipt(&receipts_dir, &make_receipt(2)).unwrap();
        assert!(p1.exists());
        assert!(p2.exists());

        // every written line parses back as a receipt
        let mut total = 0;
        for entry in fs::read_dir(&receipts_dir).unwrap().flatten() {
            let content = fs::read_to_string(entry.path()).unwrap();
            for line in content.lines() {
                let parsed: Receipt = serde_json::from_str(line).unwrap();
                assert!(parsed.run_id == 1 || parsed.run_id == 2);
                total += 1;
            }
        }
        assert_eq!(total, 2);
    }

    #[test]
    fn test_receipt_roundtrip() {
        let receipt = make_receipt(42);
        let line = serde_json::to_string(&receipt).unwrap();
        let parsed: Receipt = serde_json::from_str(&line).unwrap();

        assert_eq!(parsed.run_id, 42);
        assert_eq!(parsed.inputs.logs_folder.as_deref(), Some("logs"));
        assert_eq!(parsed.answer["root_cause"], "stale cache");
        assert_eq!(parsed.metrics.files_scanned, 1);
    }

    #[test]
    fn test_optional_inputs_are_omitted() {
        let receipt = make_receipt(1);
        let line = serde_json::to_string(&receipt).unwrap();
        // unset inputs do not appear as nulls
        assert!(!line.contains("project_folder"));
        assert!(!line.contains("log_files"));
        assert!(line.contains("logs_folder"));
    }
}
