//! The analysis pipeline.
//!
//! Discover or stat the input logs, read them under the shared byte
//! budget, build per-file snippet blocks, construct the diagnostic
//! prompt, ask the model, write the receipt, and assemble the run
//! report.

pub mod patterns;
pub mod prompt;

use crate::config::Config;
use crate::models::{Outcome, RunReport};
use crate::ollama::OllamaClient;
use crate::receipts::{
    self, Receipt, ReceiptInputs, ReceiptLimits, ReceiptMetrics, PATTERNS_IN_RECEIPT,
    PROMPT_PREVIEW_CHARS,
};
use crate::scanner::{LogScanner, ScanConfig, ScannedFile};
use anyhow::Result;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What to analyze: a folder scan or an explicit file list.
#[derive(Debug, Clone)]
pub enum Source {
    Folder(PathBuf),
    Files(Vec<PathBuf>),
}

/// Runs the full analysis pipeline.
pub struct Analyzer {
    scanner: LogScanner,
    client: OllamaClient,
    receipts_dir: PathBuf,
    receipts_enabled: bool,
    max_bytes_total: usize,
    max_prompt_chars: usize,
    context_lines: usize,
    show_progress: bool,
}

impl Analyzer {
    /// Build an analyzer from the merged configuration.
    pub fn new(config: &Config, client: OllamaClient, show_progress: bool) -> Self {
        Self {
            scanner: LogScanner::new(ScanConfig::from(&config.scanner)),
            client,
            receipts_dir: PathBuf::from(&config.receipts.dir),
            receipts_enabled: config.receipts.enabled,
            max_bytes_total: config.scanner.max_bytes_total,
            max_prompt_chars: config.scanner.max_prompt_chars,
            context_lines: config.scanner.context_lines,
            show_progress,
        }
    }

    /// The scanner in use (shared with MMM error retrieval).
    pub fn scanner(&self) -> &LogScanner {
        &self.scanner
    }

    /// The Ollama client in use (shared with MMM refinement).
    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Run one analysis of the given source.
    pub async fn analyze(&self, source: &Source, project: Option<&Path>) -> Result<Outcome> {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = started_at.timestamp_micros();

        let files = match source {
            Source::Folder(dir) => self.scanner.discover(dir),
            Source::Files(paths) => self.scanner.stat_files(paths),
        };

        if files.is_empty() {
            return Ok(Outcome::NoLogs);
        }

        info!("Analyzing {} log file(s)", files.len());
        let (snippets, counts, errors_found) = self.collect_snippets(&files);

        let combined = if snippets.is_empty() {
            "(no obvious error lines found)".to_string()
        } else {
            snippets.join("\n\n")
        };

        let prompt = prompt::build_prompt(project, &combined, self.max_prompt_chars);
        debug!("Prompt is {} chars", prompt.len());

        let spinner = self.spinner(&format!("Asking {}...", self.client.model()));
        let answer = self.client.ask(&prompt).await;
        spinner.finish_and_clear();

        let files_used: Vec<String> = files
            .iter()
            .map(|f| f.path.display().to_string())
            .collect();

        let receipt_path = if self.receipts_enabled {
            let receipt = Receipt {
                run_id,
                inputs: self.receipt_inputs(source, project, &files_used),
                limits: ReceiptLimits {
                    max_bytes_total: self.max_bytes_total,
                    context_lines: self.context_lines,
                },
                patterns: patterns::top_patterns(&counts, PATTERNS_IN_RECEIPT)
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
                prompt_preview: prompt::truncate_chars(&prompt, PROMPT_PREVIEW_CHARS).to_string(),
                model: self.client.model().to_string(),
                answer: answer.to_value(),
                metrics: ReceiptMetrics {
                    duration_ms: start.elapsed().as_millis() as u64,
                    files_scanned: files.len(),
                },
            };
            match receipts::write_receipt(&self.receipts_dir, &receipt) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Failed to write receipt: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let report = RunReport {
            files_used,
            patterns: patterns::top_patterns(&counts, patterns::TOP_PATTERNS),
            answer,
            model: self.client.model().to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            started_at,
            receipt_path,
            errors_found,
        };

        Ok(Outcome::Report(Box::new(report)))
    }

    /// Read each file under the shared byte budget and build its
    /// snippet block. Returns the blocks, the merged pattern counts,
    /// and whether any error-like line was seen.
    fn collect_snippets(
        &self,
        files: &[ScannedFile],
    ) -> (Vec<String>, BTreeMap<&'static str, usize>, bool) {
        let mut bytes_left = self.max_bytes_total;
        let mut snippets = Vec::new();
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut errors_found = false;

        for file in files {
            let chunk = self.scanner.read_capped(&file.path, bytes_left);
            if chunk.is_empty() {
                continue;
            }

            errors_found |= chunk.lines().any(patterns::is_error_like);
            patterns::merge_counts(&mut counts, patterns::count_patterns(chunk.lines()));

            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.path.display().to_string());
            snippets.push(format!(
                "### {}\n{}",
                name,
                extract_error_windows(&chunk, self.max_prompt_chars)
            ));

            bytes_left = bytes_left.saturating_sub(chunk.len());
            if bytes_left == 0 {
                debug!("Byte budget exhausted, skipping remaining files");
                break;
            }
        }

        (snippets, counts, errors_found)
    }

    fn receipt_inputs(
        &self,
        source: &Source,
        project: Option<&Path>,
        files_used: &[String],
    ) -> ReceiptInputs {
        let project_folder = project.map(|p| p.display().to_string());
        match source {
            Source::Folder(dir) => ReceiptInputs {
                project_folder,
                logs_folder: Some(dir.display().to_string()),
                log_files: None,
                files_used: files_used.to_vec(),
            },
            Source::Files(paths) => ReceiptInputs {
                project_folder,
                logs_folder: None,
                log_files: Some(paths.iter().map(|p| p.display().to_string()).collect()),
                files_used: files_used.to_vec(),
            },
        }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}

/// Build the snippet block for one file: the last line mentioning an
/// error (with its 1-based line number) plus the capped log content.
pub fn extract_error_windows(text: &str, max_prompt_chars: usize) -> String {
    let mut last_error = String::new();
    for (idx, line) in text.lines().enumerate() {
        if patterns::mentions_error(line) {
            last_error = format!("Line {}: {}", idx + 1, line);
        }
    }

    format!(
        "\nLAST ERROR FOUND:\n{}\n\nLOG CONTENT FOR ANALYSIS:\n{}\n",
        last_error,
        prompt::truncate_chars(text, max_prompt_chars)
    )
}
