//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// LogHelper - local LLM-powered log diagnosis via Ollama
///
/// Scan the newest log files under a folder (or an explicit file
/// list), extract error windows and pattern counts under strict
/// resource caps, ask a local Ollama model for a root-cause analysis,
/// and append a JSONL receipt of the run.
///
/// Examples:
///   loghelper --logs ./logs
///   loghelper --files app.log worker.log --project ./my-app
///   loghelper --logs ./logs --watch
///   loghelper --logs ./logs --mmm --persona lead
///   loghelper --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Folder to scan for the newest log files
    ///
    /// The newest files matching the configured extensions are
    /// selected, up to the scanner's max-files cap.
    #[arg(short, long, value_name = "DIR")]
    pub logs: Option<PathBuf>,

    /// Explicit log files to analyze (overrides --logs scanning)
    #[arg(short, long, value_name = "FILE", num_args = 1..)]
    pub files: Option<Vec<PathBuf>>,

    /// Project folder used for context in the diagnostic prompt
    #[arg(short, long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Ollama model to use for analysis
    ///
    /// Can also be set via OLLAMA_MODEL env var or .loghelper.toml.
    #[arg(short, long, default_value = "llama3", env = "OLLAMA_MODEL")]
    pub model: String,

    /// Ollama API endpoint URL
    #[arg(long, default_value = "http://127.0.0.1:11434", env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Also write the rendered report to a file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format (text, markdown, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Watch the logs folder and re-analyze on changes
    #[arg(short, long)]
    pub watch: bool,

    /// Debounce window for watch mode, in milliseconds
    #[arg(long, default_value = "2000", value_name = "MS")]
    pub debounce_ms: u64,

    /// Minimum spacing between watch-triggered analyses, in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub min_interval_secs: u64,

    /// Also print Mirror/Mentor/Multiplier lines after the analysis
    #[arg(long)]
    pub mmm: bool,

    /// Persona for the Mirror/Mentor/Multiplier mentor line
    #[arg(long, default_value = "developer", value_name = "WHO")]
    pub persona: Persona,

    /// Emit a hand-off fix-it prompt extracted from the analysis
    #[arg(long)]
    pub golden_prompt: bool,

    /// Dry run: scan and list files without calling the model
    ///
    /// Shows which files would be analyzed and exits. No receipt is
    /// written.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .loghelper.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .loghelper.toml in the current
    /// directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory for analysis receipts
    #[arg(long, value_name = "DIR")]
    pub receipts_dir: Option<PathBuf>,

    /// Exit with code 2 when the scan found at least one error line
    ///
    /// Useful for CI-style gating on log health.
    #[arg(long)]
    pub fail_on_error: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain sectioned text (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

/// Persona for the Mirror/Mentor/Multiplier mentor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Persona {
    #[default]
    Developer,
    Lead,
    Exec,
    Agent,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let has_logs = self.logs.is_some();
        let has_files = self.files.as_ref().is_some_and(|f| !f.is_empty());

        if !has_logs && !has_files {
            return Err("Provide a logs folder (--logs) or log files (--files)".to_string());
        }

        if has_logs && has_files {
            return Err("Cannot use both --logs and --files".to_string());
        }

        // Validate Ollama URL format (not needed for dry-run)
        if !self.dry_run
            && !self.ollama_url.starts_with("http://")
            && !self.ollama_url.starts_with("https://")
        {
            return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
        }

        if self.debounce_ms == 0 {
            return Err("Debounce must be at least 1 millisecond".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref logs) = self.logs {
            if !logs.is_dir() {
                return Err(format!("Logs folder does not exist: {}", logs.display()));
            }
        }

        if let Some(ref project) = self.project {
            if !project.is_dir() {
                return Err(format!(
                    "Project folder does not exist: {}",
                    project.display()
                ));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.watch && self.dry_run {
            return Err("Cannot use --watch with --dry-run".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            logs: Some(PathBuf::from(".")),
            files: None,
            project: None,
            model: "llama3".to_string(),
            ollama_url: "http://127.0.0.1:11434".to_string(),
            output: None,
            format: OutputFormat::Text,
            watch: false,
            debounce_ms: 2000,
            min_interval_secs: 30,
            mmm: false,
            persona: Persona::Developer,
            golden_prompt: false,
            dry_run: false,
            init_config: false,
            config: None,
            timeout: None,
            receipts_dir: None,
            fail_on_error: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_validation_requires_input() {
        let mut args = make_args();
        args.logs = None;
        assert!(args.validate().is_err());

        args.files = Some(vec![PathBuf::from("a.log")]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_both_inputs() {
        let mut args = make_args();
        args.files = Some(vec![PathBuf::from("a.log")]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = "localhost:11434".to_string();
        assert!(args.validate().is_err());

        // dry-run skips the URL check
        args.dry_run = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
