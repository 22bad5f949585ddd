//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.loghelper.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Receipt settings.
    #[serde(default)]
    pub receipts: ReceiptsConfig,

    /// Watch mode settings.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path (empty = stdout only).
    #[serde(default)]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: String::new(),
            verbose: false,
        }
    }
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds (used by the server probe).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

/// Log scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Scan up to this many of the newest files.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Total byte budget across all scanned files.
    #[serde(default = "default_max_bytes_total")]
    pub max_bytes_total: usize,

    /// Context lines kept around a hit (recorded in receipts).
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Character cap for log content embedded in the prompt.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// File extensions treated as logs.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Tail bytes read per file when retrieving the last error.
    #[serde(default = "default_tail_bytes_per_file")]
    pub tail_bytes_per_file: usize,

    /// Total tail bytes across files when retrieving the last error.
    #[serde(default = "default_tail_bytes_total")]
    pub tail_bytes_total: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_bytes_total: default_max_bytes_total(),
            context_lines: default_context_lines(),
            max_prompt_chars: default_max_prompt_chars(),
            extensions: default_extensions(),
            tail_bytes_per_file: default_tail_bytes_per_file(),
            tail_bytes_total: default_tail_bytes_total(),
        }
    }
}

fn default_max_files() -> usize {
    5
}

fn default_max_bytes_total() -> usize {
    10 * 1024 * 1024 // 10MB cap
}

fn default_context_lines() -> usize {
    4
}

fn default_max_prompt_chars() -> usize {
    8000
}

fn default_extensions() -> Vec<String> {
    vec!["log", "txt", "out"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_tail_bytes_per_file() -> usize {
    200_000
}

fn default_tail_bytes_total() -> usize {
    500_000
}

/// Receipt persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptsConfig {
    /// Directory receipts are appended to.
    #[serde(default = "default_receipts_dir")]
    pub dir: String,

    /// Whether to write receipts at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ReceiptsConfig {
    fn default() -> Self {
        Self {
            dir: default_receipts_dir(),
            enabled: true,
        }
    }
}

fn default_receipts_dir() -> String {
    "receipts".to_string()
}

fn default_true() -> bool {
    true
}

/// Watch mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Trailing-edge debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum seconds between consecutive analyses.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_interval_secs: default_min_interval_secs(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_min_interval_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".loghelper.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Model settings - always override since they have defaults in CLI
        self.model.name = args.model.clone();
        self.model.ollama_url = args.ollama_url.clone();

        // Timeout - only override if explicitly provided via CLI
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref dir) = args.receipts_dir {
            self.receipts.dir = dir.to_string_lossy().to_string();
        }

        if let Some(ref output) = args.output {
            self.general.output = output.to_string_lossy().to_string();
        }

        // Watch settings - always override (CLI carries the defaults)
        self.watch.debounce_ms = args.debounce_ms;
        self.watch.min_interval_secs = args.min_interval_secs;

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
