//! LogHelper - local LLM-powered log diagnosis
//!
//! A CLI tool that scans log files under strict resource caps, asks a
//! local Ollama model for a root-cause analysis, and appends a JSONL
//! receipt of every run.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, I/O) or no logs found
//!   2 - Error lines found and --fail-on-error was set

mod analysis;
mod cli;
mod config;
mod mmm;
mod models;
mod ollama;
mod receipts;
mod report;
mod scanner;
mod watch;

use analysis::{Analyzer, Source};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use models::{Outcome, RunReport};
use ollama::OllamaClient;
use scanner::{LogScanner, ScanConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("LogHelper v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\nError: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .loghelper.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".loghelper.toml");

    if path.exists() {
        eprintln!(".loghelper.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .loghelper.toml")?;

    println!("Created .loghelper.toml with default settings.");
    println!("Edit it to customize model, caps, extensions, and receipts.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the requested workflow. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let source = build_source(&args)?;

    // Handle --dry-run: scan files and exit
    if args.dry_run {
        return handle_dry_run(&source, &config);
    }

    let client = OllamaClient::new(
        &config.model.ollama_url,
        &config.model.name,
        config.model.timeout_seconds,
        config.model.connect_timeout_seconds,
    )?;
    let analyzer = Analyzer::new(&config, client, !args.quiet);

    if args.watch {
        let options = watch::WatchOptions {
            debounce: Duration::from_millis(config.watch.debounce_ms),
            min_interval: Duration::from_secs(config.watch.min_interval_secs),
        };
        watch::run(
            &analyzer,
            &source,
            args.project.as_deref(),
            &options,
            |outcome| {
                if let Err(e) = present_outcome(outcome, &args, &config) {
                    warn!("Failed to present analysis: {}", e);
                }
            },
        )
        .await?;
        return Ok(0);
    }

    let outcome = analyzer.analyze(&source, args.project.as_deref()).await?;
    present_outcome(&outcome, &args, &config)?;

    let report = match outcome {
        Outcome::NoLogs => return Ok(1),
        Outcome::Report(report) => report,
    };

    if args.mmm {
        print_mmm(&report, &args, &config, &analyzer).await;
    }

    if args.golden_prompt {
        print_golden_prompt(&report, &config);
    }

    if args.fail_on_error && report.errors_found {
        eprintln!("\nError lines found in the scanned logs. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Turn the validated CLI input into an analysis source.
fn build_source(args: &Args) -> Result<Source> {
    if let Some(files) = args.files.clone().filter(|f| !f.is_empty()) {
        return Ok(Source::Files(files));
    }
    let folder = args
        .logs
        .clone()
        .context("A logs folder or file list is required")?;
    Ok(Source::Folder(folder))
}

/// Print a run's outcome and honor --output.
fn present_outcome(outcome: &Outcome, args: &Args, config: &Config) -> Result<()> {
    let report = match outcome {
        Outcome::NoLogs => {
            println!("No logs found. Please choose a folder with .log or .txt files.");
            return Ok(());
        }
        Outcome::Report(report) => report,
    };

    let rendered = match args.format {
        OutputFormat::Text => report::render_text(report, &config.receipts.dir),
        OutputFormat::Markdown => report::render_markdown(report, &config.receipts.dir),
        OutputFormat::Json => report::render_json(report)?,
    };

    println!("{}", rendered);

    if !config.general.output.is_empty() {
        let path = PathBuf::from(&config.general.output);
        std::fs::write(&path, &rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}

/// Print the Mirror/Mentor/Multiplier lines for the latest run.
async fn print_mmm(report: &RunReport, args: &Args, config: &Config, analyzer: &Analyzer) {
    let rendered = report::render_text(report, &config.receipts.dir);
    let log_files: Vec<PathBuf> = report.files_used.iter().map(PathBuf::from).collect();
    let last_error = mmm::extract_last_error_text(&rendered, &log_files, analyzer.scanner());

    let lines = mmm::generate_mmm(&last_error, args.persona, Some(analyzer.client())).await;

    println!();
    println!("Mirror:     {}", lines.mirror);
    println!("Mentor:     {}", lines.mentor);
    println!("Multiplier: {}", lines.multiplier);
}

/// Print the hand-off fix-it prompt extracted from the analysis.
fn print_golden_prompt(report: &RunReport, config: &Config) {
    let rendered = report::render_text(report, &config.receipts.dir);
    let sections = report::extract_sections(&rendered);

    if sections.is_empty() {
        println!("\nNo sections could be extracted for a golden prompt.");
        return;
    }

    println!("\n--- Golden prompt ---\n");
    println!("{}", report::golden_prompt(&sections));
}

/// Handle --dry-run: scan files, print what would be analyzed, exit.
fn handle_dry_run(source: &Source, config: &Config) -> Result<i32> {
    println!("Dry run: scanning files (no model call)...\n");

    let scanner = LogScanner::new(ScanConfig::from(&config.scanner));
    let files = match source {
        Source::Folder(dir) => scanner.discover(dir),
        Source::Files(paths) => scanner.stat_files(paths),
    };

    if files.is_empty() {
        println!("No matching log files found.");
    } else {
        println!("Found {} file(s) that would be analyzed:\n", files.len());
        for file in &files {
            println!("  {} ({} bytes)", file.path.display(), file.size);
        }
        println!(
            "\nCaps: {} files, {} bytes total",
            config.scanner.max_files, config.scanner.max_bytes_total
        );
    }

    println!("\nDry run complete. No model calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .loghelper.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
