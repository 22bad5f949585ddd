//! Mirror/Mentor/Multiplier line generation.
//!
//! Pure, deterministic triples derived from the last error, with an
//! optional model refinement that falls back safely when Ollama is
//! unavailable or replies off-contract.

use crate::analysis::patterns;
use crate::cli::Persona;
use crate::ollama::OllamaClient;
use crate::scanner::LogScanner;
use std::path::PathBuf;
use tracing::debug;

/// Placeholder when neither the analysis nor the log tails carry an
/// error-like line.
pub const NO_RECENT_ERROR: &str = "(no recent error found)";

/// Error text embedded in the refinement prompt is capped here.
const PROMPT_ERROR_CHARS: usize = 400;

/// The three generated lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmmLines {
    pub mirror: String,
    pub mentor: String,
    pub multiplier: String,
}

/// Return the most recent error-like line, preferring the analysis
/// text and falling back to the tails of the given log files.
pub fn extract_last_error_text(
    last_analysis: &str,
    log_files: &[PathBuf],
    scanner: &LogScanner,
) -> String {
    if !last_analysis.is_empty() {
        if let Some(hit) = patterns::last_error_line(last_analysis) {
            return hit;
        }
    }

    for line in scanner.tail_lines(log_files).iter().rev() {
        if patterns::is_error_like(line) {
            return line.trim().to_string();
        }
    }

    NO_RECENT_ERROR.to_string()
}

/// Deterministic keyword-routed triple.
pub fn fallback_mmm(last_error: &str, persona: Persona) -> MmmLines {
    let lowered = last_error.to_lowercase();

    let (mirror, mentor_dev, multiplier) = if lowered.contains("declin") {
        (
            "Payments are being declined; user cannot complete checkout.",
            "Reproduce with test card; log gateway response; branch on decline codes.",
            "Standardize decline handling and user messaging across services.",
        )
    } else if lowered.contains("timeout")
        || lowered.contains("timed out")
        || lowered.contains("latency")
    {
        (
            "Requests are timing out; downstream service latency is high.",
            "Add timeouts/retries; instrument slow calls; review circuit-breakers.",
            "Adopt service-level timeouts and shared retry/backoff policy.",
        )
    } else if lowered.contains("pay_") || lowered.contains("payment") {
        (
            "Payment flow is erroring consistently in recent attempts.",
            "Trace payment path; check gateway config and error code mapping.",
            "Create a payment failure playbook and alert on error spikes.",
        )
    } else if lowered.contains('5') && lowered.contains("error") {
        (
            "Server-side errors are occurring in the last operation.",
            "Inspect server logs/trace; add guards around failing endpoint.",
            "Harden error boundaries and propagate actionable codes.",
        )
    } else {
        (
            "A recurring issue is visible in the latest operation.",
            "Capture minimal repro; add observability for the failing step.",
            "Document fix pattern and roll it into shared guidelines.",
        )
    };

    let mentor = match persona {
        Persona::Developer => mentor_dev,
        Persona::Lead => "Triage blast radius; assign owner; set SLO and mitigation window.",
        Persona::Exec => {
            "Prioritize reliability work; align teams on concrete risk-reduction steps."
        }
        Persona::Agent => "Auto-create issue, attach logs, propose patch, and request review.",
    };

    MmmLines {
        mirror: mirror.to_string(),
        mentor: mentor.to_string(),
        multiplier: multiplier.to_string(),
    }
}

/// Generate the triple, refining via the model when a client is
/// given. Any client error or off-contract reply returns the
/// deterministic fallback unchanged.
pub async fn generate_mmm(
    last_error: &str,
    persona: Persona,
    client: Option<&OllamaClient>,
) -> MmmLines {
    let fallback = fallback_mmm(last_error, persona);

    let Some(client) = client else {
        return fallback;
    };

    let prompt = format!(
        "You produce 3 terse lines given an error.\n\
         Error: {}\n\
         Persona: {}\n\
         Return as: Mirror|Mentor|Multiplier. 12-16 words each. No extra text.",
        crate::analysis::prompt::truncate_chars(last_error, PROMPT_ERROR_CHARS),
        persona_label(persona),
    );

    match client.ask_text(&prompt).await {
        Ok(reply) => parse_pipe_triple(&reply).unwrap_or(fallback),
        Err(e) => {
            debug!("MMM refinement unavailable: {}", e);
            fallback
        }
    }
}

fn persona_label(persona: Persona) -> &'static str {
    match persona {
        Persona::Developer => "developer",
        Persona::Lead => "lead",
        Persona::Exec => "exec",
        Persona::Agent => "agent",
    }
}

/// Accept a reply only when it splits into three or more non-empty
/// pipe-separated parts.
fn parse_pipe_triple(text: &str) -> Option<MmmLines> {
    let parts: Vec<&str> = text.split('|').map(str::trim).collect();
    if parts.len() >= 3 && parts[..3].iter().all(|p| !p.is_empty()) {
        Some(MmmLines {
            mirror: parts[0].to_string(),
            mentor: parts[1].to_string(),
            multiplier: parts[2].to_string(),
        })
    } else {
        None
    }
}
