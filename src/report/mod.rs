//! Deterministic report rendering and section extraction.
//!
//! The text frame around the model's answer is fixed, so downstream
//! consumers (and the golden-prompt extractor) can rely on it.

use crate::models::{ModelAnswer, RunReport, Sections};
use anyhow::Result;
use serde::Serialize;

/// Banner opening the last-error section.
pub const LAST_ERROR_BANNER: &str = "LAST ERROR FOUND:";
/// Banner opening the root-cause section.
pub const ROOT_CAUSE_BANNER: &str = "ROOT CAUSE ANALYSIS:";
/// Banner opening the rectification-steps section.
pub const STEPS_BANNER: &str = "RECTIFICATION STEPS:";

const RULE: &str = "==================================================";

/// Render the fixed text frame around a run's answer.
pub fn render_text(report: &RunReport, receipts_dir: &str) -> String {
    let mut out = Vec::new();

    out.push("=== loghelper (local) ===".to_string());
    out.push(format!("Files scanned: {}", report.files_used.len()));
    let patterns = if report.patterns.is_empty() {
        "none".to_string()
    } else {
        report
            .patterns
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    out.push(format!("Top patterns: {}", patterns));
    out.push(String::new());

    out.push("AI ANALYSIS RESULTS:".to_string());
    out.push(RULE.to_string());
    out.push(String::new());
    out.push(format_answer(&report.answer));

    if report.receipt_path.is_some() {
        out.push(String::new());
        out.push(format!(
            "A detailed receipt was saved to the {}/ folder.",
            receipts_dir.trim_end_matches('/')
        ));
    }

    out.join("\n")
}

/// Format the model's answer for display. Structured answers in the
/// legacy shape (root_cause / why / next_steps) become numbered
/// lists; free text passes through unchanged.
pub fn format_answer(answer: &ModelAnswer) -> String {
    let value = match answer {
        ModelAnswer::Text(text) => return text.clone(),
        ModelAnswer::Structured(value) => value,
    };

    let root_cause = value["root_cause"].as_str().unwrap_or("Analysis unavailable");
    let mut out = format!("Root Cause: {}\n", root_cause);

    if let Some(why) = value["why"].as_array() {
        if !why.is_empty() {
            out.push_str("\nDETAILED ANALYSIS:\n");
            out.push_str(&"-".repeat(30));
            out.push('\n');
            for (i, item) in why.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, as_display(item)));
            }
        }
    }

    if let Some(steps) = value["next_steps"].as_array() {
        if !steps.is_empty() {
            out.push_str("\nRECOMMENDED ACTIONS:\n");
            out.push_str(&"-".repeat(30));
            out.push('\n');
            for (i, step) in steps.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, as_display(step)));
            }
        }
    }

    out
}

fn as_display(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Extract the three contract sections from rendered or raw model
/// text. Missing sections yield empty entries; text outside the
/// banners is ignored.
pub fn extract_sections(text: &str) -> Sections {
    #[derive(PartialEq)]
    enum State {
        Outside,
        LastError,
        RootCause,
        Steps,
    }

    let mut state = State::Outside;
    let mut sections = Sections::default();
    let mut last_error = Vec::new();
    let mut root_cause = Vec::new();

    for line in text.lines() {
        if line.contains(LAST_ERROR_BANNER) {
            state = State::LastError;
            continue;
        } else if line.contains(ROOT_CAUSE_BANNER) {
            state = State::RootCause;
            continue;
        } else if line.contains(STEPS_BANNER) {
            state = State::Steps;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.chars().all(|c| c == '=') {
            continue;
        }

        match state {
            State::Outside => {}
            State::LastError => last_error.push(trimmed.to_string()),
            State::RootCause => root_cause.push(trimmed.to_string()),
            State::Steps => {
                if is_numbered_step(trimmed) {
                    sections.steps.push(trimmed.to_string());
                }
            }
        }
    }

    sections.last_error = last_error.join("\n");
    sections.root_cause = root_cause.join("\n");
    sections
}

fn is_numbered_step(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(d), Some(')')) if d.is_ascii_digit()
    )
}

/// Build the hand-off prompt for a code assistant from extracted
/// sections.
pub fn golden_prompt(sections: &Sections) -> String {
    let steps = if sections.steps.is_empty() {
        "1. (no explicit steps were extracted; derive them from the root cause)".to_string()
    } else {
        sections
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "\
You are an expert software developer. Based on the following analysis, please fix the identified issues in the project.

ROOT CAUSE ANALYSIS:
{root_cause}

RECTIFICATION STEPS TO IMPLEMENT:
{steps}

TASK:
1. Review the root cause analysis above
2. Implement the rectification steps in the appropriate files
3. Provide specific code changes with line numbers where possible
4. Ensure the fixes address the exact error identified in the logs

REQUIREMENTS:
- Make precise code changes based on the analysis
- Keep changes minimal and focused on the identified root cause
- Test the changes to ensure they work correctly

Please implement these fixes step by step, explaining each change and why it's necessary.",
        root_cause = if sections.root_cause.is_empty() {
            "(not extracted)"
        } else {
            &sections.root_cause
        },
        steps = steps,
    )
}

/// Generate a Markdown report.
pub fn render_markdown(report: &RunReport, receipts_dir: &str) -> String {
    let mut out = String::new();

    out.push_str("# LogHelper Report\n\n");

    out.push_str("## Metadata\n\n");
    out.push_str(&format!(
        "- **Analysis Date:** {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("- **Model Used:** `{}`\n", report.model));
    out.push_str(&format!("- **Files Scanned:** {}\n", report.files_used.len()));
    out.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n\n",
        report.duration_ms as f64 / 1000.0
    ));

    out.push_str("## Files\n\n");
    for file in &report.files_used {
        out.push_str(&format!("- `{}`\n", file));
    }
    out.push('\n');

    if !report.patterns.is_empty() {
        out.push_str("## Top Patterns\n\n");
        out.push_str("| Pattern | Count |\n");
        out.push_str("|:---|:---:|\n");
        for p in &report.patterns {
            out.push_str(&format!("| {} | {} |\n", p.key, p.count));
        }
        out.push('\n');
    }

    out.push_str("## Analysis\n\n");
    out.push_str(&format_answer(&report.answer));
    out.push('\n');

    if let Some(ref path) = report.receipt_path {
        out.push_str(&format!(
            "\n---\n\n*Receipt appended to `{}` (receipts dir: `{}`)*\n",
            path.display(),
            receipts_dir
        ));
    }

    out
}

/// Serializable report document for `--format json`.
#[derive(Debug, Serialize)]
struct ReportDoc<'a> {
    generated_at: String,
    model: &'a str,
    files_scanned: usize,
    files_used: &'a [String],
    patterns: Vec<String>,
    duration_ms: u64,
    errors_found: bool,
    answer: serde_json::Value,
    receipt_path: Option<String>,
}

/// Generate a JSON report.
pub fn render_json(report: &RunReport) -> Result<String> {
    let doc = ReportDoc {
        generated_at: report.started_at.to_rfc3339(),
        model: &report.model,
        files_scanned: report.files_used.len(),
        files_used: &report.files_used,
        patterns: report.patterns.iter().map(|p| p.to_string()).collect(),
        duration_ms: report.duration_ms,
        errors_found: report.errors_found,
        answer: report.answer.to_value(),
        receipt_path: report
            .receipt_path
            .as_ref()
            .map(|p| p.display().to_string()),
    };

    serde_json::to_string_pretty(&doc).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatternCount;
    use chrono::Utc;
    use serde_json::json;
    use std::path::PathBuf;

    fn make_report(answer: ModelAnswer) -> RunReport {
        RunReport {
            files_used: vec!["logs/app.log".to_string()],
            patterns: vec![
                PatternCount {
                    key: "error".to_string(),
                    count: 3,
                },
                PatternCount {
                    key: "timeout".to_string(),
                    count: 1,
                },
            ],
            answer,
            model: "llama3".to_string(),
            duration_ms: 2500,
            started_at: Utc::now(),
            receipt_path: Some(PathBuf::from("receipts/20250101-120000.jsonl")),
            errors_found: true,
        }
    }

    #[test]
    fn test_render_text_frame() {
        let report = make_report(ModelAnswer::Text("The cache is stale.".to_string()));
        let text = render_text(&report, "receipts");

        assert!(text.starts_with("=== loghelper (local) ==="));
        assert!(text.contains("Files scanned: 1"));
        assert!(text.contains("Top patterns: error:3, timeout:1"));
        assert!(text.contains("AI ANALYSIS RESULTS:"));
        assert!(text.contains("The cache is stale."));
        assert!(text.contains("receipt was saved to the receipts/ folder"));
    }

    #[test]
    fn test_render_text_without_receipt() {
        let mut report = make_report(ModelAnswer::Text("x".to_string()));
        report.receipt_path = None;
        report.patterns.clear();
        let text = render_text(&report, "receipts");

        assert!(text.contains("Top patterns: none"));
        assert!(!text.contains("receipt was saved"));
    }

    #[test]
    fn test_format_answer_structured() {
        let answer = ModelAnswer::Structured(json!({
            "root_cause": "connection pool exhausted",
            "why": ["pool size is 5", "requests spike at noon"],
            "next_steps": ["raise pool size"],
        }));
        let text = format_answer(&answer);

        assert!(text.contains("Root Cause: connection pool exhausted"));
        assert!(text.contains("DETAILED ANALYSIS:"));
        assert!(text.contains("1. pool size is 5"));
        assert!(text.contains("RECOMMENDED ACTIONS:"));
        assert!(text.contains("1. raise pool size"));
    }

    #[test]
    fn test_extract_sections() {
        let text = "\
preamble

LAST ERROR FOUND:
==================================================
ERROR: payment gateway declined PAY_001

ROOT CAUSE ANALYSIS:
==================================================
The gateway rejects cards when the retry budget is exhausted.
Retries are not backed off.

RECTIFICATION STEPS:
==================================================
1) Add exponential backoff to the retry loop
2) Map decline codes to user messages
not a step
3) Add a regression test
";
        let sections = extract_sections(text);

        assert_eq!(
            sections.last_error,
            "ERROR: payment gateway declined PAY_001"
        );
        assert!(sections.root_cause.contains("retry budget"));
        assert_eq!(sections.steps.len(), 3);
        assert!(sections.steps[0].starts_with("1)"));
    }

    #[test]
    fn test_extract_sections_missing_are_empty() {
        let sections = extract_sections("no banners at all");
        assert!(sections.is_empty());
    }

    #[test]
    fn test_golden_prompt_embeds_sections() {
        let sections = Sections {
            last_error: "ERROR: boom".to_string(),
            root_cause: "Null config on startup.".to_string(),
            steps: vec!["1) Guard the config load".to_string()],
        };
        let prompt = golden_prompt(&sections);

        assert!(prompt.contains("Null config on startup."));
        assert!(prompt.contains("1. 1) Guard the config load"));
        assert!(prompt.contains("TASK:"));
        assert!(prompt.contains("REQUIREMENTS:"));
    }

    #[test]
    fn test_render_markdown() {
        let report = make_report(ModelAnswer::Text("analysis body".to_string()));
        let md = render_markdown(&report, "receipts");

        assert!(md.contains("# LogHelper Report"));
        assert!(md.contains("## Metadata"));
        assert!(md.contains("| error | 3 |"));
        assert!(md.contains("analysis body"));
    }

    #[test]
    fn test_render_json_parses_back() {
        let report = make_report(ModelAnswer::Structured(json!({"root_cause": "x"})));
        let text = render_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["model"], "llama3");
        assert_eq!(value["files_scanned"], 1);
        assert_eq!(value["answer"]["root_cause"], "x");
        assert_eq!(value["errors_found"], true);
    }
}
