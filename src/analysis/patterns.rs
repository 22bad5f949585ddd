//! Error keyword counting and error-line matching.

use crate::models::PatternCount;
use std::collections::BTreeMap;

/// Keywords counted across scanned log lines. Matching is
/// case-insensitive substring search; keys with surrounding spaces
/// are trimmed before reporting.
pub const ERROR_KEYS: &[&str] = &[
    "error",
    "exception",
    "traceback",
    "failed",
    "timeout",
    "fatal",
    "panic",
    "stack",
    "500",
    " 4xx ",
    " 5xx ",
    "warn",
    "warning",
    "performance",
    "resultsCount:0",
    "high value",
    "large",
    "slow",
    "cart limit",
    "search",
    "inventory",
    "stock",
    "checkout",
    "order",
    "transaction",
];

/// How many top patterns are reported.
pub const TOP_PATTERNS: usize = 6;

/// Count keyword hits across lines. Keys are trimmed. The BTreeMap
/// keeps key order deterministic for the later tie-break.
pub fn count_patterns<'a, I>(lines: I) -> BTreeMap<&'static str, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for line in lines {
        let lowered = line.to_lowercase();
        for key in ERROR_KEYS {
            if lowered.contains(&key.to_lowercase()) {
                *counts.entry(key.trim()).or_insert(0) += 1;
            }
        }
    }

    counts
}

/// Merge one count map into an accumulator.
pub fn merge_counts(acc: &mut BTreeMap<&'static str, usize>, counts: BTreeMap<&'static str, usize>) {
    for (key, count) in counts {
        *acc.entry(key).or_insert(0) += count;
    }
}

/// Order counts highest first and keep the top `n`. Ties order
/// lexicographically by keyword so the summary is stable across runs.
pub fn top_patterns(counts: &BTreeMap<&'static str, usize>, n: usize) -> Vec<PatternCount> {
    let mut pairs: Vec<PatternCount> = counts
        .iter()
        .map(|(key, count)| PatternCount {
            key: key.to_string(),
            count: *count,
        })
        .collect();

    // BTreeMap iteration already orders keys; a stable sort by count
    // keeps the lexicographic order within ties.
    pairs.sort_by(|a, b| b.count.cmp(&a.count));
    pairs.truncate(n);
    pairs
}

/// Count keyword hits across lines and return the top patterns.
pub fn summarize_patterns<S: AsRef<str>>(lines: &[S]) -> Vec<PatternCount> {
    let counts = count_patterns(lines.iter().map(|l| l.as_ref()));
    top_patterns(&counts, TOP_PATTERNS)
}

/// Whether a line merely mentions an error (used for window
/// extraction and the last-error display line).
pub fn mentions_error(line: &str) -> bool {
    line.to_lowercase().contains("error")
}

/// Whether a line looks error-like: error, exception, failed,
/// timeout, fatal, panic, or a standalone 5xx status token.
pub fn is_error_like(line: &str) -> bool {
    let lowered = line.to_lowercase();
    const NEEDLES: &[&str] = &["error", "exception", "failed", "timeout", "fatal", "panic"];
    if NEEDLES.iter().any(|n| lowered.contains(n)) {
        return true;
    }
    has_5xx_token(&lowered)
}

/// Find the last error-like line in a text, scanning bottom-up.
pub fn last_error_line(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .find(|line| is_error_like(line))
        .map(|line| line.trim().to_string())
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Match a standalone `5dd` token: a '5' followed by exactly two
/// digits, not embedded in a longer word or number.
fn has_5xx_token(line: &str) -> bool {
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'5' {
            continue;
        }
        if i > 0 && is_word_byte(bytes[i - 1]) {
            continue;
        }
        if i + 2 >= bytes.len() {
            continue;
        }
        if !bytes[i + 1].is_ascii_digit() || !bytes[i + 2].is_ascii_digit() {
            continue;
        }
        if i + 3 < bytes.len() && is_word_byte(bytes[i + 3]) {
            continue;
        }
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_counts_and_order() {
        let lines = vec![
            "ERROR: checkout failed".to_string(),
            "error in search".to_string(),
            "slow request".to_string(),
        ];
        let patterns = summarize_patterns(&lines);

        let error = patterns.iter().find(|p| p.key == "error").unwrap();
        assert_eq!(error.count, 2);
        let failed = patterns.iter().find(|p| p.key == "failed").unwrap();
        assert_eq!(failed.count, 1);
        // highest count first
        assert_eq!(patterns[0].key, "error");
    }

    #[test]
    fn test_summarize_tie_order_is_stable() {
        let lines = vec!["search inventory stock".to_string()];
        let patterns = summarize_patterns(&lines);
        let keys: Vec<&str> = patterns.iter().map(|p| p.key.as_str()).collect();
        // all count 1, so lexicographic
        assert_eq!(keys, vec!["inventory", "search", "stock"]);
    }

    #[test]
    fn test_summarize_truncates_to_top() {
        let lines =
            vec!["error exception failed timeout fatal panic stack warn slow".to_string()];
        let patterns = summarize_patterns(&lines);
        assert_eq!(patterns.len(), TOP_PATTERNS);
    }

    #[test]
    fn test_is_error_like() {
        assert!(is_error_like("ERROR: boom"));
        assert!(is_error_like("request Timed out... TIMEOUT"));
        assert!(is_error_like("HTTP 503 from upstream"));
        assert!(!is_error_like("all good"));
        // embedded digits are not a status token
        assert!(!is_error_like("order 1503 shipped"));
        assert!(!is_error_like("id=5031"));
    }

    #[test]
    fn test_last_error_line_picks_bottom_most() {
        let text = "ok\nERROR: first\ninfo\nERROR: second\ntrailing ok";
        assert_eq!(last_error_line(text).unwrap(), "ERROR: second");
        assert!(last_error_line("nothing here").is_none());
    }
}
