//! Diagnostic prompt construction.
//!
//! The prompt layout is fixed: project context, code context, log
//! analysis, then the three-section answer contract whose banners the
//! report module later recognizes.

use std::fs;
use std::path::Path;

/// Character cap for the code-context block.
const CODE_CONTEXT_CHARS: usize = 3000;
/// Characters excerpted from each key file.
const KEY_FILE_CHARS: usize = 2000;
/// How many key files are excerpted.
const KEY_FILE_LIMIT: usize = 4;
/// How many project file names are listed in the prompt.
const LISTED_FILES: usize = 10;

/// Extensions considered source-like when picking key files.
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "js", "ts", "py", "java", "go", "rb", "php", "html", "css",
];

/// Detect the project kind from marker files.
pub fn detect_project_kind(project: Option<&Path>) -> &'static str {
    let Some(dir) = project else {
        return "unknown";
    };

    let markers: &[(&str, &str)] = &[
        ("package.json", "nodejs"),
        ("requirements.txt", "python"),
        ("pom.xml", "java"),
        ("Cargo.toml", "rust"),
    ];

    for (marker, kind) in markers {
        if dir.join(marker).exists() {
            return kind;
        }
    }
    "unknown"
}

/// Top-level file names of the project folder, sorted.
pub fn project_files(project: Option<&Path>) -> Vec<String> {
    let Some(dir) = project else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Excerpt the first chars of up to `KEY_FILE_LIMIT` source-like
/// top-level files, each under a `=== name ===` header.
pub fn read_project_context(project: Option<&Path>) -> String {
    let Some(dir) = project else {
        return String::new();
    };

    let mut context = String::new();
    let mut taken = 0;

    for name in project_files(Some(dir)) {
        if taken >= KEY_FILE_LIMIT {
            break;
        }
        let path = dir.join(&name);
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !SOURCE_EXTENSIONS.contains(&ext) {
            continue;
        }
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        context.push_str(&format!(
            "\n\n=== {} ===\n{}\n",
            name,
            truncate_chars(&content, KEY_FILE_CHARS)
        ));
        taken += 1;
    }

    context
}

/// Build the diagnostic prompt.
pub fn build_prompt(
    project: Option<&Path>,
    snippets: &str,
    max_prompt_chars: usize,
) -> String {
    let kind = detect_project_kind(project);
    let files = project_files(project);
    let listed = if files.is_empty() {
        "none detected".to_string()
    } else {
        files
            .iter()
            .take(LISTED_FILES)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    let folder = project
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "not provided".to_string());
    let context = read_project_context(project);

    format!(
        "\
You are a senior software diagnostics assistant analyzing application logs.

[Project Context]
- Project kind: {kind}
- Key files: {listed}
- Project folder: {folder}

[Code Context]
{context}

[Log Analysis]
{snippets}

TASK: Provide a structured analysis with these exact sections:

1. LAST ERROR: Display the exact last error from the log
2. ROOT CAUSE: Detailed analysis of why this error occurred in the project
3. RECTIFICATION STEPS: Specific steps to fix this error

FORMAT - Return exactly this structure:

LAST ERROR FOUND:
==================================================
[The exact last error line from the log file]

ROOT CAUSE ANALYSIS:
==================================================
[Why this error occurred: the code issue, the business logic problem, and the technical cause]

RECTIFICATION STEPS:
==================================================
1) [Specific code change with file and line references]
2) [File modification required]
3) [Configuration change needed]
4) [Testing steps to verify the fix]
5) [Additional preventive measures]

CONSTRAINTS:
- Provide exact file paths and line numbers where possible
- Give specific code changes for the error
- Keep each section detailed but concise",
        kind = kind,
        listed = listed,
        folder = folder,
        context = truncate_chars(&context, CODE_CONTEXT_CHARS),
        snippets = truncate_chars(snippets, max_prompt_chars),
    )
    .trim()
    .to_string()
}

/// Truncate to a character count on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_detect_project_kind() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_project_kind(Some(dir.path())), "unknown");
        assert_eq!(detect_project_kind(None), "unknown");

        touch(dir.path(), "package.json", "{}");
        assert_eq!(detect_project_kind(Some(dir.path())), "nodejs");
    }

    #[test]
    fn test_project_context_excerpts_source_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "app.js", "console.log('hi');");
        touch(dir.path(), "notes.md", "not source");

        let context = read_project_context(Some(dir.path()));
        assert!(context.contains("=== app.js ==="));
        assert!(context.contains("console.log"));
        assert!(!context.contains("notes.md"));
    }

    #[test]
    fn test_build_prompt_sections_present() {
        let prompt = build_prompt(None, "### app.log\nERROR: boom", 8000);

        assert!(prompt.contains("[Project Context]"));
        assert!(prompt.contains("Key files: none detected"));
        assert!(prompt.contains("Project folder: not provided"));
        assert!(prompt.contains("[Log Analysis]"));
        assert!(prompt.contains("ERROR: boom"));
        assert!(prompt.contains("LAST ERROR FOUND:"));
        assert!(prompt.contains("ROOT CAUSE ANALYSIS:"));
        assert!(prompt.contains("RECTIFICATION STEPS:"));
    }

    #[test]
    fn test_build_prompt_caps_log_content() {
        let snippets = "x".repeat(10_000);
        let prompt = build_prompt(None, &snippets, 100);
        // the snippet block is capped, the contract text still follows
        assert!(!prompt.contains(&"x".repeat(101)));
        assert!(prompt.contains("RECTIFICATION STEPS:"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
