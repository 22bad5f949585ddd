//! Log file discovery and bounded reading.
//!
//! This module finds the newest log files under a folder and reads
//! them under strict byte caps. A missing or unreadable file never
//! aborts a run; it contributes nothing.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for log scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions treated as logs (without dot).
    pub extensions: Vec<String>,
    /// Scan up to this many of the newest files.
    pub max_files: usize,
    /// Total byte budget across all scanned files.
    pub max_bytes_total: usize,
    /// Tail bytes read per file when retrieving the last error.
    pub tail_bytes_per_file: usize,
    /// Total tail bytes across files.
    pub tail_bytes_total: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["log", "txt", "out"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_files: 5,
            max_bytes_total: 10 * 1024 * 1024,
            tail_bytes_per_file: 200_000,
            tail_bytes_total: 500_000,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            max_files: config.max_files,
            max_bytes_total: config.max_bytes_total,
            tail_bytes_per_file: config.tail_bytes_per_file,
            tail_bytes_total: config.tail_bytes_total,
        }
    }
}

/// A discovered log file.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Absolute or as-given path.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Log file scanner.
pub struct LogScanner {
    config: ScanConfig,
}

impl LogScanner {
    /// Create a scanner with the given caps.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Caps in effect, for receipts and display.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Whether a path carries one of the configured log extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config.extensions.iter().any(|e| e == ext)
    }

    /// Recursively find log files under `folder`, newest first,
    /// capped at `max_files`.
    pub fn discover(&self, folder: &Path) -> Vec<ScannedFile> {
        let mut found: Vec<ScannedFile> = Vec::new();

        for entry in WalkDir::new(folder)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !self.matches_extension(path) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push(ScannedFile {
                path: path.to_path_buf(),
                size: metadata.len(),
                modified,
            });
        }

        found.sort_by(|a, b| b.modified.cmp(&a.modified));
        found.truncate(self.config.max_files);
        found
    }

    /// Stat a list of explicit files, skipping entries that are not
    /// regular files. The given order is preserved.
    pub fn stat_files(&self, paths: &[PathBuf]) -> Vec<ScannedFile> {
        paths
            .iter()
            .filter_map(|p| {
                let metadata = fs::metadata(p).ok()?;
                if !metadata.is_file() {
                    return None;
                }
                Some(ScannedFile {
                    path: p.clone(),
                    size: metadata.len(),
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                })
            })
            .collect()
    }

    /// Read at most `max_bytes` from the start of a file, lossy UTF-8.
    ///
    /// Any I/O error yields an empty string; the caller treats that
    /// file as contributing nothing.
    pub fn read_capped(&self, path: &Path, max_bytes: usize) -> String {
        match fs::File::open(path) {
            Ok(file) => {
                let mut buf = Vec::new();
                match file.take(max_bytes as u64).read_to_end(&mut buf) {
                    Ok(_) => String::from_utf8_lossy(&buf).into_owned(),
                    Err(e) => {
                        debug!("Failed to read {}: {}", path.display(), e);
                        String::new()
                    }
                }
            }
            Err(e) => {
                debug!("Failed to open {}: {}", path.display(), e);
                String::new()
            }
        }
    }

    /// Collect lines from the tails of the given files, newest first,
    /// under the per-file and total tail byte caps.
    pub fn tail_lines(&self, paths: &[PathBuf]) -> Vec<String> {
        let mut files = self.stat_files(paths);
        files.sort_by(|a, b| b.modified.cmp(&a.modified));

        let mut lines = Vec::new();
        let mut consumed = 0usize;

        for file in files {
            if consumed >= self.config.tail_bytes_total {
                break;
            }
            let text = match self.read_tail(&file.path) {
                Some(t) => t,
                None => continue,
            };
            consumed += text.len();
            lines.extend(text.lines().map(String::from));
        }

        lines
    }

    fn read_tail(&self, path: &Path) -> Option<String> {
        let mut file = fs::File::open(path).ok()?;
        let size = file.seek(SeekFrom::End(0)).ok()?;
        let start = size.saturating_sub(self.config.tail_bytes_per_file as u64);
        file.seek(SeekFrom::Start(start)).ok()?;
        let mut buf = Vec::new();
        file.take(self.config.tail_bytes_per_file as u64)
            .read_to_end(&mut buf)
            .ok()?;
        Some(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str, age: Duration) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[test]
    fn test_discover_newest_first_with_cap() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "old.log", "a", Duration::from_secs(300));
        write_file(dir.path(), "new.log", "b", Duration::from_secs(10));
        write_file(dir.path(), "mid.txt", "c", Duration::from_secs(100));
        write_file(dir.path(), "skip.json", "d", Duration::from_secs(5));

        let scanner = LogScanner::new(ScanConfig {
            max_files: 2,
            ..ScanConfig::default()
        });

        let files = scanner.discover(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].path.ends_with("new.log"));
        assert!(files[1].path.ends_with("mid.txt"));
    }

    #[test]
    fn test_discover_recurses() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        write_file(&sub, "deep.out", "x", Duration::from_secs(1));

        let scanner = LogScanner::new(ScanConfig::default());
        let files = scanner.discover(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("deep.out"));
    }

    #[test]
    fn test_read_capped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.log", "hello world", Duration::ZERO);

        let scanner = LogScanner::new(ScanConfig::default());
        assert_eq!(scanner.read_capped(&path, 5), "hello");
        assert_eq!(scanner.read_capped(&path, 1024), "hello world");
        // missing file reads as empty
        assert_eq!(scanner.read_capped(&dir.path().join("nope.log"), 5), "");
    }

    #[test]
    fn test_tail_lines_caps_and_order() {
        let dir = TempDir::new().unwrap();
        let old = write_file(
            dir.path(),
            "old.log",
            "early one\nearly two\n",
            Duration::from_secs(200),
        );
        let new = write_file(
            dir.path(),
            "new.log",
            "recent one\nrecent two\n",
            Duration::from_secs(5),
        );

        let scanner = LogScanner::new(ScanConfig::default());
        let lines = scanner.tail_lines(&[old.clone(), new.clone()]);
        // newest file's lines come first
        assert_eq!(lines[0], "recent one");
        assert_eq!(lines.len(), 4);

        // per-file cap keeps only the end of each file
        let tight = LogScanner::new(ScanConfig {
            tail_bytes_per_file: 11,
            ..ScanConfig::default()
        });
        let lines = tight.tail_lines(&[new]);
        assert_eq!(lines, vec!["recent two"]);
    }

    #[test]
    fn test_stat_files_skips_missing() {
        let dir = TempDir::new().unwrap();
        let good = write_file(dir.path(), "a.log", "x", Duration::ZERO);
        let missing = dir.path().join("gone.log");

        let scanner = LogScanner::new(ScanConfig::default());
        let files = scanner.stat_files(&[good, missing]);
        assert_eq!(files.len(), 1);
    }
}
