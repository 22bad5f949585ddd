//! Continuous file-watching re-analysis loop.
//!
//! A notify watcher feeds changed log paths into a channel; the loop
//! applies a trailing-edge debounce and a minimum-interval floor,
//! then re-runs the analysis pipeline. Ctrl-C stops the loop; an
//! in-flight step is dropped at its next await point.

use crate::analysis::{Analyzer, Source};
use crate::models::Outcome;
use anyhow::{Context, Result};
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Timing policy for the loop.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Quiet window required after the last event before triggering.
    pub debounce: Duration,
    /// Minimum spacing between consecutive analyses.
    pub min_interval: Duration,
}

/// Directories to watch for a source: the scanned folder itself, or
/// the parent directories of an explicit file list (deduplicated).
pub fn watch_roots(source: &Source) -> Vec<PathBuf> {
    match source {
        Source::Folder(dir) => vec![dir.clone()],
        Source::Files(paths) => {
            let roots: BTreeSet<PathBuf> = paths
                .iter()
                .map(|p| {
                    p.parent()
                        .filter(|parent| !parent.as_os_str().is_empty())
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from("."))
                })
                .collect();
            roots.into_iter().collect()
        }
    }
}

/// Run the watch loop until ctrl-c or watcher shutdown. Every
/// trigger re-runs the analysis and hands the outcome to `render`;
/// re-analysis failures are logged and the loop continues.
pub async fn run(
    analyzer: &Analyzer,
    source: &Source,
    project: Option<&Path>,
    options: &WatchOptions,
    mut render: impl FnMut(&Outcome),
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();

    let extensions = analyzer.scanner().config().extensions.clone();
    let mut watcher =
        notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    for path in event.paths {
                        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                        if extensions.iter().any(|e| e == ext) {
                            let _ = tx.send(path);
                        }
                    }
                }
            }
        })
        .context("Failed to create file watcher")?;

    for root in watch_roots(source) {
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;
    }

    info!("Watching for log changes (ctrl-c to stop)");

    // First analysis runs immediately; watch then waits for changes.
    match analyzer.analyze(source, project).await {
        Ok(outcome) => render(&outcome),
        Err(e) => warn!("Initial analysis failed: {}", e),
    }
    let mut last_run = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch mode");
                break;
            }
            alive = handle_trigger(
                analyzer,
                source,
                project,
                options,
                &mut rx,
                &mut last_run,
                &mut render,
            ) => {
                if !alive {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Wait for one trigger, debounce it, honor the interval floor, then
/// re-analyze. Returns false when the event channel closed.
async fn handle_trigger(
    analyzer: &Analyzer,
    source: &Source,
    project: Option<&Path>,
    options: &WatchOptions,
    rx: &mut mpsc::UnboundedReceiver<PathBuf>,
    last_run: &mut Instant,
    render: &mut impl FnMut(&Outcome),
) -> bool {
    let Some(first) = rx.recv().await else {
        return false;
    };
    debug!("Change detected: {}", first.display());

    if !wait_quiet(rx, options.debounce).await {
        return false;
    }

    // Interval floor: coalesce triggers landing inside it.
    let since = last_run.elapsed();
    if since < options.min_interval {
        sleep(options.min_interval - since).await;
    }
    while rx.try_recv().is_ok() {}

    match analyzer.analyze(source, project).await {
        Ok(outcome) => render(&outcome),
        Err(e) => warn!("Re-analysis failed: {}", e),
    }
    *last_run = Instant::now();
    true
}

/// Trailing-edge debounce: consume events until `debounce` elapses
/// with none arriving. Returns false when the channel closed.
async fn wait_quiet(rx: &mut mpsc::UnboundedReceiver<PathBuf>, debounce: Duration) -> bool {
    loop {
        match timeout(debounce, rx.recv()).await {
            Ok(Some(_)) => continue,
            Ok(None) => return false,
            Err(_) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_roots_folder() {
        let source = Source::Folder(PathBuf::from("logs"));
        assert_eq!(watch_roots(&source), vec![PathBuf::from("logs")]);
    }

    #[test]
    fn test_watch_roots_files_dedup_parents() {
        let source = Source::Files(vec![
            PathBuf::from("logs/app.log"),
            PathBuf::from("logs/worker.log"),
            PathBuf::from("other/svc.log"),
            PathBuf::from("bare.log"),
        ]);
        let roots = watch_roots(&source);
        assert_eq!(
            roots,
            vec![
                PathBuf::from("."),
                PathBuf::from("logs"),
                PathBuf::from("other"),
            ]
        );
    }

    #[tokio::test]
    async fn test_wait_quiet_elapses() {
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        tx.send(PathBuf::from("a.log")).unwrap();

        // one pending event is drained, then the window elapses
        assert!(wait_quiet(&mut rx, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_wait_quiet_detects_close() {
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        drop(tx);
        assert!(!wait_quiet(&mut rx, Duration::from_millis(10)).await);
    }
}
