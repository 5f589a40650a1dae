//! Debounced file watching
//!
//! Raw notify events are filtered against the shared [`IgnoreRules`] and
//! the extractor registry, then collapsed by a trailing debounce window:
//! a burst of saves produces one batch of unique paths after the window
//! of quiet. Batches are delivered over a channel; the consumer decides
//! how to fold them into the index.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WatchError;
use crate::extract::ExtractorRegistry;
use crate::index::walker::IgnoreRules;

/// Collapses a stream of paths into batches separated by a quiet window.
///
/// Every recorded path pushes the deadline out; the batch is taken when
/// the deadline passes with no new events.
#[derive(Debug)]
pub struct DebounceBatcher {
    pending: HashSet<PathBuf>,
    deadline: Option<Instant>,
    window: Duration,
}

impl DebounceBatcher {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashSet::new(),
            deadline: None,
            window,
        }
    }

    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path);
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain the pending set as a sorted batch and clear the deadline
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.deadline = None;
        let mut batch: Vec<PathBuf> = self.pending.drain().collect();
        batch.sort();
        batch
    }
}

/// Watches a project tree and delivers debounced batches of changed paths
pub struct FileWatcher {
    // Held so the notify backend keeps running; dropped on stop
    _watcher: RecommendedWatcher,
    cancel: CancellationToken,
}

impl FileWatcher {
    /// Start watching `root` recursively. Filtered, debounced batches
    /// arrive on `batch_tx`; call [`FileWatcher::stop`] to shut down.
    pub fn spawn(
        root: &Path,
        rules: Arc<IgnoreRules>,
        registry: Arc<ExtractorRegistry>,
        debounce: Duration,
        batch_tx: mpsc::Sender<Vec<PathBuf>>,
    ) -> Result<Self, WatchError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<PathBuf>();

        let root_owned = root.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let event = match result {
                Ok(event) => event,
                Err(err) => {
                    warn!("Watch error: {err}");
                    return;
                }
            };
            if !is_relevant_kind(&event.kind) {
                return;
            }
            for path in event.paths {
                // Removal events cannot be stat'd, so relevance is judged
                // from the path alone
                if rules.is_ignored(&path) || !registry.is_indexable(&path) {
                    continue;
                }
                let path = path
                    .strip_prefix(&root_owned)
                    .map(Path::to_path_buf)
                    .unwrap_or(path);
                let _ = event_tx.send(path);
            }
        })
        .map_err(|e| WatchError::InitFailed {
            reason: e.to_string(),
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        let cancel = CancellationToken::new();
        tokio::spawn(debounce_loop(
            event_rx,
            debounce,
            batch_tx,
            cancel.clone(),
        ));
        info!("Watching {} (debounce {:?})", root.display(), debounce);

        Ok(Self {
            _watcher: watcher,
            cancel,
        })
    }

    /// Stop delivering batches. Safe to call more than once.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn is_relevant_kind(kind: &notify::EventKind) -> bool {
    use notify::EventKind;
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Drives the batcher: accumulate events, emit a batch once the quiet
/// window elapses, exit on cancellation or when the event source closes
async fn debounce_loop(
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    window: Duration,
    batch_tx: mpsc::Sender<Vec<PathBuf>>,
    cancel: CancellationToken,
) {
    let mut batcher = DebounceBatcher::new(window);
    loop {
        let deadline = batcher
            .deadline()
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Watch loop cancelled");
                return;
            }
            received = events.recv() => {
                match received {
                    Some(path) => batcher.record(path),
                    None => return,
                }
            }
            _ = tokio::time::sleep_until(deadline), if batcher.deadline().is_some() => {
                let batch = batcher.take();
                if !batch.is_empty() {
                    debug!("Debounce window closed: {} changed paths", batch.len());
                    if batch_tx.send(batch).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_of_events_yields_one_batch() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (batch_tx, mut batch_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        tokio::spawn(debounce_loop(
            event_rx,
            Duration::from_millis(1500),
            batch_tx,
            cancel.clone(),
        ));

        for name in ["a.rs", "b.rs", "a.rs", "c.rs", "a.rs"] {
            event_tx.send(PathBuf::from(name)).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(1600)).await;

        let batch = batch_rx.recv().await.expect("one batch");
        assert_eq!(
            batch,
            vec![
                PathBuf::from("a.rs"),
                PathBuf::from("b.rs"),
                PathBuf::from("c.rs")
            ]
        );

        // Nothing else queued
        assert!(batch_rx.try_recv().is_err());
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn new_event_extends_the_window() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (batch_tx, mut batch_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        tokio::spawn(debounce_loop(
            event_rx,
            Duration::from_millis(1000),
            batch_tx,
            cancel.clone(),
        ));

        event_tx.send(PathBuf::from("a.rs")).unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        event_tx.send(PathBuf::from("b.rs")).unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;

        // Second event pushed the deadline past 1600ms, so nothing yet
        assert!(batch_rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        let batch = batch_rx.recv().await.expect("one batch");
        assert_eq!(batch.len(), 2);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_delivery() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (batch_tx, mut batch_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(debounce_loop(
            event_rx,
            Duration::from_millis(1000),
            batch_tx,
            cancel.clone(),
        ));

        event_tx.send(PathBuf::from("a.rs")).unwrap();
        cancel.cancel();
        // Idempotent
        cancel.cancel();
        task.await.unwrap();

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(batch_rx.recv().await.is_none());
    }

    #[test]
    fn batcher_deduplicates_and_sorts() {
        let mut batcher = DebounceBatcher::new(Duration::from_millis(100));
        batcher.record(PathBuf::from("z.rs"));
        batcher.record(PathBuf::from("a.rs"));
        batcher.record(PathBuf::from("z.rs"));
        assert!(batcher.deadline().is_some());

        let batch = batcher.take();
        assert_eq!(batch, vec![PathBuf::from("a.rs"), PathBuf::from("z.rs")]);
        assert!(batcher.is_empty());
        assert!(batcher.deadline().is_none());
    }
}
