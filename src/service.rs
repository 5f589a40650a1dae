//! Orchestration of scanning, persistence, watching, and queries
//!
//! One writer, many readers: the index lives behind an `RwLock`, full
//! rebuilds and update batches are prepared outside the lock and spliced
//! in under a short write hold, and every query path reports an unready
//! index as a typed condition instead of blocking or panicking.

use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::embedding::{EmbeddingProvider, EmbeddingState};
use crate::error::{IndexError, IndexResult, QueryError, QueryResult, WatchError};
use crate::extract::ExtractorRegistry;
use crate::index::model::CodeIndex;
use crate::index::progress::{ScanProgress, ScanStats};
use crate::index::scanner::{ProgressFn, Scanner};
use crate::index::walker::IgnoreRules;
use crate::index::watcher::FileWatcher;
use crate::search::{SearchEngine, SearchMode, SearchQuery, SearchResult};
use crate::store::IndexStore;
use crate::types::{ImportEdge, Symbol};

/// Everything the index knows about one file
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportEdge>,
    pub exports: Vec<String>,
}

/// Current service condition, for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub initialized: bool,
    pub indexing: Option<(usize, usize)>,
    pub file_count: usize,
    pub symbol_count: usize,
    pub semantic_configured: bool,
}

pub struct IndexService {
    settings: Arc<Settings>,
    root: PathBuf,
    rules: Arc<IgnoreRules>,
    registry: Arc<ExtractorRegistry>,
    embeddings: Arc<EmbeddingState>,
    scanner: Scanner,
    engine: SearchEngine,
    store: IndexStore,
    index: RwLock<Option<CodeIndex>>,
    progress: Arc<ScanProgress>,
}

impl IndexService {
    /// Build a service rooted at `settings.workspace_root` (or the current
    /// directory). The embedding provider is optional; without one,
    /// semantic queries report unavailability and indexing skips vectors.
    pub fn new(
        settings: Arc<Settings>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> IndexResult<Self> {
        let root = match &settings.workspace_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().map_err(|e| {
                IndexError::General(format!("Cannot determine working directory: {e}"))
            })?,
        };
        let rules = Arc::new(IgnoreRules::build(&root, &settings)?);
        let registry = Arc::new(ExtractorRegistry::new()?);
        let embeddings = Arc::new(EmbeddingState::new(
            provider,
            Duration::from_secs(settings.semantic_search.retry_cooldown_secs),
        ));
        let scanner = Scanner::new(settings.clone(), registry.clone(), embeddings.clone());
        let engine = SearchEngine::new(embeddings.clone(), settings.semantic_search.threshold);
        let store = IndexStore::new(settings.index_file());

        Ok(Self {
            settings,
            root,
            rules,
            registry,
            embeddings,
            scanner,
            engine,
            store,
            index: RwLock::new(None),
            progress: Arc::new(ScanProgress::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Full scan from scratch; the previous index (if any) keeps serving
    /// reads until the new one is swapped in, then the artifact is saved.
    pub fn rebuild(&self, on_progress: Option<&ProgressFn<'_>>) -> IndexResult<ScanStats> {
        let (index, stats) =
            self.scanner
                .full_scan(&self.root, &self.rules, &self.progress, on_progress)?;
        *self.index.write() = Some(index);
        self.save()?;
        Ok(stats)
    }

    /// Load the persisted index if compatible, reconcile it with the live
    /// tree under the configured deadline, and fall back to a full rebuild
    /// when nothing usable is on disk. Returns true when a load sufficed.
    pub fn load_or_rebuild(&self) -> IndexResult<bool> {
        match self.store.load()? {
            Some(mut loaded) => {
                let timeout = Duration::from_secs(self.settings.indexing.sync_timeout_secs);
                let synced =
                    self.scanner
                        .validate_and_sync(&mut loaded, &self.root, &self.rules, timeout);
                *self.index.write() = Some(loaded);
                if synced {
                    self.save()?;
                } else {
                    warn!("Serving the loaded index unreconciled; a rebuild will catch up");
                }
                Ok(true)
            }
            None => {
                info!("No usable index artifact; running a full scan");
                self.rebuild(None)?;
                Ok(false)
            }
        }
    }

    /// Fold a batch of changed paths into the index. Extraction runs
    /// without the write lock; returns true if the index changed.
    pub fn apply_changes(&self, paths: &[PathBuf]) -> IndexResult<bool> {
        let updates = {
            let guard = self.index.read();
            let current = guard.as_ref().ok_or_else(|| {
                IndexError::General("Cannot apply changes before the index is built".to_string())
            })?;
            self.scanner
                .prepare_updates(current, &self.root, &self.rules, paths)
        };
        if updates.is_empty() {
            return Ok(false);
        }

        let changed = {
            let mut guard = self.index.write();
            let index = guard.as_mut().ok_or_else(|| {
                IndexError::General("Index disappeared while applying changes".to_string())
            })?;
            Scanner::apply_updates(index, updates)
        };
        if changed {
            self.save()?;
        }
        Ok(changed)
    }

    /// Persist the current index; a no-op when nothing is loaded
    pub fn save(&self) -> IndexResult<()> {
        let guard = self.index.read();
        if let Some(index) = guard.as_ref() {
            self.store.save(index)?;
        }
        Ok(())
    }

    /// Ranked symbol search.
    ///
    /// Pure semantic queries fail fast when no provider is usable;
    /// combined queries silently fall back to their lexical parts.
    pub fn search(&self, query: &SearchQuery) -> QueryResult<Vec<SearchResult>> {
        if let Some((processed, total)) = self.progress.snapshot() {
            return Err(QueryError::IndexingInProgress { processed, total });
        }
        if query.mode == SearchMode::Semantic {
            self.require_semantic()?;
        }
        let guard = self.index.read();
        let index = guard.as_ref().ok_or(QueryError::NotInitialized)?;
        Ok(self.engine.search(index, query))
    }

    /// Symbols, imports, and exports recorded for one file
    pub fn file_info(&self, path: &Path) -> QueryResult<FileInfo> {
        if let Some((processed, total)) = self.progress.snapshot() {
            return Err(QueryError::IndexingInProgress { processed, total });
        }
        let guard = self.index.read();
        let index = guard.as_ref().ok_or(QueryError::NotInitialized)?;
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let symbols = index
            .symbols_for(relative)
            .ok_or_else(|| QueryError::FileNotIndexed {
                path: relative.to_path_buf(),
            })?
            .to_vec();
        Ok(FileInfo {
            path: relative.to_path_buf(),
            symbols,
            imports: index.imports_for(relative).unwrap_or_default().to_vec(),
            exports: index.exports_for(relative).unwrap_or_default(),
        })
    }

    /// Files importing the given module, with their import edges
    pub fn importers_of(&self, module: &str) -> QueryResult<Vec<(PathBuf, ImportEdge)>> {
        if let Some((processed, total)) = self.progress.snapshot() {
            return Err(QueryError::IndexingInProgress { processed, total });
        }
        let guard = self.index.read();
        let index = guard.as_ref().ok_or(QueryError::NotInitialized)?;
        Ok(index.imports_of_module(module))
    }

    /// Import edges recorded for one file
    pub fn imports_in(&self, path: &Path) -> QueryResult<Vec<ImportEdge>> {
        if let Some((processed, total)) = self.progress.snapshot() {
            return Err(QueryError::IndexingInProgress { processed, total });
        }
        let guard = self.index.read();
        let index = guard.as_ref().ok_or(QueryError::NotInitialized)?;
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        index
            .imports_for(relative)
            .map(<[ImportEdge]>::to_vec)
            .ok_or_else(|| QueryError::FileNotIndexed {
                path: relative.to_path_buf(),
            })
    }

    pub fn status(&self) -> ServiceStatus {
        let guard = self.index.read();
        ServiceStatus {
            initialized: guard.is_some(),
            indexing: self.progress.snapshot(),
            file_count: guard.as_ref().map_or(0, CodeIndex::file_count),
            symbol_count: guard.as_ref().map_or(0, CodeIndex::symbol_count),
            semantic_configured: self.embeddings.is_configured(),
        }
    }

    /// Start the watch loop: debounced change batches are folded into the
    /// index and persisted until the returned watcher is stopped.
    pub fn start_watching(self: &Arc<Self>) -> Result<FileWatcher, WatchError> {
        let (batch_tx, mut batch_rx) = mpsc::channel::<Vec<PathBuf>>(16);
        let watcher = FileWatcher::spawn(
            &self.root,
            self.rules.clone(),
            self.registry.clone(),
            Duration::from_millis(self.settings.file_watch.debounce_ms),
            batch_tx,
        )?;

        let service = self.clone();
        tokio::spawn(async move {
            while let Some(batch) = batch_rx.recv().await {
                let worker = service.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || worker.apply_changes(&batch)).await;
                match outcome {
                    Ok(Ok(true)) => info!("Index updated from watch batch"),
                    Ok(Ok(false)) => {}
                    Ok(Err(err)) => error!("Failed to apply watch batch: {err}"),
                    Err(err) => error!("Watch batch task panicked: {err}"),
                }
            }
        });
        Ok(watcher)
    }

    fn require_semantic(&self) -> QueryResult<()> {
        if !self.embeddings.is_configured() {
            return Err(QueryError::SemanticUnavailable {
                reason: "no embedding provider configured".to_string(),
            });
        }
        if let Some(wait) = self.embeddings.retry_in() {
            return Err(QueryError::SemanticUnavailable {
                reason: format!("provider cooling down, retry in {}s", wait.as_secs().max(1)),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn service_for(root: &Path) -> IndexService {
        let mut settings = Settings::default();
        settings.workspace_root = Some(root.to_path_buf());
        IndexService::new(Arc::new(settings), None).unwrap()
    }

    #[test]
    fn queries_before_first_build_report_not_initialized() {
        let temp = TempDir::new().unwrap();
        let service = service_for(temp.path());

        let err = service.search(&SearchQuery::new("login")).unwrap_err();
        assert!(matches!(err, QueryError::NotInitialized));
        let err = service.file_info(Path::new("a.rs")).unwrap_err();
        assert!(matches!(err, QueryError::NotInitialized));
    }

    #[test]
    fn queries_during_scan_report_progress() {
        let temp = TempDir::new().unwrap();
        let service = service_for(temp.path());
        service.progress.begin(10);
        service.progress.tick();

        let err = service.search(&SearchQuery::new("login")).unwrap_err();
        match err {
            QueryError::IndexingInProgress { processed, total } => {
                assert_eq!((processed, total), (1, 10));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rebuild_then_search_and_file_info() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("auth.rs"),
            "use crate::session::Session;\n\npub fn login(user: &str) -> Session {\n    Session::new(user)\n}\n",
        )
        .unwrap();

        let service = service_for(temp.path());
        let stats = service.rebuild(None).unwrap();
        assert_eq!(stats.files_indexed, 1);

        let results = service.search(&SearchQuery::new("login")).unwrap();
        assert_eq!(results[0].symbol.name, "login");

        let info = service.file_info(Path::new("auth.rs")).unwrap();
        assert_eq!(info.exports, vec!["login".to_string()]);
        assert_eq!(info.imports.len(), 1);

        let err = service.file_info(Path::new("missing.rs")).unwrap_err();
        assert!(matches!(err, QueryError::FileNotIndexed { .. }));
    }

    #[test]
    fn semantic_without_provider_is_a_typed_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.rs"), "pub fn alpha() {}\n").unwrap();
        let service = service_for(temp.path());
        service.rebuild(None).unwrap();

        let err = service
            .search(&SearchQuery::new("alpha").with_mode(SearchMode::Semantic))
            .unwrap_err();
        assert!(matches!(err, QueryError::SemanticUnavailable { .. }));

        // Combined mode degrades to lexical scoring instead
        let results = service
            .search(&SearchQuery::new("alpha").with_mode(SearchMode::Combined))
            .unwrap();
        assert_eq!(results[0].symbol.name, "alpha");
    }

    #[test]
    fn apply_changes_updates_queries_and_artifact() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.rs"), "pub fn alpha() {}\n").unwrap();
        let service = service_for(temp.path());
        service.rebuild(None).unwrap();

        fs::write(temp.path().join("a.rs"), "pub fn renamed_alpha() {}\n").unwrap();
        let changed = service.apply_changes(&[PathBuf::from("a.rs")]).unwrap();
        assert!(changed);

        let results = service.search(&SearchQuery::new("renamed_alpha")).unwrap();
        assert_eq!(results.len(), 1);
        assert!(service.search(&SearchQuery::new("alpha")).unwrap()[0]
            .symbol
            .name
            .contains("renamed"));

        // A fresh service sees the persisted update
        let second = service_for(temp.path());
        assert!(second.load_or_rebuild().unwrap());
        assert_eq!(
            second.search(&SearchQuery::new("renamed_alpha")).unwrap().len(),
            1
        );
    }

    #[test]
    fn load_or_rebuild_scans_when_artifact_missing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.rs"), "pub fn alpha() {}\n").unwrap();

        let service = service_for(temp.path());
        let loaded = service.load_or_rebuild().unwrap();
        assert!(!loaded);
        assert!(service.status().initialized);
        assert_eq!(service.status().file_count, 1);
    }
}
