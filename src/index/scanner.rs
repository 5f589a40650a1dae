//! Tree scanner: full scans, incremental updates, startup reconciliation
//!
//! Extraction is a pure per-file function, so the full scan fans out over
//! a rayon pool and merges results by file path, keeping the produced
//! index deterministic. A single file failing to read or extract never
//! aborts a scan; the failure is recorded in the stats and the scan
//! moves on.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::embedding::{EmbeddingState, symbol_text};
use crate::error::{IndexError, IndexResult};
use crate::extract::ExtractorRegistry;
use crate::index::model::CodeIndex;
use crate::index::progress::{ScanProgress, ScanStats};
use crate::index::walker::{FileWalker, IgnoreRules};
use crate::types::{FileExtraction, SymbolKey};

/// Progress callback: (processed_files, total_files). The lifetime lets
/// callers report into borrowed state for the duration of one scan.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Sync + 'a;

/// A staged mutation for one file, computed outside the index write lock
/// so readers are only blocked for the splice itself
#[derive(Debug)]
pub enum FileUpdate {
    /// File no longer exists; drop all of its entries
    Remove(PathBuf),
    /// Replace the file's entries wholesale
    Replace {
        path: PathBuf,
        extraction: FileExtraction,
        embeddings: Vec<(SymbolKey, Option<Vec<f32>>)>,
    },
}

pub struct Scanner {
    settings: Arc<Settings>,
    registry: Arc<ExtractorRegistry>,
    embeddings: Arc<EmbeddingState>,
}

impl Scanner {
    pub fn new(
        settings: Arc<Settings>,
        registry: Arc<ExtractorRegistry>,
        embeddings: Arc<EmbeddingState>,
    ) -> Self {
        Self {
            settings,
            registry,
            embeddings,
        }
    }

    /// Walk the tree and build a fresh index from scratch.
    ///
    /// `progress` tracks the scan for concurrent query handlers; the
    /// optional callback receives (processed, total) per file for
    /// long-running scans.
    pub fn full_scan(
        &self,
        root: &Path,
        rules: &IgnoreRules,
        progress: &ScanProgress,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> IndexResult<(CodeIndex, ScanStats)> {
        let mut stats = ScanStats::new();
        let walker = FileWalker::new(self.settings.clone());
        let files = walker.walk(root, rules, &self.registry);
        let total = files.len();
        info!("Full scan: {total} files under {}", root.display());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.indexing.parallel_threads.max(1))
            .build()
            .map_err(|e| IndexError::General(format!("Failed to build scan pool: {e}")))?;
        progress.begin(total);

        // par_iter + collect preserves input order, so the merge below is
        // deterministic without re-sorting
        let extracted: Vec<(PathBuf, Result<FileExtraction, String>)> = pool.install(|| {
            files
                .into_par_iter()
                .map(|rel| {
                    let outcome = self.extract_one(root, &rel);
                    let processed = progress.tick();
                    if let Some(callback) = on_progress {
                        callback(processed, total);
                    }
                    (rel, outcome)
                })
                .collect()
        });

        let mut index = CodeIndex::new();
        for (rel, outcome) in extracted {
            match outcome {
                Ok(extraction) => {
                    stats.files_indexed += 1;
                    stats.symbols_found += extraction.symbols.len();
                    self.stage_embeddings(&mut index, &extraction);
                    index.insert_file(&rel, extraction);
                }
                Err(reason) => {
                    // Unreadable or binary files drop out of this scan
                    debug!("Failed to index {}: {reason}", rel.display());
                    stats.add_error(rel, reason);
                }
            }
        }

        index.refresh_metadata();
        progress.finish();
        stats.stop_timing();
        Ok((index, stats))
    }

    /// Stage updates for a batch of changed paths against the current
    /// index. Runs extraction and embedding work without holding any
    /// index lock; apply the result with [`Scanner::apply_updates`].
    pub fn prepare_updates(
        &self,
        current: &CodeIndex,
        root: &Path,
        rules: &IgnoreRules,
        paths: &[PathBuf],
    ) -> Vec<FileUpdate> {
        let mut relative: Vec<PathBuf> = paths
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| p.clone())
            })
            .collect();
        relative.sort();
        relative.dedup();

        let mut updates = Vec::new();
        for rel in relative {
            if rules.is_ignored(&rel) {
                continue;
            }
            let absolute = root.join(&rel);
            if !absolute.exists() {
                if current.contains_file(&rel) {
                    updates.push(FileUpdate::Remove(rel));
                }
                continue;
            }
            if !self.registry.is_indexable(&rel) {
                continue;
            }
            let extraction = self.extract_one(root, &rel).unwrap_or_default();
            let embeddings = self.embeddings_for(current, &extraction);
            updates.push(FileUpdate::Replace {
                path: rel,
                extraction,
                embeddings,
            });
        }
        updates
    }

    /// Splice staged updates into the index. Returns true if anything
    /// changed; metadata counts are refreshed only in that case, so
    /// re-applying an unchanged batch leaves the index bit-identical.
    pub fn apply_updates(index: &mut CodeIndex, updates: Vec<FileUpdate>) -> bool {
        let mut changed = false;
        for update in updates {
            match update {
                FileUpdate::Remove(path) => {
                    changed |= index.remove_file(&path);
                }
                FileUpdate::Replace {
                    path,
                    extraction,
                    embeddings,
                } => {
                    let keys: Vec<SymbolKey> =
                        extraction.symbols.iter().map(|s| s.key()).collect();
                    let same_content = index.symbols_for(&path)
                        == Some(extraction.symbols.as_slice())
                        && index.imports_for(&path) == Some(extraction.imports.as_slice());
                    if !same_content {
                        index.insert_file(&path, extraction);
                        changed = true;
                    }
                    // Drop embeddings orphaned by the new extraction
                    let before = index.embeddings.len();
                    index
                        .embeddings
                        .retain(|key, _| key.file != path || keys.contains(key));
                    changed |= index.embeddings.len() != before;

                    for (key, vector) in embeddings {
                        if index.embeddings.get(&key) != Some(&vector) {
                            index.embeddings.insert(key, vector);
                            changed = true;
                        }
                    }
                }
            }
        }
        if changed {
            index.refresh_metadata();
        }
        changed
    }

    /// Reconcile a loaded index against the live filesystem under a
    /// deadline: files added since the build are indexed, removed files
    /// are dropped, files modified after `built_at` are re-extracted.
    ///
    /// Returns false when the deadline was exceeded; the index is then
    /// left as loaded, preferring availability over freshness.
    pub fn validate_and_sync(
        &self,
        index: &mut CodeIndex,
        root: &Path,
        rules: &IgnoreRules,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let walker = FileWalker::new(self.settings.clone());
        let live = walker.walk(root, rules, &self.registry);
        if Instant::now() >= deadline {
            warn!("Startup reconciliation timed out during walk; keeping loaded index");
            return false;
        }

        let built_at = index.metadata.built_at;
        let mut changed_paths: Vec<PathBuf> = Vec::new();
        for rel in &live {
            if Instant::now() >= deadline {
                warn!("Startup reconciliation timed out; keeping loaded index");
                return false;
            }
            if !index.contains_file(rel) {
                changed_paths.push(rel.clone());
                continue;
            }
            let modified = root
                .join(rel)
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .is_some_and(|d| d.as_secs() > built_at);
            if modified {
                changed_paths.push(rel.clone());
            }
        }
        for indexed in index.symbols_by_file.keys() {
            if !live.contains(indexed) {
                changed_paths.push(indexed.clone());
            }
        }

        if changed_paths.is_empty() {
            debug!("Startup reconciliation: index is in sync");
            return true;
        }
        info!(
            "Startup reconciliation: {} files out of sync",
            changed_paths.len()
        );
        let updates = self.prepare_updates(index, root, rules, &changed_paths);
        if Instant::now() >= deadline {
            warn!("Startup reconciliation timed out before apply; keeping loaded index");
            return false;
        }
        Self::apply_updates(index, updates);
        true
    }

    /// Read and extract one file. `Err` carries a human-readable reason;
    /// the caller decides whether that means "skip" or "empty entry".
    fn extract_one(&self, root: &Path, rel: &Path) -> Result<FileExtraction, String> {
        let absolute = root.join(rel);
        let bytes = std::fs::read(&absolute).map_err(|e| format!("read failed: {e}"))?;
        if bytes.iter().take(512).any(|b| *b == 0) {
            return Err("binary content".to_string());
        }
        let content = String::from_utf8_lossy(&bytes);
        let language = match self.registry.language_for_path(rel) {
            Some(lang) => lang,
            None => return Ok(FileExtraction::default()),
        };
        // Extraction errors degrade to an empty result by contract
        Ok(self
            .registry
            .extract(language, rel, &content)
            .unwrap_or_default())
    }

    /// Embeddings for a fresh full-scan extraction
    fn stage_embeddings(&self, index: &mut CodeIndex, extraction: &FileExtraction) {
        if !self.settings.semantic_search.enabled || !self.embeddings.is_configured() {
            return;
        }
        for symbol in extraction.symbols.iter().filter(|s| s.exported) {
            let key = symbol.key();
            let vector = self.embeddings.embed(&symbol_text(symbol));
            index.embeddings.insert(key, vector);
        }
    }

    /// Embedding entries for an incremental replacement: keys with a stored
    /// vector carry it over; new keys, and keys recorded absent while the
    /// provider was down, get a best-effort embed
    fn embeddings_for(
        &self,
        current: &CodeIndex,
        extraction: &FileExtraction,
    ) -> Vec<(SymbolKey, Option<Vec<f32>>)> {
        if !self.settings.semantic_search.enabled || !self.embeddings.is_configured() {
            return Vec::new();
        }
        extraction
            .symbols
            .iter()
            .filter(|s| s.exported)
            .map(|symbol| {
                let key = symbol.key();
                let vector = match current.embeddings.get(&key) {
                    Some(Some(existing)) => Some(existing.clone()),
                    // embed() respects the cooldown, so absent entries are
                    // not retried against a provider that is still failing
                    Some(None) | None => self.embeddings.embed(&symbol_text(symbol)),
                };
                (key, vector)
            })
            .collect()
    }
}
