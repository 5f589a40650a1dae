//! The in-memory index: symbols, imports, and embeddings per file

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{FileExtraction, ImportEdge, Symbol, SymbolKey};

/// Version tag of the persisted artifact. A mismatch on load is treated as
/// "does not exist" and forces a full rebuild; there is no in-place
/// migration.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub schema_version: String,
    /// Unix timestamp (seconds) of the last full build or update
    pub built_at: u64,
    pub file_count: u32,
    pub symbol_count: u32,
}

impl IndexMetadata {
    fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            built_at: unix_now(),
            file_count: 0,
            symbol_count: 0,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The complete queryable collection of symbols, imports, and embeddings
/// for a project tree.
///
/// Files are keyed by their index-relative path; BTreeMap keeps iteration
/// deterministic, which the search tie-break and the parallel scanner's
/// merge step both rely on. Embedding entries are `None` when computation
/// failed or was skipped, never a zero vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeIndex {
    pub symbols_by_file: BTreeMap<PathBuf, Vec<Symbol>>,
    pub imports_by_file: BTreeMap<PathBuf, Vec<ImportEdge>>,
    pub embeddings: HashMap<SymbolKey, Option<Vec<f32>>>,
    pub metadata: IndexMetadata,
}

impl Default for CodeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeIndex {
    pub fn new() -> Self {
        Self {
            symbols_by_file: BTreeMap::new(),
            imports_by_file: BTreeMap::new(),
            embeddings: HashMap::new(),
            metadata: IndexMetadata::new(),
        }
    }

    /// Replace the entries for one file with a fresh extraction.
    ///
    /// Invariant: every stored `Symbol.file` equals the map key.
    pub fn insert_file(&mut self, path: &Path, extraction: FileExtraction) {
        debug_assert!(extraction.symbols.iter().all(|s| s.file == path));
        self.symbols_by_file
            .insert(path.to_path_buf(), extraction.symbols);
        self.imports_by_file
            .insert(path.to_path_buf(), extraction.imports);
    }

    /// Remove every trace of a file: symbols, imports, and embeddings
    pub fn remove_file(&mut self, path: &Path) -> bool {
        let had_symbols = self.symbols_by_file.remove(path).is_some();
        let had_imports = self.imports_by_file.remove(path).is_some();
        self.embeddings.retain(|key, _| key.file != path);
        had_symbols || had_imports
    }

    /// Recompute metadata counts from the live maps and stamp the build time
    pub fn refresh_metadata(&mut self) {
        self.metadata.file_count = self.symbols_by_file.len() as u32;
        self.metadata.symbol_count = self
            .symbols_by_file
            .values()
            .map(|symbols| symbols.len() as u32)
            .sum();
        self.metadata.built_at = unix_now();
    }

    pub fn contains_file(&self, path: &Path) -> bool {
        self.symbols_by_file.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.symbols_by_file.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols_by_file.values().map(Vec::len).sum()
    }

    /// All symbols in scan order: files in path order, symbols in file order
    pub fn iter_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols_by_file.values().flatten()
    }

    pub fn symbols_for(&self, path: &Path) -> Option<&[Symbol]> {
        self.symbols_by_file.get(path).map(Vec::as_slice)
    }

    pub fn imports_for(&self, path: &Path) -> Option<&[ImportEdge]> {
        self.imports_by_file.get(path).map(Vec::as_slice)
    }

    /// Exported symbol names for a file
    pub fn exports_for(&self, path: &Path) -> Option<Vec<String>> {
        self.symbols_for(path).map(|symbols| {
            symbols
                .iter()
                .filter(|s| s.exported)
                .map(|s| s.name.clone())
                .collect()
        })
    }

    /// Import edges whose source module matches, across all files
    pub fn imports_of_module(&self, module: &str) -> Vec<(PathBuf, ImportEdge)> {
        self.imports_by_file
            .iter()
            .flat_map(|(file, edges)| {
                edges
                    .iter()
                    .filter(|edge| edge.source_module == module)
                    .map(|edge| (file.clone(), edge.clone()))
            })
            .collect()
    }
}
