//! Binary persistence for the index artifact
//!
//! The index is serialized with bincode into a single file under the
//! index directory. Writes go through a temp file plus rename under the
//! advisory lock, so readers never observe a torn artifact. A version
//! mismatch or undecodable file loads as "no index"; the caller rebuilds.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::index::model::{CodeIndex, SCHEMA_VERSION};
use crate::store::lock::IndexLock;

#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    /// A store backed by the given artifact path (e.g. `.codescout/index.bin`)
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Persist the index atomically under the exclusive lock
    pub fn save(&self, index: &CodeIndex) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let _lock = IndexLock::acquire(&self.path)?;

        let bytes = bincode::serde::encode_to_vec(index, bincode::config::standard())
            .map_err(|e| StoreError::Encode(e.to_string()))?;

        let tmp = self.path.with_extension("bin.tmp");
        fs::write(&tmp, &bytes).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(
            "Saved index: {} files, {} symbols, {} bytes",
            index.metadata.file_count,
            index.metadata.symbol_count,
            bytes.len()
        );
        Ok(())
    }

    /// Load the persisted index.
    ///
    /// Returns Ok(None) when the artifact is missing, undecodable, or
    /// carries a different schema version; all three mean "rebuild".
    pub fn load(&self) -> StoreResult<Option<CodeIndex>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let _lock = IndexLock::acquire(&self.path)?;
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let decoded: Result<(CodeIndex, usize), _> =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard());
        let index = match decoded {
            Ok((index, _)) => index,
            Err(err) => {
                warn!(
                    "Index artifact at {} is undecodable ({err}); treating as absent",
                    self.path.display()
                );
                return Ok(None);
            }
        };

        if index.metadata.schema_version != SCHEMA_VERSION {
            warn!(
                "Index schema {} does not match current {SCHEMA_VERSION}; treating as absent",
                index.metadata.schema_version
            );
            return Ok(None);
        }

        debug!(
            "Loaded index: {} files, {} symbols",
            index.metadata.file_count, index.metadata.symbol_count
        );
        Ok(Some(index))
    }

    /// Remove the artifact if present
    pub fn clear(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileExtraction, Symbol, SymbolKey, SymbolKind};
    use tempfile::TempDir;

    fn sample_index() -> CodeIndex {
        let mut index = CodeIndex::new();
        let symbol = Symbol {
            name: "login".to_string(),
            kind: SymbolKind::Function,
            start_line: 3,
            end_line: 9,
            exported: true,
            signature: Some("fn login(user: &str) -> bool".to_string()),
            file: PathBuf::from("src/auth.rs"),
        };
        let key = symbol.key();
        index.insert_file(
            Path::new("src/auth.rs"),
            FileExtraction {
                symbols: vec![symbol],
                imports: vec![],
            },
        );
        index.embeddings.insert(key, Some(vec![0.25, -0.5, 1.0]));
        index
            .embeddings
            .insert(
                SymbolKey {
                    file: PathBuf::from("src/auth.rs"),
                    name: "login".to_string(),
                    start_line: 99,
                },
                None,
            );
        index.refresh_metadata();
        index
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join(".codescout/index.bin"));

        let index = sample_index();
        store.save(&index).unwrap();
        let loaded = store.load().unwrap().expect("artifact present");
        assert_eq!(loaded, index);
    }

    #[test]
    fn missing_artifact_loads_as_none() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index.bin"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_artifact_loads_as_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.bin");
        fs::write(&path, b"definitely not bincode").unwrap();

        let store = IndexStore::new(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn schema_mismatch_loads_as_none() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index.bin"));

        let mut index = sample_index();
        index.metadata.schema_version = "0.9.0".to_string();
        store.save(&index).unwrap();

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index.bin"));
        store.save(&sample_index()).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!store.exists());
    }
}
