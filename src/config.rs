//! Configuration module for the index-and-search engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CODESCOUT_` and use double
//! underscores to separate nested levels:
//! - `CODESCOUT_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`
//! - `CODESCOUT_FILE_WATCH__DEBOUNCE_MS=500` sets `file_watch.debounce_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Directory holding the persisted index artifact
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .codescout is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// File watching settings
    #[serde(default)]
    pub file_watch: FileWatchConfig,

    /// Semantic search settings
    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Number of parallel threads for extraction
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Extra ignore patterns, gitignore syntax, applied on top of the
    /// standard excludes and .gitignore contents
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Files larger than this are skipped entirely
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Deadline for startup reconciliation against the live tree
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FileWatchConfig {
    /// Enable automatic re-indexing of changed files
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quiet period after the last event before a batch is flushed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SemanticSearchConfig {
    /// Enable embedding generation and semantic search
    #[serde(default = "default_false")]
    pub enabled: bool,

    /// Similarity threshold for semantic results
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f32,

    /// Cooldown after a provider failure before the next attempt
    #[serde(default = "default_cooldown_secs")]
    pub retry_cooldown_secs: u64,
}

// Default value functions
fn default_index_path() -> PathBuf {
    PathBuf::from(".codescout")
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_max_file_size() -> u64 {
    1_048_576
}
fn default_sync_timeout_secs() -> u64 {
    30
}
fn default_debounce_ms() -> u64 {
    1500
}
fn default_similarity_threshold() -> f32 {
    0.3
}
fn default_cooldown_secs() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            workspace_root: None,
            debug: false,
            indexing: IndexingConfig::default(),
            file_watch: FileWatchConfig::default(),
            semantic_search: SemanticSearchConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ignore_patterns: Vec::new(),
            max_file_size: default_max_file_size(),
            sync_timeout_secs: default_sync_timeout_secs(),
        }
    }
}

impl Default for FileWatchConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            enabled: default_false(),
            threshold: default_similarity_threshold(),
            retry_cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl Settings {
    /// Load settings with the full layering: defaults, then codescout.toml,
    /// then environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("codescout.toml"))
            .merge(Env::prefixed("CODESCOUT_").split("__"))
            .extract()
    }

    /// Path of the persisted index artifact
    pub fn index_file(&self) -> PathBuf {
        let base = match &self.workspace_root {
            Some(root) => root.join(&self.index_path),
            None => self.index_path.clone(),
        };
        base.join("index.bin")
    }
}
