//! Code-aware index and search for project trees
//!
//! Scans a workspace, extracts symbols and import edges per language with
//! lexical rules, persists the result as a versioned binary artifact, and
//! serves ranked exact/fuzzy/semantic search over it. A debounced watcher
//! keeps the index current as files change.
//!
//! # Example
//!
//! ```no_run
//! use codescout::{IndexService, SearchQuery, Settings};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = Arc::new(Settings::load()?);
//! let service = IndexService::new(settings, None)?;
//! service.load_or_rebuild()?;
//! let results = service.search(&SearchQuery::new("login"))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod search;
pub mod service;
pub mod store;
pub mod types;

pub use config::Settings;
pub use embedding::{EmbeddingProvider, EmbeddingState};
pub use error::{IndexError, IndexResult, QueryError, QueryResult};
pub use index::{CodeIndex, ScanStats, Scanner};
pub use search::{MatchReason, SearchEngine, SearchMode, SearchQuery, SearchResult};
pub use service::{FileInfo, IndexService, ServiceStatus};
pub use store::IndexStore;
pub use types::{FileExtraction, ImportEdge, Symbol, SymbolKey, SymbolKind};
