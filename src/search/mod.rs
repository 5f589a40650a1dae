//! Symbol search: exact, fuzzy, semantic, and combined ranking

pub mod engine;

pub use engine::{MatchReason, SearchEngine, SearchMode, SearchQuery, SearchResult};
