//! Ranked symbol search over the in-memory index
//!
//! Four modes share one pipeline: score every symbol that passes the
//! filters, keep those above the mode's floor, sort by score descending
//! with scan order breaking ties, truncate to the limit. Combined mode
//! merges the per-mode scores by symbol identity before ranking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::embedding::{EmbeddingState, cosine_similarity};
use crate::index::model::CodeIndex;
use crate::types::{Symbol, SymbolKind};

/// Fuzzy matches below this similarity are noise
const FUZZY_FLOOR: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    Exact,
    Fuzzy,
    Semantic,
    /// Exact and semantic scores summed per symbol; the default. Degrades
    /// to exact-only scoring when no embedding provider is usable.
    #[default]
    Combined,
}

/// How a result earned its score
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum MatchReason {
    ExactName,
    NameContains,
    PathContains,
    Fuzzy { similarity: f32 },
    Semantic { similarity: f32 },
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub mode: SearchMode,
    /// Restrict to one symbol kind
    pub kind: Option<SymbolKind>,
    /// Restrict to exported symbols
    pub exported_only: bool,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: SearchMode::default(),
            kind: None,
            exported_only: false,
            limit: 10,
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_kind(mut self, kind: SymbolKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn exported_only(mut self) -> Self {
        self.exported_only = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResult {
    pub symbol: Symbol,
    pub score: f32,
    pub reasons: Vec<MatchReason>,
}

/// Stateless ranking over an index snapshot; semantic scoring borrows the
/// shared embedding state
pub struct SearchEngine {
    embeddings: Arc<EmbeddingState>,
    semantic_threshold: f32,
}

impl SearchEngine {
    pub fn new(embeddings: Arc<EmbeddingState>, semantic_threshold: f32) -> Self {
        Self {
            embeddings,
            semantic_threshold,
        }
    }

    pub fn search(&self, index: &CodeIndex, query: &SearchQuery) -> Vec<SearchResult> {
        if query.limit == 0 || query.text.is_empty() {
            return Vec::new();
        }

        // Ordinal = position in deterministic scan order; it both keys the
        // combined-mode merge and breaks score ties
        let mut scored: HashMap<usize, (f32, Vec<MatchReason>, &Symbol)> = HashMap::new();
        let query_lower = query.text.to_lowercase();

        if matches!(query.mode, SearchMode::Exact | SearchMode::Combined) {
            self.collect(index, query, &mut scored, |symbol| {
                score_exact(&query_lower, symbol)
            });
        }
        if query.mode == SearchMode::Fuzzy {
            self.collect(index, query, &mut scored, |symbol| {
                score_fuzzy(&query_lower, symbol)
            });
        }
        if matches!(query.mode, SearchMode::Semantic | SearchMode::Combined) {
            if let Some(query_vector) = self.embeddings.embed(&query.text) {
                self.collect(index, query, &mut scored, |symbol| {
                    let vector = index.embeddings.get(&symbol.key())?.as_ref()?;
                    let similarity = cosine_similarity(&query_vector, vector);
                    (similarity > self.semantic_threshold)
                        .then_some((similarity, MatchReason::Semantic { similarity }))
                });
            }
            // No query vector: semantic contributes nothing and the other
            // modes (if any) stand alone
        }

        let mut ranked: Vec<(usize, f32, Vec<MatchReason>, &Symbol)> = scored
            .into_iter()
            .map(|(ordinal, (score, reasons, symbol))| (ordinal, score, reasons, symbol))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(query.limit);

        ranked
            .into_iter()
            .map(|(_, score, reasons, symbol)| SearchResult {
                symbol: symbol.clone(),
                score,
                reasons,
            })
            .collect()
    }

    fn collect<'a, F>(
        &self,
        index: &'a CodeIndex,
        query: &SearchQuery,
        scored: &mut HashMap<usize, (f32, Vec<MatchReason>, &'a Symbol)>,
        score_fn: F,
    ) where
        F: Fn(&Symbol) -> Option<(f32, MatchReason)>,
    {
        for (ordinal, symbol) in index.iter_symbols().enumerate() {
            if let Some(kind) = query.kind {
                if symbol.kind != kind {
                    continue;
                }
            }
            if query.exported_only && !symbol.exported {
                continue;
            }
            if let Some((score, reason)) = score_fn(symbol) {
                let entry = scored
                    .entry(ordinal)
                    .or_insert_with(|| (0.0, Vec::new(), symbol));
                entry.0 += score;
                entry.1.push(reason);
            }
        }
    }
}

/// Case-insensitive match: 1.0 exact name, 0.7 name contains the query,
/// 0.5 file path contains the query
fn score_exact(query_lower: &str, symbol: &Symbol) -> Option<(f32, MatchReason)> {
    let name_lower = symbol.name.to_lowercase();
    if name_lower == query_lower {
        return Some((1.0, MatchReason::ExactName));
    }
    if name_lower.contains(query_lower) {
        return Some((0.7, MatchReason::NameContains));
    }
    let path_lower = symbol.file.to_string_lossy().to_lowercase();
    if path_lower.contains(query_lower) {
        return Some((0.5, MatchReason::PathContains));
    }
    None
}

/// Edit-distance similarity, kept only above the floor
fn score_fuzzy(query_lower: &str, symbol: &Symbol) -> Option<(f32, MatchReason)> {
    let name_lower = symbol.name.to_lowercase();
    let longest = query_lower.chars().count().max(name_lower.chars().count());
    if longest == 0 {
        return None;
    }
    let distance = levenshtein(query_lower, &name_lower);
    let similarity = 1.0 - distance as f32 / longest as f32;
    (similarity > FUZZY_FLOOR).then_some((similarity, MatchReason::Fuzzy { similarity }))
}

/// Classic two-row Levenshtein over chars
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileExtraction;
    use std::path::{Path, PathBuf};

    fn symbol(file: &str, name: &str, line: u32, kind: SymbolKind, exported: bool) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind,
            start_line: line,
            end_line: line + 4,
            exported,
            signature: None,
            file: PathBuf::from(file),
        }
    }

    fn sample_index() -> CodeIndex {
        let mut index = CodeIndex::new();
        index.insert_file(
            Path::new("src/auth.rs"),
            FileExtraction {
                symbols: vec![
                    symbol("src/auth.rs", "login", 3, SymbolKind::Function, true),
                    symbol("src/auth.rs", "login_attempts", 20, SymbolKind::Const, false),
                ],
                imports: vec![],
            },
        );
        index.insert_file(
            Path::new("src/ui.rs"),
            FileExtraction {
                symbols: vec![
                    symbol("src/ui.rs", "LoginForm", 1, SymbolKind::Class, true),
                    symbol("src/ui.rs", "logout", 40, SymbolKind::Function, true),
                ],
                imports: vec![],
            },
        );
        index.refresh_metadata();
        index
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(Arc::new(EmbeddingState::disabled()), 0.3)
    }

    #[test]
    fn default_mode_is_combined() {
        assert_eq!(SearchMode::default(), SearchMode::Combined);
        assert_eq!(SearchQuery::new("login").mode, SearchMode::Combined);
    }

    #[test]
    fn exact_mode_ranks_name_match_above_partial_matches() {
        let index = sample_index();
        let results = engine().search(
            &index,
            &SearchQuery::new("login").with_mode(SearchMode::Exact),
        );

        let names: Vec<&str> = results.iter().map(|r| r.symbol.name.as_str()).collect();
        assert_eq!(names, vec!["login", "login_attempts", "LoginForm"]);
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[0].reasons, vec![MatchReason::ExactName]);
        assert_eq!(results[1].score, 0.7);
        // Case-insensitive: "LoginForm" contains "login"
        assert_eq!(results[2].score, 0.7);
        assert_eq!(results[2].reasons, vec![MatchReason::NameContains]);
    }

    #[test]
    fn exact_mode_falls_back_to_path_containment() {
        let index = sample_index();
        let results = engine().search(
            &index,
            &SearchQuery::new("auth").with_mode(SearchMode::Exact),
        );

        // No symbol is named "auth"; everything in src/auth.rs matches by path
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score == 0.5));
        assert!(
            results
                .iter()
                .all(|r| r.reasons == vec![MatchReason::PathContains])
        );
        assert!(
            results
                .iter()
                .all(|r| r.symbol.file == PathBuf::from("src/auth.rs"))
        );
    }

    #[test]
    fn exact_name_outranks_partial_for_same_query() {
        // A function `login` and a class `Login` in different files: both
        // score 1.0 and the earlier file wins the tie
        let mut index = CodeIndex::new();
        index.insert_file(
            Path::new("a.ts"),
            FileExtraction {
                symbols: vec![symbol("a.ts", "login", 1, SymbolKind::Function, true)],
                imports: vec![],
            },
        );
        index.insert_file(
            Path::new("b.ts"),
            FileExtraction {
                symbols: vec![symbol("b.ts", "Login", 1, SymbolKind::Class, true)],
                imports: vec![],
            },
        );
        index.refresh_metadata();

        let results = engine().search(&index, &SearchQuery::new("login"));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol.name, "login");
        assert_eq!(results[0].symbol.kind, SymbolKind::Function);
        assert_eq!(results[1].symbol.name, "Login");
        assert!(results.iter().all(|r| r.score == 1.0));
    }

    #[test]
    fn equal_scores_break_ties_by_scan_order() {
        let index = sample_index();
        let results = engine().search(&index, &SearchQuery::new("login"));
        // login_attempts (auth.rs) precedes LoginForm (ui.rs) in path order
        assert_eq!(results[1].symbol.file, PathBuf::from("src/auth.rs"));
        assert_eq!(results[2].symbol.file, PathBuf::from("src/ui.rs"));
    }

    #[test]
    fn fuzzy_mode_tolerates_typos() {
        let index = sample_index();
        let results = engine().search(
            &index,
            &SearchQuery::new("lgin").with_mode(SearchMode::Fuzzy),
        );
        assert_eq!(results[0].symbol.name, "login");
        assert!(matches!(results[0].reasons[0], MatchReason::Fuzzy { .. }));

        // Distant names stay out
        assert!(results.iter().all(|r| r.symbol.name != "LoginForm"));
    }

    #[test]
    fn filters_narrow_candidates() {
        let index = sample_index();

        let by_kind = engine().search(
            &index,
            &SearchQuery::new("login").with_kind(SymbolKind::Class),
        );
        assert_eq!(by_kind.len(), 1);
        assert_eq!(by_kind[0].symbol.name, "LoginForm");

        let exported = engine().search(&index, &SearchQuery::new("login").exported_only());
        assert!(exported.iter().all(|r| r.symbol.exported));
        assert!(exported.iter().all(|r| r.symbol.name != "login_attempts"));
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let index = sample_index();
        assert!(
            engine()
                .search(&index, &SearchQuery::new("login").with_limit(0))
                .is_empty()
        );
    }

    #[test]
    fn semantic_mode_without_provider_is_empty() {
        let index = sample_index();
        let results = engine().search(
            &index,
            &SearchQuery::new("login").with_mode(SearchMode::Semantic),
        );
        assert!(results.is_empty());
    }

    #[test]
    fn semantic_mode_uses_stored_embeddings() {
        use crate::embedding::testing::StubProvider;
        use crate::embedding::{EmbeddingProvider, symbol_text};
        use std::time::Duration;

        let mut index = sample_index();
        let provider = Arc::new(StubProvider::default());
        for sym in index.iter_symbols().filter(|s| s.exported).cloned().collect::<Vec<_>>() {
            let vector = provider.embed(&symbol_text(&sym)).unwrap();
            index.embeddings.insert(sym.key(), Some(vector));
        }

        let state = Arc::new(EmbeddingState::new(
            Some(provider),
            Duration::from_secs(60),
        ));
        let engine = SearchEngine::new(state, 0.3);
        let results = engine.search(
            &index,
            &SearchQuery::new("function login").with_mode(SearchMode::Semantic),
        );
        assert!(!results.is_empty());
        assert!(
            results
                .iter()
                .all(|r| matches!(r.reasons[0], MatchReason::Semantic { similarity } if similarity > 0.3))
        );
        // "function login" shares both words with the login symbol's text
        assert_eq!(results[0].symbol.name, "login");
    }

    #[test]
    fn combined_mode_sums_exact_and_semantic_scores() {
        use crate::embedding::testing::StubProvider;
        use crate::embedding::{EmbeddingProvider, symbol_text};
        use std::time::Duration;

        let mut index = sample_index();
        let provider = Arc::new(StubProvider::default());
        let login = index
            .iter_symbols()
            .find(|s| s.name == "login")
            .cloned()
            .unwrap();
        let vector = provider.embed(&symbol_text(&login)).unwrap();
        index.embeddings.insert(login.key(), Some(vector));

        let state = Arc::new(EmbeddingState::new(
            Some(provider),
            Duration::from_secs(60),
        ));
        let both = SearchEngine::new(state, 0.3);
        let combined = both.search(
            &index,
            &SearchQuery::new("login").with_mode(SearchMode::Combined),
        );

        // Matched by both strategies: strictly higher than either alone
        let top = &combined[0];
        assert_eq!(top.symbol.name, "login");
        let exact_alone = both.search(
            &index,
            &SearchQuery::new("login").with_mode(SearchMode::Exact),
        );
        let semantic_alone = both.search(
            &index,
            &SearchQuery::new("login").with_mode(SearchMode::Semantic),
        );
        assert!(exact_alone.iter().all(|r| top.score > r.score));
        assert!(semantic_alone.iter().all(|r| top.score > r.score));
        assert!(
            top.reasons
                .iter()
                .any(|r| matches!(r, MatchReason::Semantic { .. }))
        );
    }

    #[test]
    fn combined_without_provider_degrades_to_exact() {
        let index = sample_index();
        let combined = engine().search(
            &index,
            &SearchQuery::new("login").with_mode(SearchMode::Combined),
        );
        assert_eq!(combined[0].symbol.name, "login");
        assert_eq!(combined[0].score, 1.0);
        assert_eq!(combined[0].reasons, vec![MatchReason::ExactName]);
    }

    #[test]
    fn fuzzy_score_decreases_with_edit_distance() {
        let name = Symbol {
            name: "configure".to_string(),
            kind: SymbolKind::Function,
            start_line: 1,
            end_line: 1,
            exported: true,
            signature: None,
            file: PathBuf::from("a.rs"),
        };
        // Queries at increasing distance from "configure"
        let scores: Vec<Option<f32>> = ["configure", "confgure", "confgre", "cnfgre"]
            .into_iter()
            .map(|q| score_fuzzy(q, &name).map(|(score, _)| score))
            .collect();
        let mut last = f32::INFINITY;
        for score in scores.into_iter().flatten() {
            assert!(score <= last);
            last = score;
        }
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("lgin", "login"), 1);
    }
}
