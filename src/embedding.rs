//! Embedding provider boundary for semantic search
//!
//! The model itself is an external collaborator: an opaque text→vector
//! function that may be unavailable. This module wraps a provider with the
//! availability/cooldown state the indexer and search engine share. A
//! symbol whose embedding failed to compute is recorded as absent, never
//! as a zero vector.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::EmbeddingError;
use crate::types::Symbol;

/// Opaque text→vector function
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension of produced vectors
    fn dimensions(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Availability {
    Ready,
    /// Provider failed; no attempts until the deadline passes
    CoolingDown(Instant),
}

/// Shared provider wrapper tracking availability across the indexer and
/// the search engine
pub struct EmbeddingState {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    availability: Mutex<Availability>,
    cooldown: Duration,
}

impl std::fmt::Debug for EmbeddingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingState")
            .field("configured", &self.provider.is_some())
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

impl EmbeddingState {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, cooldown: Duration) -> Self {
        Self {
            provider,
            availability: Mutex::new(Availability::Ready),
            cooldown,
        }
    }

    /// A state with no provider: every embed attempt yields None
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(60))
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether an embed attempt would be made right now
    pub fn is_available(&self) -> bool {
        if self.provider.is_none() {
            return false;
        }
        match *self.availability.lock() {
            Availability::Ready => true,
            Availability::CoolingDown(until) => Instant::now() >= until,
        }
    }

    /// Remaining cooldown, if the provider recently failed
    pub fn retry_in(&self) -> Option<Duration> {
        match *self.availability.lock() {
            Availability::CoolingDown(until) => {
                let now = Instant::now();
                (now < until).then(|| until - now)
            }
            Availability::Ready => None,
        }
    }

    /// Best-effort embedding: None when the provider is missing, cooling
    /// down, or fails. A failure starts the cooldown so indexing and
    /// queries degrade instead of hammering a dead provider.
    pub fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let provider = self.provider.as_ref()?;
        if !self.is_available() {
            return None;
        }
        match provider.embed(text) {
            Ok(vector) => {
                *self.availability.lock() = Availability::Ready;
                Some(vector)
            }
            Err(err) => {
                warn!("Embedding provider failed, cooling down: {err}");
                *self.availability.lock() = Availability::CoolingDown(Instant::now() + self.cooldown);
                None
            }
        }
    }
}

/// Text handed to the provider for a symbol: kind, name, and signature
/// when present
pub fn symbol_text(symbol: &Symbol) -> String {
    match &symbol.signature {
        Some(signature) => format!("{} {} {}", symbol.kind, symbol.name, signature),
        None => format!("{} {}", symbol.kind, symbol.name),
    }
}

/// Cosine similarity between two vectors; 0.0 when either is degenerate
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
pub mod testing {
    //! Deterministic provider for tests: hashes words into a small vector

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    pub struct StubProvider {
        pub fail: AtomicBool,
        pub calls: AtomicUsize,
    }

    impl Default for StubProvider {
        fn default() -> Self {
            Self {
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingProvider for StubProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(EmbeddingError::Unavailable {
                    reason: "stub offline".to_string(),
                });
            }
            let mut vector = vec![0.0f32; 8];
            for word in text.split_whitespace() {
                let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
                for byte in word.bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(0x100_0000_01b3);
                }
                vector[(hash % 8) as usize] += 1.0;
            }
            Ok(vector)
        }

        fn dimensions(&self) -> usize {
            8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubProvider;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn missing_provider_yields_none() {
        let state = EmbeddingState::disabled();
        assert!(!state.is_configured());
        assert!(!state.is_available());
        assert_eq!(state.embed("anything"), None);
    }

    #[test]
    fn failure_starts_cooldown() {
        let provider = Arc::new(StubProvider::default());
        let state = EmbeddingState::new(Some(provider.clone()), Duration::from_secs(300));

        assert!(state.embed("ok").is_some());

        provider.fail.store(true, Ordering::SeqCst);
        assert_eq!(state.embed("will fail"), None);
        assert!(!state.is_available());
        assert!(state.retry_in().is_some());

        // During cooldown the provider is not called again
        let calls_before = provider.calls.load(Ordering::SeqCst);
        assert_eq!(state.embed("still cooling"), None);
        assert_eq!(provider.calls.load(Ordering::SeqCst), calls_before);
    }

    #[test]
    fn stub_is_deterministic() {
        let provider = StubProvider::default();
        assert_eq!(
            provider.embed("function login").unwrap(),
            provider.embed("function login").unwrap()
        );
    }
}
