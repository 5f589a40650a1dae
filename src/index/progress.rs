//! Progress reporting for indexing operations

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Shared progress state for a full scan
///
/// Query handlers read this to report the "still indexing" condition with
/// processed/total counts instead of blocking or failing opaquely.
#[derive(Debug, Default)]
pub struct ScanProgress {
    active: AtomicBool,
    processed: AtomicUsize,
    total: AtomicUsize,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, total: usize) {
        self.processed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn tick(&self) -> usize {
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn finish(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// (processed, total) while a scan is in flight, None otherwise
    pub fn snapshot(&self) -> Option<(usize, usize)> {
        if self.is_active() {
            Some((
                self.processed.load(Ordering::SeqCst),
                self.total.load(Ordering::SeqCst),
            ))
        } else {
            None
        }
    }
}

/// Statistics collected during a scan
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Number of files successfully indexed
    pub files_indexed: usize,

    /// Number of files that failed to read or extract
    pub files_failed: usize,

    /// Total number of symbols found
    pub symbols_found: usize,

    /// Time elapsed during the scan
    pub elapsed: Duration,

    /// Errors encountered (limited to first N errors)
    pub errors: Vec<(PathBuf, String)>,

    start_time: Option<Instant>,
}

impl ScanStats {
    /// Create new stats and start timing
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Stop timing and record elapsed time
    pub fn stop_timing(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed = start.elapsed();
            self.start_time = None;
        }
    }

    /// Add an error (limited to first 100 errors)
    pub fn add_error(&mut self, path: PathBuf, error: String) {
        if self.errors.len() < 100 {
            self.errors.push((path, error));
        }
        self.files_failed += 1;
    }

    /// Display the statistics in a human-readable format
    pub fn display(&self) {
        println!("\nScan complete:");
        println!("  Files indexed: {}", self.files_indexed);
        println!("  Files failed: {}", self.files_failed);
        println!("  Symbols found: {}", self.symbols_found);
        println!("  Time elapsed: {:.2}s", self.elapsed.as_secs_f64());

        if !self.errors.is_empty() {
            println!("\nErrors (showing first {}):", self.errors.len().min(5));
            for (path, error) in &self.errors[..5.min(self.errors.len())] {
                println!("  {}: {}", path.display(), error);
            }
            if self.errors.len() > 5 {
                println!("  ... and {} more errors", self.errors.len() - 5);
            }
        }
    }
}
