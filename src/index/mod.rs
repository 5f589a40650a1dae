//! Index construction: walking, extraction, incremental updates, watching

pub mod model;
pub mod progress;
pub mod scanner;
pub mod walker;
pub mod watcher;

pub use model::{CodeIndex, IndexMetadata, SCHEMA_VERSION};
pub use progress::{ScanProgress, ScanStats};
pub use scanner::{FileUpdate, Scanner};
pub use walker::{FileWalker, IgnoreRules, STANDARD_EXCLUDES};
pub use watcher::{DebounceBatcher, FileWatcher};
