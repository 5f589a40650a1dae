//! File system walker and the shared ignore-rule set
//!
//! The same `IgnoreRules` govern the scanner's tree walk and the watcher's
//! event filtering, so a path can never be indexed by one and ignored by
//! the other.

use ignore::WalkBuilder;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::extract::ExtractorRegistry;

/// Directories excluded regardless of gitignore contents
pub const STANDARD_EXCLUDES: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    "coverage",
    "__pycache__",
];

/// Combined ignore set: standard excludes, .gitignore contents (root and
/// nested), .codescoutignore, and configured extra patterns
#[derive(Debug)]
pub struct IgnoreRules {
    root: PathBuf,
    matcher: Gitignore,
    /// Per-directory ignore files below the root, each anchored at its own
    /// directory. The incremental path consults these so it agrees with the
    /// full scan's walk.
    nested: Vec<Gitignore>,
}

impl IgnoreRules {
    pub fn build(root: &Path, settings: &Settings) -> IndexResult<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for dir in STANDARD_EXCLUDES {
            builder
                .add_line(None, &format!("{dir}/"))
                .map_err(|e| IndexError::ConfigError {
                    reason: format!("bad standard exclude pattern: {e}"),
                })?;
        }
        // add() returns None when the file simply does not exist
        if let Some(err) = builder.add(root.join(".gitignore")) {
            warn!("Skipping unreadable .gitignore: {err}");
        }
        if let Some(err) = builder.add(root.join(".codescoutignore")) {
            warn!("Skipping unreadable .codescoutignore: {err}");
        }
        for pattern in &settings.indexing.ignore_patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| IndexError::ConfigError {
                    reason: format!("bad ignore pattern '{pattern}': {e}"),
                })?;
        }
        let matcher = builder.build().map_err(|e| IndexError::ConfigError {
            reason: format!("failed to build ignore matcher: {e}"),
        })?;

        let mut nested = Vec::new();
        collect_nested_ignores(root, root, &mut nested);
        Ok(Self {
            root: root.to_path_buf(),
            matcher,
            nested,
        })
    }

    /// Whether a path (absolute or root-relative) is excluded from indexing
    /// and from watch events
    pub fn is_ignored(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);

        // Hidden files and directories are never indexed
        let hidden = relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|s| s.starts_with('.') && s != "." && s != "..")
        });
        if hidden {
            return true;
        }

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let is_dir = absolute.is_dir();
        if self
            .matcher
            .matched_path_or_any_parents(&absolute, is_dir)
            .is_ignore()
        {
            return true;
        }
        self.nested.iter().any(|matcher| {
            absolute.starts_with(matcher.path())
                && matcher
                    .matched_path_or_any_parents(&absolute, is_dir)
                    .is_ignore()
        })
    }
}

/// Walk subdirectories collecting per-directory ignore files, skipping
/// hidden directories and the standard excludes
fn collect_nested_ignores(root: &Path, dir: &Path, nested: &mut Vec<Gitignore>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if path.is_dir() {
            if name.starts_with('.') || STANDARD_EXCLUDES.contains(&name) {
                continue;
            }
            collect_nested_ignores(root, &path, nested);
        } else if dir != root && (name == ".gitignore" || name == ".codescoutignore") {
            let (matcher, err) = Gitignore::new(&path);
            if let Some(err) = err {
                warn!("Skipping unreadable {}: {err}", path.display());
                continue;
            }
            debug!("Loaded nested ignore file {}", path.display());
            nested.push(matcher);
        }
    }
}

/// Walks directories to find source files to index
#[derive(Debug)]
pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walk a directory tree and return root-relative paths of indexable
    /// files, sorted for deterministic downstream merging.
    ///
    /// Traversal errors (typically permission denied) are logged per entry
    /// and skipped, never raised.
    pub fn walk(
        &self,
        root: &Path,
        rules: &IgnoreRules,
        registry: &ExtractorRegistry,
    ) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false);
        builder.add_custom_ignore_filename(".codescoutignore");

        let max_size = self.settings.indexing.max_file_size;
        let mut files: Vec<PathBuf> = builder
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable entry: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(|entry| {
                let path = entry.path();
                if rules.is_ignored(path) {
                    return None;
                }
                if !registry.is_indexable(path) {
                    return None;
                }
                if let Ok(meta) = entry.metadata() {
                    if meta.len() > max_size {
                        debug!("Skipping oversized file: {}", path.display());
                        return None;
                    }
                }
                path.strip_prefix(root)
                    .map(Path::to_path_buf)
                    .ok()
                    .or_else(|| Some(path.to_path_buf()))
            })
            .collect();

        files.sort();
        files
    }
}
