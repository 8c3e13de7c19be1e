use crate::error::{LoadError, ScriptError};
use std::fmt;
use std::path::{Path, PathBuf};

use super::interpreter::evaluate_file;
use super::registry::Registry;

/// File extensions recognised as tool scripts.
pub const TOOL_EXTENSIONS: &[&str] = &["yaml", "yml"];

#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: ScriptError,
}

#[derive(Debug, Default)]
pub struct LoadSummary {
    pub tools_loaded: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub failures: Vec<LoadFailure>,
}

impl LoadSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loaded {} tools from {} files ({} failed)",
            self.tools_loaded, self.files_processed, self.files_failed
        )
    }
}

/// Discovers tool scripts under a root directory and rebuilds a registry
/// from them.
#[derive(Debug, Clone)]
pub struct ToolLoader {
    root: PathBuf,
}

impl ToolLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every script under the root, recursively, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>, LoadError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let root = self
            .root
            .to_str()
            .ok_or_else(|| LoadError::NonUtf8Root(self.root.clone()))?;
        let escaped = glob::Pattern::escape(root);

        let mut files = Vec::new();
        for ext in TOOL_EXTENSIONS {
            let pattern = format!("{}/**/*.{}", escaped.trim_end_matches('/'), ext);
            for entry in glob::glob(&pattern)? {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable path");
                    }
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Build a fresh generation from disk and swap it into `registry`.
    ///
    /// Files are evaluated into a staging registry with the same duplicate
    /// policy. A file that fails for any reason is logged and skipped; the
    /// rest still load. The live registry is replaced in one step at the end,
    /// so concurrent readers see either the old or the new catalog.
    pub fn load(&self, registry: &Registry) -> Result<LoadSummary, LoadError> {
        let files = self.discover()?;
        let staging = Registry::new(registry.policy());
        let mut summary = LoadSummary {
            files_processed: files.len(),
            ..LoadSummary::default()
        };

        if !self.root.is_dir() {
            tracing::warn!(root = %self.root.display(), "Tools directory does not exist");
        } else if files.is_empty() {
            tracing::warn!(root = %self.root.display(), "No tool scripts found");
        }

        for path in files {
            match evaluate_file(&staging, &path) {
                Ok(count) => {
                    tracing::debug!(path = %path.display(), tools = count, "Loaded tool script");
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %error, "Failed to load tool script");
                    summary.files_failed += 1;
                    summary.failures.push(LoadFailure { path, error });
                }
            }
        }

        let catalog = staging.all();
        summary.tools_loaded = catalog.len();
        registry.replace(catalog);

        tracing::info!(
            root = %self.root.display(),
            tools = summary.tools_loaded,
            files = summary.files_processed,
            failed = summary.files_failed,
            "Tool load complete"
        );
        Ok(summary)
    }

    /// Full rebuild: nothing from the previous generation survives.
    pub fn reload(&self, registry: &Registry) -> Result<LoadSummary, LoadError> {
        tracing::info!(root = %self.root.display(), "Reloading tools");
        self.load(registry)
    }
}
