//! Runtime environment shared with every command.
//!
//! Built once per [`Dispatcher`](crate::Dispatcher) and never mutated
//! afterwards; commands receive it through
//! [`CommandContext`](crate::CommandContext).

use std::path::{Path, PathBuf};

/// Directory (relative to the project root) holding user-local extensions
pub const LOCAL_EXTENSIONS_DIR: &str = ".trial/extensions";

/// Immutable execution context for commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    root: PathBuf,
    search_path: Vec<PathBuf>,
    full_traces: bool,
}

impl RuntimeEnv {
    /// Environment rooted at `root`
    ///
    /// The search path starts with the root itself followed by its local
    /// extensions directory, and failure reports keep every cause.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let search_path = vec![root.clone(), root.join(LOCAL_EXTENSIONS_DIR)];
        Self {
            root,
            search_path,
            full_traces: true,
        }
    }

    /// Append a directory to the search path; directories already present are skipped
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if !self.search_path.contains(&dir) {
            self.search_path.push(dir);
        }
        self
    }

    /// Keep only the outermost error message in failure reports
    pub fn with_short_traces(mut self) -> Self {
        self.full_traces = false;
        self
    }

    /// Project root relative paths are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories searched for extensions, in lookup order
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Whether failure reports include the full cause chain
    pub fn full_traces(&self) -> bool {
        self.full_traces
    }

    /// Resolve a path relative to the project root
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Find an extension file on the search path
    ///
    /// Absolute names are only checked for existence.
    pub fn find_extension(&self, name: &str) -> Option<PathBuf> {
        let name = Path::new(name);
        if name.is_absolute() {
            return name.is_file().then(|| name.to_path_buf());
        }

        self.search_path
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Render a command failure for the error channel
    pub fn describe_failure(&self, err: &anyhow::Error) -> String {
        if !self.full_traces {
            return err.to_string();
        }

        let mut report = err.to_string();
        for cause in err.chain().skip(1) {
            report.push_str("\n  caused by: ");
            report.push_str(&cause.to_string());
        }
        report
    }
}
