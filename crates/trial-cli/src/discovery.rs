//! Spec file discovery - resolve `run` arguments to a list of test files

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How spec arguments are expanded into files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    extensions: Vec<String>,
    recursive: bool,
    ignore: Vec<PathBuf>,
    sort: bool,
}

/// Result of resolving spec arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecFiles {
    /// Files to test, in resolution order (or sorted)
    pub files: Vec<PathBuf>,
    /// Spec arguments that produced no file
    pub unmatched: Vec<String>,
}

impl SpecFiles {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

impl Discovery {
    /// Discover files with any of `extensions` (leading dots are ignored)
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect(),
            recursive: false,
            ignore: Vec::new(),
            sort: false,
        }
    }

    /// Descend into subdirectories of directory specs
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Leave out these files, or everything below these directories
    pub fn ignore(mut self, paths: Vec<PathBuf>) -> Self {
        self.ignore = paths;
        self
    }

    /// Sort the final file list
    pub fn sorted(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Resolve spec arguments relative to `root`
    ///
    /// Files named explicitly are taken as-is whatever their extension;
    /// directories contribute the files matching the configured extensions.
    pub fn collect<S: AsRef<str>>(&self, root: &Path, specs: &[S]) -> SpecFiles {
        let ignored: Vec<PathBuf> = self.ignore.iter().map(|p| root.join(p)).collect();
        let mut seen = HashSet::new();
        let mut result = SpecFiles::default();

        for spec in specs {
            let spec = spec.as_ref();
            let path = root.join(spec);

            let found = if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                self.walk(&path)
            } else {
                Vec::new()
            };

            if found.is_empty() {
                result.unmatched.push(spec.to_string());
                continue;
            }

            for file in found {
                if ignored.iter().any(|skip| file.starts_with(skip)) {
                    continue;
                }
                if seen.insert(file.clone()) {
                    result.files.push(file);
                }
            }
        }

        if self.sort {
            result.files.sort();
        }

        result
    }

    fn walk(&self, dir: &Path) -> Vec<PathBuf> {
        let depth = if self.recursive { usize::MAX } else { 1 };

        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(depth)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.matches_extension(path))
            .collect()
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext))
    }
}
