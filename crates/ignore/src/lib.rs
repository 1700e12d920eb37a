//! Hierarchical ignore-rule matching for tsdeps.
//!
//! Ignore files (`.gitignore` and friends) are attached to the directory that
//! declares them. A path is ignored when any ignore file in the path's own
//! directory, or in any ancestor directory up to the workspace root, has a
//! pattern matching the path relative to that directory.
//!
//! Supported pattern syntax is a deliberate subset of gitignore:
//!
//! - blank lines and lines starting with `#` are skipped
//! - `*` matches any run of characters except `/` (case-sensitive)
//! - `**` matches zero or more whole path segments
//! - a leading `/` anchors the pattern to the declaring directory, otherwise
//!   the pattern may match at any depth below it
//! - a trailing `/` is dropped, there is no directory-only distinction
//! - a pattern matching a directory also matches everything below it
//!
//! Negation (`!pattern`) is not supported and such lines are skipped.
//!
//! # Example
//!
//! ```
//! use tsdeps_ignore::IgnoreMatcher;
//!
//! let mut matcher = IgnoreMatcher::new();
//! matcher.add_ignore_file(".", "# build output\ndist\n*.log\n");
//! matcher.add_ignore_file("packages/app", "/generated\n");
//!
//! assert!(matcher.matches("dist/index.js"));
//! assert!(matcher.matches("packages/app/debug.log"));
//! assert!(matcher.matches("packages/app/generated/api.ts"));
//! assert!(!matcher.matches("packages/lib/generated/api.ts"));
//! ```

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading ignore files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The ignore file could not be read.
    #[error("Failed to read ignore file {}: {source}", path.display())]
    Io {
        /// Path of the ignore file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for ignore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The compiled patterns of one ignore file.
#[derive(Debug, Clone)]
struct IgnoreRules {
    patterns: Vec<String>,
    set: GlobSet,
}

impl IgnoreRules {
    fn matches(&self, rel: &str) -> bool {
        self.set.is_match(rel)
    }
}

/// Ignore rules for a whole workspace, keyed by the declaring directory.
///
/// Directories are workspace-relative with `/` separators; the workspace root
/// is `.` (an empty string is accepted as an alias).
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    rules: HashMap<String, Vec<IgnoreRules>>,
}

impl IgnoreMatcher {
    /// Creates a matcher with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no ignore file has contributed any pattern.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compiles the newline-separated patterns in `contents` and attaches them
    /// to `directory`.
    ///
    /// Lines that fail to compile are logged and skipped. Returns the number
    /// of patterns that were compiled.
    pub fn add_ignore_file(&mut self, directory: &str, contents: &str) -> usize {
        let directory = normalize(directory);

        let mut patterns = Vec::new();
        let mut builder = GlobSetBuilder::new();

        for line in contents.lines() {
            let Some(pattern) = pattern_from_line(line) else {
                continue;
            };

            match compile_pattern(&pattern, &mut builder) {
                Ok(()) => patterns.push(pattern),
                Err(e) => {
                    tracing::warn!(
                        directory = %directory,
                        pattern = %pattern,
                        error = %e,
                        "Skipping invalid ignore pattern"
                    );
                }
            }
        }

        if patterns.is_empty() {
            return 0;
        }

        let set = match builder.build() {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(directory = %directory, error = %e, "Failed to build ignore rules");
                return 0;
            }
        };

        let count = patterns.len();
        tracing::debug!(directory = %directory, patterns = count, "Added ignore rules");

        self.rules
            .entry(directory)
            .or_default()
            .push(IgnoreRules { patterns, set });

        count
    }

    /// Reads the ignore file at `file` and attaches its patterns to `directory`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn add_ignore_file_path(&mut self, directory: &str, file: &Path) -> Result<usize> {
        let contents = std::fs::read_to_string(file).map_err(|source| Error::Io {
            path: file.to_path_buf(),
            source,
        })?;

        Ok(self.add_ignore_file(directory, &contents))
    }

    /// Returns the patterns declared for `directory`, in declaration order.
    #[must_use]
    pub fn patterns(&self, directory: &str) -> Vec<&str> {
        self.rules
            .get(&normalize(directory))
            .map(|rules| {
                rules
                    .iter()
                    .flat_map(|r| r.patterns.iter().map(String::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `true` if `path` is excluded by any ignore file in its own
    /// directory or an ancestor directory.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize(path);
        if path == "." || self.rules.is_empty() {
            return false;
        }

        let (mut dir, base) = split_dir(&path);
        let mut rel = base.to_string();

        loop {
            if let Some(rules) = self.rules.get(dir)
                && rules.iter().any(|r| r.matches(&rel))
            {
                tracing::trace!(path = %path, directory = %dir, "Path is ignored");
                return true;
            }

            if dir == "." {
                return false;
            }

            let (parent, name) = split_dir(dir);
            rel = format!("{name}/{rel}");
            dir = parent;
        }
    }
}

/// Extracts the effective pattern from one ignore-file line.
fn pattern_from_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if line.starts_with('!') {
        tracing::debug!(pattern = %line, "Negated ignore patterns are not supported");
        return None;
    }

    let pattern = line.trim_end_matches('/');
    if pattern.is_empty() || pattern == "/" {
        return None;
    }

    Some(pattern.to_string())
}

/// Adds the globs matching `pattern` and everything below it to `builder`.
fn compile_pattern(pattern: &str, builder: &mut GlobSetBuilder) -> std::result::Result<(), globset::Error> {
    let base = if let Some(anchored) = pattern.strip_prefix('/') {
        anchored.to_string()
    } else if pattern.starts_with("**/") {
        pattern.to_string()
    } else {
        format!("**/{pattern}")
    };

    let exact = GlobBuilder::new(&base).literal_separator(true).build()?;
    let nested = GlobBuilder::new(&format!("{base}/**"))
        .literal_separator(true)
        .build()?;

    builder.add(exact);
    builder.add(nested);
    Ok(())
}

/// Lexically normalizes a workspace-relative path, returning `.` for the root.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Splits a normalized path into its directory (`.` at the root) and base name.
fn split_dir(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => (".", path),
    }
}
