//! Resolver configuration.
//!
//! Loaded from `tsdeps.toml` at the workspace root. Every field has a default,
//! so an absent file or an empty table yields a working configuration.
//!
//! ```toml
//! pnpmLockfile = "pnpm-lock.yaml"
//! excludeDirs = ["node_modules", ".git", "dist"]
//! libraryNaming = "{dirname}_lib"
//! ignoreImports = ["virtual:*"]
//!
//! [resolve]
//! "@generated/*" = "//gen:ts"
//! ```

use crate::error::{Error, Result};
use crate::label::Label;
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = "tsdeps.toml";

/// Placeholder replaced with a directory's base name in target naming.
pub const DIRNAME_PLACEHOLDER: &str = "{dirname}";

/// Configuration for indexing and resolving a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Lockfile file name looked for in every directory.
    pub pnpm_lockfile: String,

    /// TypeScript configuration file name.
    pub tsconfig_file: String,

    /// Package manifest file name.
    pub manifest_file: String,

    /// Ignore-rule file names read in every directory.
    pub ignore_files: Vec<String>,

    /// Directory names never descended into.
    pub exclude_dirs: Vec<String>,

    /// Name prefix of external package targets (`//project:node_modules/pkg`).
    pub npm_link_all_target_name: String,

    /// Target name for a directory's library sources.
    pub library_naming: String,

    /// Target name for a directory's test sources.
    pub tests_naming: String,

    /// Substitute for `{dirname}` at the workspace root.
    pub root_target_name: String,

    /// File-name globs routing a file into the tests target.
    pub test_file_patterns: Vec<String>,

    /// Specifier globs that are never resolved and never reported.
    pub ignore_imports: Vec<String>,

    /// Specifier glob to label overrides, consulted before any other resolution.
    pub resolve: BTreeMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pnpm_lockfile: "pnpm-lock.yaml".to_string(),
            tsconfig_file: "tsconfig.json".to_string(),
            manifest_file: "package.json".to_string(),
            ignore_files: vec![".gitignore".to_string()],
            exclude_dirs: vec!["node_modules".to_string(), ".git".to_string()],
            npm_link_all_target_name: "node_modules".to_string(),
            library_naming: DIRNAME_PLACEHOLDER.to_string(),
            tests_naming: format!("{DIRNAME_PLACEHOLDER}_tests"),
            root_target_name: "root".to_string(),
            test_file_patterns: vec!["*.spec.*".to_string(), "*.test.*".to_string()],
            ignore_imports: Vec::new(),
            resolve: BTreeMap::new(),
        }
    }
}

impl ResolverConfig {
    /// Parses a configuration from TOML and validates its globs and labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or any glob or label fails to
    /// compile.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.compile()?;
        Ok(config)
    }

    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|source| Error::io(source, path, "reading resolver configuration"))?;

        Self::from_toml_str(&contents).map_err(|e| match e {
            Error::Toml { source, .. } => Error::Toml {
                source,
                path: Some(path.to_path_buf()),
            },
            other => other,
        })
    }

    /// Loads `tsdeps.toml` from the workspace root, or returns the defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is invalid.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Loading resolver configuration");
            Self::load(&path)
        } else {
            tracing::debug!(root = %root.display(), "No resolver configuration, using defaults");
            Ok(Self::default())
        }
    }

    /// Compiles the glob and label fields into [`ImportRules`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGlob`] or [`Error::InvalidLabel`].
    pub fn compile(&self) -> Result<ImportRules> {
        let ignore_imports = build_set("ignoreImports", &self.ignore_imports)?;
        let test_files = build_set("testFilePatterns", &self.test_file_patterns)?;

        let mut exact = BTreeMap::new();
        let mut patterns = Vec::new();
        for (pattern, label) in &self.resolve {
            let label = Label::parse(label)?;
            if is_glob(pattern) {
                patterns.push((compile_glob("resolve", pattern)?.compile_matcher(), label));
            } else {
                exact.insert(pattern.clone(), label);
            }
        }

        Ok(ImportRules {
            ignore_imports,
            test_files,
            exact_overrides: exact,
            pattern_overrides: patterns,
        })
    }

    /// Target name for library sources in `dir` (workspace-relative, `""` for the root).
    #[must_use]
    pub fn library_target(&self, dir: &str) -> String {
        self.render_target(&self.library_naming, dir)
    }

    /// Target name for test sources in `dir`.
    #[must_use]
    pub fn tests_target(&self, dir: &str) -> String {
        self.render_target(&self.tests_naming, dir)
    }

    /// Label of an external package as linked into `project`.
    #[must_use]
    pub fn package_label(&self, project: &str, package: &str) -> Label {
        Label::new(
            project,
            format!("{}/{package}", self.npm_link_all_target_name),
        )
    }

    fn render_target(&self, naming: &str, dir: &str) -> String {
        let dirname = match dir.rsplit('/').next() {
            Some(name) if !name.is_empty() && name != "." => name,
            _ => self.root_target_name.as_str(),
        };
        naming.replace(DIRNAME_PLACEHOLDER, dirname)
    }
}

/// Compiled import rules derived from a [`ResolverConfig`].
#[derive(Debug, Clone)]
pub struct ImportRules {
    ignore_imports: GlobSet,
    test_files: GlobSet,
    exact_overrides: BTreeMap<String, Label>,
    pattern_overrides: Vec<(GlobMatcher, Label)>,
}

impl ImportRules {
    /// Returns `true` if `specifier` is listed in `ignoreImports`.
    #[must_use]
    pub fn is_ignored(&self, specifier: &str) -> bool {
        self.ignore_imports.is_match(specifier)
    }

    /// Returns the label `specifier` is overridden to, preferring a literal
    /// key over glob keys, and glob keys in sorted order.
    #[must_use]
    pub fn override_for(&self, specifier: &str) -> Option<&Label> {
        self.exact_overrides.get(specifier).or_else(|| {
            self.pattern_overrides
                .iter()
                .find(|(matcher, _)| matcher.is_match(specifier))
                .map(|(_, label)| label)
        })
    }

    /// Returns `true` if the file name matches a test file pattern.
    #[must_use]
    pub fn is_test_file(&self, file_name: &str) -> bool {
        self.test_files.is_match(file_name)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn compile_glob(field: &str, pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| Error::InvalidGlob {
            field: field.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

fn build_set(field: &str, patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(field, pattern)?);
    }
    builder.build().map_err(|source| Error::InvalidGlob {
        field: field.to_string(),
        pattern: patterns.join(", "),
        source,
    })
}
