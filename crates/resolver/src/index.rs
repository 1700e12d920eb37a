//! Index phase: one walk over the workspace collecting everything the
//! resolve phase reads.
//!
//! The tree is walked once, sequentially, to decide which directories and
//! files take part (ignore files apply to everything below their directory,
//! so they must be loaded in walk order). Each surviving directory is then
//! visited on the rayon pool, producing a [`DirectoryFindings`] value. The
//! findings are merged into the [`WorkspaceIndex`] by a single writer, in
//! walk order, so lockfiles nearer the root always register first.

use crate::config::{ImportRules, ResolverConfig};
use crate::diagnostic::Diagnostic;
use crate::error::Result;
use crate::label::Label;
use crate::paths::{base_name, dir_of, join, relative_to};
use crate::source::{FileKind, ImportStatement, SourceParser, classify_file};
use crate::tsconfig::{TsConfig, TsConfigIndex};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tsdeps_ignore::IgnoreMatcher;
use tsdeps_workspaces::{
    LockfileParser, Manifest, PnpmLockfileParser, PnpmProjectIndex, ProjectDependencies,
    read_manifest,
};
use walkdir::WalkDir;

/// A workspace file that takes part in analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    /// Workspace-relative path.
    pub path: String,
    /// Label of the target that owns the file.
    pub label: Label,
    /// How the file is analyzed.
    pub kind: FileKind,
    /// Imports extracted by the source parser, empty for data files.
    pub imports: Vec<ImportStatement>,
}

/// Everything learned about one directory.
#[derive(Debug, Default)]
pub struct DirectoryFindings {
    /// Workspace-relative directory.
    pub dir: String,
    /// Parsed lockfile, with the path it was read from.
    pub lockfile: Option<(PathBuf, ProjectDependencies)>,
    /// Parsed manifest.
    pub manifest: Option<Manifest>,
    /// Loaded tsconfig.
    pub tsconfig: Option<TsConfig>,
    /// Indexed files, sorted by name.
    pub files: Vec<IndexedFile>,
    /// Ambient module names with the label declaring them.
    pub modules: Vec<(String, Label)>,
    /// Inputs in this directory that could not be used.
    pub diagnostics: Vec<Diagnostic>,
}

/// A directory selected by the walk, with the file names to visit.
#[derive(Debug)]
struct DirectoryPlan {
    dir: String,
    files: Vec<String>,
}

/// The workspace-wide index, read-only once built.
#[derive(Debug)]
pub struct WorkspaceIndex {
    root: PathBuf,
    files: BTreeMap<String, IndexedFile>,
    module_types: BTreeMap<String, Vec<Label>>,
    projects: PnpmProjectIndex,
    tsconfigs: TsConfigIndex,
    manifests: BTreeMap<String, Manifest>,
    diagnostics: Vec<Diagnostic>,
}

impl WorkspaceIndex {
    /// Walks the workspace at `root` and indexes every directory.
    ///
    /// Unreadable or invalid inputs never fail the build; they are recorded
    /// as diagnostics and left out of the index.
    #[must_use]
    pub fn build(
        root: &Path,
        config: &ResolverConfig,
        rules: &ImportRules,
        parser: &dyn SourceParser,
    ) -> Self {
        tracing::info!(root = %root.display(), "Indexing workspace");

        let (plans, walk_diagnostics) = plan_directories(root, config);

        let findings: Vec<DirectoryFindings> = plans
            .par_iter()
            .map(|plan| visit_directory(root, config, rules, parser, plan))
            .collect();

        let mut index = Self {
            root: root.to_path_buf(),
            files: BTreeMap::new(),
            module_types: BTreeMap::new(),
            projects: PnpmProjectIndex::new(),
            tsconfigs: TsConfigIndex::new(),
            manifests: BTreeMap::new(),
            diagnostics: walk_diagnostics,
        };
        for directory in findings {
            index.merge(directory, config);
        }

        tracing::info!(
            directories = plans.len(),
            files = index.files.len(),
            projects = index.projects.len(),
            tsconfigs = index.tsconfigs.len(),
            diagnostics = index.diagnostics.len(),
            "Indexed workspace"
        );
        index
    }

    /// Publishes one directory's findings.
    pub fn merge(&mut self, findings: DirectoryFindings, config: &ResolverConfig) {
        let DirectoryFindings {
            dir,
            lockfile,
            manifest,
            tsconfig,
            files,
            modules,
            diagnostics,
        } = findings;

        self.diagnostics.extend(diagnostics);

        if let Some((path, importers)) = lockfile {
            if let Err(e) = self.projects.add_lockfile(&dir, &path, importers) {
                tracing::warn!(lockfile = %path.display(), error = %e, "Skipping lockfile");
                self.diagnostics.push(Diagnostic::invalid_input(
                    join(&dir, &config.pnpm_lockfile),
                    e.to_string(),
                ));
            }
        }
        if let Some(manifest) = manifest {
            self.manifests.insert(dir.clone(), manifest);
        }
        if let Some(tsconfig) = tsconfig {
            self.tsconfigs.insert(tsconfig);
        }
        for file in files {
            self.files.insert(file.path.clone(), file);
        }
        for (module, label) in modules {
            let labels = self.module_types.entry(module).or_default();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
    }

    /// The workspace root on disk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every indexed file, keyed by workspace-relative path.
    #[must_use]
    pub const fn files(&self) -> &BTreeMap<String, IndexedFile> {
        &self.files
    }

    /// The indexed file at `path`.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&IndexedFile> {
        self.files.get(path)
    }

    /// Label owning the file at `path`.
    #[must_use]
    pub fn label_of(&self, path: &str) -> Option<&Label> {
        self.files.get(path).map(|file| &file.label)
    }

    /// Labels declaring or extending the ambient module `name`.
    #[must_use]
    pub fn module_types(&self, name: &str) -> &[Label] {
        self.module_types.get(name).map_or(&[], Vec::as_slice)
    }

    /// The pnpm projects found in lockfiles.
    #[must_use]
    pub const fn projects(&self) -> &PnpmProjectIndex {
        &self.projects
    }

    /// The tsconfig files found.
    #[must_use]
    pub const fn tsconfigs(&self) -> &TsConfigIndex {
        &self.tsconfigs
    }

    /// The manifest in `dir`.
    #[must_use]
    pub fn manifest(&self, dir: &str) -> Option<&Manifest> {
        self.manifests.get(dir)
    }

    /// Inputs that could not be used.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Walks the tree, applying ignore files and excluded directory names.
fn plan_directories(root: &Path, config: &ResolverConfig) -> (Vec<DirectoryPlan>, Vec<Diagnostic>) {
    let mut ignore = IgnoreMatcher::new();
    let mut ignore_failures = Vec::new();
    let mut diagnostics = Vec::new();
    let mut plans: Vec<DirectoryPlan> = Vec::new();
    let mut plan_of: HashMap<String, usize> = HashMap::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let Some(rel) = relative_to(root, entry.path()) else {
                return false;
            };
            if entry.depth() > 0 {
                let is_dir = entry.file_type().is_dir();
                if is_dir && config.exclude_dirs.iter().any(|d| d == base_name(&rel)) {
                    return false;
                }
                if ignore.matches(&rel) {
                    tracing::trace!(path = %rel, "Ignored");
                    return false;
                }
                if !is_dir {
                    return true;
                }
            }

            for name in &config.ignore_files {
                let file = entry.path().join(name);
                if !file.is_file() {
                    continue;
                }
                match ignore.add_ignore_file_path(&rel, &file) {
                    Ok(count) => {
                        tracing::debug!(dir = %rel, file = %name, patterns = count, "Loaded ignore file");
                    }
                    Err(e) => {
                        tracing::warn!(dir = %rel, file = %name, error = %e, "Skipping ignore file");
                        ignore_failures.push(Diagnostic::invalid_input(join(&rel, name), e.to_string()));
                    }
                }
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .and_then(|p| relative_to(root, p))
                    .unwrap_or_default();
                tracing::warn!(path = %path, error = %e, "Skipping unreadable path");
                diagnostics.push(Diagnostic::invalid_input(path, e.to_string()));
                continue;
            }
        };
        let Some(rel) = relative_to(root, entry.path()) else {
            continue;
        };

        if entry.file_type().is_dir() {
            plan_of.insert(rel.clone(), plans.len());
            plans.push(DirectoryPlan {
                dir: rel,
                files: Vec::new(),
            });
        } else if let Some(&idx) = plan_of.get(dir_of(&rel)) {
            plans[idx].files.push(base_name(&rel).to_string());
        }
    }

    diagnostics.extend(ignore_failures);
    (plans, diagnostics)
}

/// Reads everything in one directory. Runs on the worker pool.
fn visit_directory(
    root: &Path,
    config: &ResolverConfig,
    rules: &ImportRules,
    parser: &dyn SourceParser,
    plan: &DirectoryPlan,
) -> DirectoryFindings {
    let dir = plan.dir.as_str();
    let mut findings = DirectoryFindings {
        dir: dir.to_string(),
        ..DirectoryFindings::default()
    };
    let has = |name: &str| plan.files.iter().any(|f| f == name);

    if has(&config.pnpm_lockfile) {
        let path = root.join(dir).join(&config.pnpm_lockfile);
        match PnpmLockfileParser.parse(&path) {
            Ok(importers) => {
                tracing::debug!(dir, importers = importers.len(), "Parsed pnpm lockfile");
                findings.lockfile = Some((path, importers));
            }
            Err(e) => {
                tracing::warn!(lockfile = %path.display(), error = %e, "Failed to parse lockfile");
                findings.diagnostics.push(Diagnostic::invalid_input(
                    join(dir, &config.pnpm_lockfile),
                    e.to_string(),
                ));
            }
        }
    }

    if has(&config.manifest_file) {
        let path = root.join(dir).join(&config.manifest_file);
        match read_manifest(&path) {
            Ok(manifest) => findings.manifest = Some(manifest),
            Err(e) => {
                tracing::warn!(manifest = %path.display(), error = %e, "Failed to read manifest");
                findings.diagnostics.push(Diagnostic::invalid_input(
                    join(dir, &config.manifest_file),
                    e.to_string(),
                ));
            }
        }
    }

    if has(&config.tsconfig_file) {
        match TsConfig::load(root, dir, &config.tsconfig_file) {
            Ok(tsconfig) => findings.tsconfig = Some(tsconfig),
            Err(e) => {
                tracing::warn!(dir, error = %e, "Failed to load tsconfig");
                findings.diagnostics.push(Diagnostic::invalid_input(
                    join(dir, &config.tsconfig_file),
                    e.to_string(),
                ));
            }
        }
    }

    for name in &plan.files {
        let Some(kind) = classify_file(name) else {
            continue;
        };
        let path = join(dir, name);
        let target = if rules.is_test_file(name) {
            config.tests_target(dir)
        } else {
            config.library_target(dir)
        };
        let label = Label::new(dir, target);

        let mut imports = Vec::new();
        if kind.is_parsed() {
            match parse_source(root, &path, parser) {
                Ok(parsed) => {
                    imports = parsed.imports;
                    findings
                        .modules
                        .extend(parsed.modules.into_iter().map(|m| (m, label.clone())));
                }
                Err(e) => {
                    tracing::warn!(file = %path, error = %e, "Indexing file without imports");
                    findings
                        .diagnostics
                        .push(Diagnostic::invalid_input(path.clone(), e.to_string()));
                }
            }
        }

        findings.files.push(IndexedFile {
            path,
            label,
            kind,
            imports,
        });
    }

    tracing::debug!(
        dir,
        files = findings.files.len(),
        modules = findings.modules.len(),
        "Visited directory"
    );
    findings
}

fn parse_source(
    root: &Path,
    path: &str,
    parser: &dyn SourceParser,
) -> Result<crate::source::ParsedSource> {
    let full = root.join(path);
    let source = fs::read_to_string(&full)
        .map_err(|e| crate::Error::io(e, &full, "reading source file"))?;
    parser.parse(path, &source)
}
