//! Resolve phase: maps every import of every indexed file to a label.
//!
//! Runs strictly after [`WorkspaceIndex::build`] has returned. Files are
//! resolved independently on the rayon pool against the shared, read-only
//! index.

use crate::config::{ImportRules, ResolverConfig};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::index::{IndexedFile, WorkspaceIndex};
use crate::label::Label;
use crate::node::{NODE_TYPES_PACKAGE, is_node_builtin};
use crate::paths::{dir_of, join};
use crate::source::{FileKind, INDEX_FILE_NAME, ImportStatement, RESOLUTION_EXTENSIONS, typescript_sources_for};
use petgraph::graph::DiGraph;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tsdeps_workspaces::{is_local_specifier, parse_import_path, to_at_types_package};

/// Whether a dependency is needed at runtime or only for type checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    /// Needed at runtime.
    Value,
    /// Needed only by the type checker.
    TypeOnly,
}

/// One dependency edge target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    /// The label depended on.
    pub label: Label,
    /// How it is depended on.
    pub kind: DependencyKind,
}

/// The resolved dependencies of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFile {
    /// Workspace-relative path.
    pub path: String,
    /// Label owning the file.
    pub label: Label,
    /// Dependencies sorted by label, without the file's own label.
    pub dependencies: Vec<Dependency>,
}

/// Result of analyzing a workspace.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Every source and declaration file, keyed by workspace-relative path.
    pub files: BTreeMap<String, ResolvedFile>,
    /// Non-fatal problems from both phases.
    pub diagnostics: Vec<Diagnostic>,
    /// tsconfig project references between directories.
    pub project_references: DiGraph<String, ()>,
}

impl Analysis {
    /// Dependency edges keyed by source label, merging all files of a target.
    #[must_use]
    pub fn edges(&self) -> BTreeMap<Label, Vec<Dependency>> {
        let mut merged: BTreeMap<Label, DependencySet> = BTreeMap::new();
        for file in self.files.values() {
            let set = merged.entry(file.label.clone()).or_default();
            for dep in &file.dependencies {
                set.insert(dep.label.clone(), dep.kind);
            }
        }
        merged
            .into_iter()
            .map(|(label, set)| (label, set.into_dependencies()))
            .collect()
    }

    /// Dependencies of the file at the workspace-relative `path`.
    #[must_use]
    pub fn dependencies_of(&self, path: &str) -> Option<&[Dependency]> {
        self.files.get(path).map(|f| f.dependencies.as_slice())
    }

    /// Diagnostics of one kind.
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

/// Deduplicated dependencies where a value edge wins over a type-only one.
#[derive(Debug, Default)]
struct DependencySet {
    deps: BTreeMap<Label, DependencyKind>,
}

impl DependencySet {
    fn insert(&mut self, label: Label, kind: DependencyKind) {
        self.deps
            .entry(label)
            .and_modify(|existing| *existing = (*existing).min(kind))
            .or_insert(kind);
    }

    fn into_dependencies(self) -> Vec<Dependency> {
        self.deps
            .into_iter()
            .map(|(label, kind)| Dependency { label, kind })
            .collect()
    }
}

/// Resolves imports against a built [`WorkspaceIndex`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    index: &'a WorkspaceIndex,
    config: &'a ResolverConfig,
    rules: &'a ImportRules,
}

/// Per-file resolution state.
struct FileResolution<'f> {
    file: &'f IndexedFile,
    deps: DependencySet,
    diagnostics: Vec<Diagnostic>,
}

impl FileResolution<'_> {
    fn add(&mut self, label: Label, kind: DependencyKind) {
        if label != self.file.label {
            self.deps.insert(label, kind);
        }
    }

    fn report(&mut self, kind: DiagnosticKind, import: &ImportStatement, message: impl Into<String>) {
        let diagnostic =
            Diagnostic::import(kind, &self.file.path, &import.specifier, import.span, message);
        tracing::warn!(%diagnostic, "Import not resolved");
        self.diagnostics.push(diagnostic);
    }
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over a fully built index.
    #[must_use]
    pub const fn new(
        index: &'a WorkspaceIndex,
        config: &'a ResolverConfig,
        rules: &'a ImportRules,
    ) -> Self {
        Self {
            index,
            config,
            rules,
        }
    }

    /// Resolves every source and declaration file in the index.
    #[must_use]
    pub fn resolve_all(&self) -> Analysis {
        tracing::info!(files = self.index.files().len(), "Resolving imports");

        let resolved: Vec<(ResolvedFile, Vec<Diagnostic>)> = self
            .index
            .files()
            .values()
            .filter(|file| file.kind != FileKind::Data)
            .collect::<Vec<_>>()
            .par_iter()
            .map(|file| self.resolve_file(file))
            .collect();

        let mut diagnostics = self.index.diagnostics().to_vec();
        let mut files = BTreeMap::new();
        for (file, file_diagnostics) in resolved {
            diagnostics.extend(file_diagnostics);
            files.insert(file.path.clone(), file);
        }

        let analysis = Analysis {
            files,
            diagnostics,
            project_references: self.index.tsconfigs().reference_graph(),
        };
        tracing::info!(
            files = analysis.files.len(),
            diagnostics = analysis.diagnostics.len(),
            "Resolved imports"
        );
        analysis
    }

    /// Resolves the imports of one indexed file.
    #[must_use]
    pub fn resolve_file(&self, file: &IndexedFile) -> (ResolvedFile, Vec<Diagnostic>) {
        let mut state = FileResolution {
            file,
            deps: DependencySet::default(),
            diagnostics: Vec::new(),
        };

        for import in &file.imports {
            self.resolve_import(&mut state, import);
        }

        if let Some(tsconfig) = self.index.tsconfigs().config_for(&file.path) {
            for name in &tsconfig.types {
                let package = to_at_types_package(name);
                if let Some(label) = self.declared_package(&file.path, &package) {
                    state.add(label, DependencyKind::TypeOnly);
                }
            }
        }

        let FileResolution {
            deps, diagnostics, ..
        } = state;
        let resolved = ResolvedFile {
            path: file.path.clone(),
            label: file.label.clone(),
            dependencies: deps.into_dependencies(),
        };
        (resolved, diagnostics)
    }

    fn resolve_import(&self, state: &mut FileResolution<'_>, import: &ImportStatement) {
        let specifier = import.specifier.as_str();
        let path = state.file.path.as_str();
        let kind = if import.type_only {
            DependencyKind::TypeOnly
        } else {
            DependencyKind::Value
        };

        if self.rules.is_ignored(specifier) {
            tracing::trace!(file = path, specifier, "Ignored import");
            return;
        }

        if let Some(label) = self.rules.override_for(specifier) {
            tracing::trace!(file = path, specifier, %label, "Resolved by override");
            state.add(label.clone(), kind);
            return;
        }

        if is_local_specifier(specifier) {
            if let Some(label) = self.resolve_local(path, specifier) {
                tracing::trace!(file = path, specifier, %label, "Resolved local import");
                state.add(label, kind);
            } else {
                state.report(
                    DiagnosticKind::UnresolvedLocal,
                    import,
                    "no workspace file matches this import",
                );
            }
            return;
        }

        if let Some(label) = self.resolve_mapped(path, specifier) {
            tracing::trace!(file = path, specifier, %label, "Resolved through tsconfig");
            state.add(label, kind);
            return;
        }

        let (package, _subpath) = parse_import_path(specifier);

        if specifier.starts_with("node:")
            || (is_node_builtin(specifier) && self.index.projects().lookup_package(path, package).is_none())
        {
            if let Some(label) = self.declared_package(path, NODE_TYPES_PACKAGE) {
                state.add(label, DependencyKind::TypeOnly);
            }
            tracing::trace!(file = path, specifier, "Node built-in");
            return;
        }

        let types_package = to_at_types_package(package);
        let types = (!package.is_empty() && types_package != package)
            .then(|| self.declared_package(path, &types_package))
            .flatten();
        let ambient = self.ambient_modules(specifier, package);

        if let Some(found) = self.index.projects().lookup_package(path, package) {
            let label = self.config.package_label(found.project, package);
            tracing::trace!(
                file = path,
                specifier,
                %label,
                version = found.version,
                "Resolved package import"
            );
            state.add(label, kind);
        } else if types.is_none() && ambient.is_empty() {
            state.report(
                DiagnosticKind::ExternalUnmanaged,
                import,
                "package is not declared by any enclosing project",
            );
            return;
        }

        if let Some(label) = types {
            state.add(label, DependencyKind::TypeOnly);
        }
        for label in ambient {
            state.add(label.clone(), DependencyKind::TypeOnly);
        }
    }

    /// Label of `package` as declared by the nearest project enclosing `path`.
    fn declared_package(&self, path: &str, package: &str) -> Option<Label> {
        self.index
            .projects()
            .lookup_package(path, package)
            .map(|found| self.config.package_label(found.project, package))
    }

    /// Labels declaring `specifier`, or `package`, as an ambient module.
    fn ambient_modules(&self, specifier: &str, package: &str) -> Vec<&'a Label> {
        let mut labels: Vec<&Label> = self.index.module_types(specifier).iter().collect();
        if !package.is_empty() && package != specifier {
            for label in self.index.module_types(package) {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        labels
    }

    /// Resolves a relative or workspace-absolute import from the file at `path`.
    fn resolve_local(&self, path: &str, specifier: &str) -> Option<Label> {
        let dir = dir_of(path);
        let target = match specifier.strip_prefix('/') {
            Some(rooted) => join("", rooted),
            None => join(dir, specifier),
        };
        if let Some(label) = self.resolve_target(&target) {
            return Some(label);
        }

        if specifier.starts_with('/') {
            return None;
        }
        let tsconfig = self.index.tsconfigs().config_for(path)?;
        tsconfig
            .root_dir_alternatives(dir)
            .iter()
            .find_map(|alternative| self.resolve_target(&join(alternative, specifier)))
    }

    /// Resolves a bare specifier through tsconfig `paths` and `baseUrl`.
    fn resolve_mapped(&self, path: &str, specifier: &str) -> Option<Label> {
        let tsconfig = self.index.tsconfigs().config_for(path)?;
        tsconfig
            .expand_paths(specifier)
            .iter()
            .find_map(|candidate| self.resolve_target(candidate))
    }

    /// Resolves a workspace-relative target as a file, then as a directory.
    fn resolve_target(&self, target: &str) -> Option<Label> {
        self.resolve_file_candidate(target)
            .or_else(|| self.resolve_directory(target))
            .cloned()
    }

    fn resolve_file_candidate(&self, target: &str) -> Option<&'a Label> {
        let index = self.index;
        if let Some(label) = index.label_of(target) {
            return Some(label);
        }
        RESOLUTION_EXTENSIONS
            .iter()
            .find_map(|ext| index.label_of(&format!("{target}.{ext}")))
            .or_else(|| {
                typescript_sources_for(target)
                    .iter()
                    .find_map(|source| index.label_of(source))
            })
    }

    fn resolve_directory(&self, dir: &str) -> Option<&'a Label> {
        if let Some(manifest) = self.index.manifest(dir) {
            if let Some(label) = manifest
                .entries
                .iter()
                .find_map(|entry| self.resolve_file_candidate(&join(dir, entry)))
            {
                return Some(label);
            }
        }
        let index_file = join(dir, INDEX_FILE_NAME);
        RESOLUTION_EXTENSIONS
            .iter()
            .find_map(|ext| self.index.label_of(&format!("{index_file}.{ext}")))
    }
}
