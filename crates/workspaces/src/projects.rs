//! Workspace-wide index of pnpm projects.
//!
//! A workspace may contain several pnpm lockfiles, each declaring one or more
//! projects (importers). The index keys every project by its path relative to
//! the workspace root, with the root itself keyed as `""`, and answers which
//! project encloses a given file.

use crate::core::types::{DependencyMap, ProjectDependencies};
use crate::error::{Error, Result};
use crate::specifier::{join_path, parent_dir};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Normalizes a project path so that the root is always `""`.
fn normalize_project(project: &str) -> &str {
    match project {
        "." | "/" => "",
        other => other,
    }
}

/// A project registered from a lockfile importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnpmProject {
    /// Workspace-relative path, `""` for the workspace root.
    pub path: String,
    /// The lockfile that declared this project.
    pub lockfile: PathBuf,
    /// Declared packages and their locked versions.
    pub dependencies: DependencyMap,
}

/// A package found while walking from a project to its ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageMatch<'a> {
    /// The project declaring the package.
    pub project: &'a str,
    /// The locked version.
    pub version: &'a str,
}

/// All pnpm projects in a workspace.
#[derive(Debug, Clone, Default)]
pub struct PnpmProjectIndex {
    projects: BTreeMap<String, PnpmProject>,
}

impl PnpmProjectIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Returns `true` when no lockfile has contributed a project.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Registers every importer of a parsed lockfile.
    ///
    /// `lockfile_dir` is the workspace-relative directory holding the
    /// lockfile; importer keys are resolved against it. Nothing is registered
    /// if any importer collides with an existing project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateProject`] when an importer resolves to a
    /// project already declared by another lockfile.
    pub fn add_lockfile(
        &mut self,
        lockfile_dir: &str,
        lockfile: &Path,
        importers: ProjectDependencies,
    ) -> Result<usize> {
        let resolved: Vec<(String, DependencyMap)> = importers
            .into_iter()
            .map(|(importer, deps)| {
                let path = join_path(lockfile_dir, &importer);
                (normalize_project(&path).to_string(), deps)
            })
            .collect();

        if let Some((project, _)) = resolved
            .iter()
            .find(|(project, _)| self.projects.contains_key(project))
        {
            return Err(Error::DuplicateProject {
                project: project.clone(),
                lockfile: lockfile.to_path_buf(),
            });
        }

        let count = resolved.len();
        for (path, dependencies) in resolved {
            tracing::debug!(
                project = %path,
                lockfile = %lockfile.display(),
                packages = dependencies.len(),
                "Registered pnpm project"
            );
            self.projects.insert(
                path.clone(),
                PnpmProject {
                    path,
                    lockfile: lockfile.to_path_buf(),
                    dependencies,
                },
            );
        }

        Ok(count)
    }

    /// Returns the project registered exactly at `project`.
    #[must_use]
    pub fn project(&self, project: &str) -> Option<&PnpmProject> {
        self.projects.get(normalize_project(project))
    }

    /// Returns `true` if `dir` is itself a project root.
    #[must_use]
    pub fn is_project(&self, dir: &str) -> bool {
        self.project(dir).is_some()
    }

    /// Iterates over all projects in path order.
    pub fn projects(&self) -> impl Iterator<Item = &PnpmProject> {
        self.projects.values()
    }

    /// Returns the nearest project enclosing `path` (the path itself or its
    /// closest ancestor that is a project).
    #[must_use]
    pub fn enclosing_project(&self, path: &str) -> Option<&PnpmProject> {
        let mut current = normalize_project(path);
        loop {
            if let Some(project) = self.projects.get(current) {
                return Some(project);
            }
            if current.is_empty() {
                return None;
            }
            current = normalize_project(parent_dir(current));
        }
    }

    /// Returns the path of the project enclosing `path`, defaulting to the
    /// workspace root `""` when no project encloses it.
    #[must_use]
    pub fn project_of(&self, path: &str) -> &str {
        self.enclosing_project(path)
            .map_or("", |project| project.path.as_str())
    }

    /// Returns the project containing `project`, excluding itself.
    #[must_use]
    pub fn parent(&self, project: &PnpmProject) -> Option<&PnpmProject> {
        if project.path.is_empty() {
            return None;
        }
        self.enclosing_project(parent_dir(&project.path))
    }

    /// Looks up `package` for a file at `path`, trying the enclosing project
    /// first and then each ancestor project.
    #[must_use]
    pub fn lookup_package(&self, path: &str, package: &str) -> Option<PackageMatch<'_>> {
        let mut project = self.enclosing_project(path);
        while let Some(current) = project {
            if let Some(version) = current.dependencies.get(package) {
                return Some(PackageMatch {
                    project: &current.path,
                    version,
                });
            }
            project = self.parent(current);
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn deps(entries: &[(&str, &str)]) -> DependencyMap {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn index() -> PnpmProjectIndex {
        let mut index = PnpmProjectIndex::new();
        let importers = ProjectDependencies::from([
            (".".to_string(), deps(&[("typescript", "5.4.5"), ("left-pad", "1.3.0")])),
            ("apps/web".to_string(), deps(&[("react", "18.2.0"), ("@acme/ui", "link:../../libs/ui")])),
            ("libs/ui".to_string(), deps(&[("react", "18.3.1"), ("shared", "file:vendor/shared")])),
        ]);
        index
            .add_lockfile(".", Path::new("pnpm-lock.yaml"), importers)
            .unwrap();
        index
    }

    #[test]
    fn test_projects_are_keyed_relative_to_the_workspace() {
        let index = index();
        assert_eq!(index.len(), 3);
        assert!(index.is_project(""));
        assert!(index.is_project("."));
        assert!(index.is_project("apps/web"));
        assert!(!index.is_project("apps"));
    }

    #[test]
    fn test_nested_lockfile_resolves_importers_against_its_directory() {
        let mut index = PnpmProjectIndex::new();
        index
            .add_lockfile(
                "tools",
                Path::new("tools/pnpm-lock.yaml"),
                ProjectDependencies::from([
                    (".".to_string(), DependencyMap::new()),
                    ("lint".to_string(), DependencyMap::new()),
                ]),
            )
            .unwrap();

        assert!(index.is_project("tools"));
        assert!(index.is_project("tools/lint"));
        assert!(!index.is_project(""));
    }

    #[test]
    fn test_enclosing_project() {
        let index = index();
        assert_eq!(index.project_of("apps/web/src/main.ts"), "apps/web");
        assert_eq!(index.project_of("apps/web"), "apps/web");
        assert_eq!(index.project_of("apps/other/x.ts"), "");
        assert_eq!(index.project_of("index.ts"), "");
    }

    #[test]
    fn test_project_of_defaults_to_root() {
        let index = PnpmProjectIndex::new();
        assert_eq!(index.project_of("a/b/c.ts"), "");
        assert!(index.enclosing_project("a/b/c.ts").is_none());
    }

    #[test]
    fn test_lookup_prefers_nearest_project() {
        let index = index();

        let found = index.lookup_package("libs/ui/button.ts", "react").unwrap();
        assert_eq!(found.project, "libs/ui");
        assert_eq!(found.version, "18.3.1");

        let found = index.lookup_package("apps/web/page.ts", "react").unwrap();
        assert_eq!(found.project, "apps/web");
    }

    #[test]
    fn test_lookup_falls_back_to_parent_projects() {
        let index = index();

        let found = index.lookup_package("apps/web/page.ts", "left-pad").unwrap();
        assert_eq!(found.project, "");
        assert_eq!(found.version, "1.3.0");

        assert!(index.lookup_package("apps/web/page.ts", "not-declared").is_none());
    }

    #[test]
    fn test_duplicate_project_is_rejected() {
        let mut index = index();
        let result = index.add_lockfile(
            "apps",
            Path::new("apps/pnpm-lock.yaml"),
            ProjectDependencies::from([
                ("mobile".to_string(), DependencyMap::new()),
                ("web".to_string(), DependencyMap::new()),
            ]),
        );

        match result {
            Err(Error::DuplicateProject { project, lockfile }) => {
                assert_eq!(project, "apps/web");
                assert_eq!(lockfile, PathBuf::from("apps/pnpm-lock.yaml"));
            }
            other => panic!("expected DuplicateProject, got {other:?}"),
        }

        // nothing from the rejected lockfile is registered
        assert!(!index.is_project("apps/mobile"));
    }
}
