//! pnpm `pnpm-lock.yaml` parsing.
//!
//! pnpm has changed its lockfile schema several times. The major version on
//! the `lockfileVersion` line selects the decoder:
//!
//! - `5.x` maps each dependency name straight to a version string
//! - `6.x` maps each dependency to a `{specifier, version}` object
//! - `9.x` uses the 6.x dependency shape but always lists projects under
//!   `importers`
//!
//! Every decoder produces the same [`ProjectDependencies`] shape. When a
//! document lists `importers`, each importer becomes one project. Otherwise
//! the document's top-level sections form the single [`ROOT_PROJECT`].
//!
//! Dependency kinds are merged in the order `dependencies`,
//! `devDependencies`, `peerDependencies`, `optionalDependencies`. A later
//! kind overwrites an earlier one when both declare the same name.

use crate::core::traits::LockfileParser;
use crate::core::types::{DependencyMap, ProjectDependencies, ROOT_PROJECT, merge_sections};
use crate::error::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

const LOCKFILE_NAME: &str = "pnpm-lock.yaml";

static VERSION_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*lockfileVersion\s*:(.*)$").ok());

static VERSION_VALUE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^['"]?(\d+)\.(\d+)['"]?$"#).ok());

/// Parser for pnpm `pnpm-lock.yaml` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PnpmLockfileParser;

impl LockfileParser for PnpmLockfileParser {
    fn parse(&self, lockfile_path: &Path) -> Result<ProjectDependencies> {
        let contents = fs::read(lockfile_path).map_err(|source| Error::Io {
            source,
            path: Some(lockfile_path.to_path_buf()),
            operation: "reading pnpm-lock.yaml".to_string(),
        })?;

        let projects = parse_lock_dependencies(&contents).map_err(|e| match e {
            Error::Yaml { source, .. } => Error::LockfileParseFailed {
                path: lockfile_path.to_path_buf(),
                message: source.to_string(),
            },
            other => other,
        })?;

        tracing::debug!(
            path = %lockfile_path.display(),
            projects = projects.len(),
            "Parsed pnpm lockfile"
        );

        Ok(projects)
    }

    fn supports_lockfile(&self, path: &Path) -> bool {
        matches!(
            path.file_name().and_then(|n| n.to_str()),
            Some(LOCKFILE_NAME)
        )
    }

    fn lockfile_name(&self) -> &'static str {
        LOCKFILE_NAME
    }
}

/// A `lockfileVersion` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockfileVersion {
    /// Major version, selecting the schema.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl fmt::Display for LockfileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Finds the `lockfileVersion` declaration in a lockfile.
///
/// Only the first line whose key is `lockfileVersion` is considered. The
/// value may be bare (`5.4`) or quoted (`'6.0'`).
///
/// # Errors
///
/// Returns [`Error::LockfileVersionMissing`] when no line declares the
/// version and [`Error::InvalidLockfileVersion`] when the value is not a
/// `<major>.<minor>` pair.
pub fn lockfile_version(contents: &str) -> Result<LockfileVersion> {
    let (Some(line_re), Some(value_re)) = (VERSION_LINE.as_ref(), VERSION_VALUE.as_ref()) else {
        return Err(Error::LockfileVersionMissing);
    };

    let value = contents
        .lines()
        .find_map(|line| line_re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or(Error::LockfileVersionMissing)?;

    let invalid = || Error::InvalidLockfileVersion {
        found: value.to_string(),
    };

    let caps = value_re.captures(value).ok_or_else(invalid)?;
    let major = caps[1].parse::<u32>().map_err(|_| invalid())?;
    let minor = caps[2].parse::<u32>().map_err(|_| invalid())?;

    Ok(LockfileVersion { major, minor })
}

/// Parses lockfile bytes into per-importer dependency maps.
///
/// An empty (or whitespace-only) document has no projects.
///
/// # Errors
///
/// Returns an error if the version declaration is missing, malformed or
/// names an unsupported major version, or if the document does not match
/// the schema of its version.
pub fn parse_lock_dependencies(contents: &[u8]) -> Result<ProjectDependencies> {
    match PnpmLockfile::from_slice(contents)? {
        Some(lockfile) => Ok(lockfile.into_projects()),
        None => Ok(ProjectDependencies::new()),
    }
}

/// A decoded pnpm lockfile, one variant per supported schema.
#[derive(Debug, Clone)]
pub enum PnpmLockfile {
    /// `lockfileVersion: 5.x`
    V5(LockfileV5),
    /// `lockfileVersion: '6.x'`
    V6(LockfileV6),
    /// `lockfileVersion: '9.x'`
    V9(LockfileV9),
}

impl PnpmLockfile {
    /// Decodes a lockfile, dispatching on its declared major version.
    ///
    /// Returns `Ok(None)` for an empty document.
    ///
    /// # Errors
    ///
    /// See [`parse_lock_dependencies`].
    pub fn from_slice(contents: &[u8]) -> Result<Option<Self>> {
        let text = String::from_utf8_lossy(contents);
        if text.trim().is_empty() {
            return Ok(None);
        }

        let version = lockfile_version(&text)?;
        tracing::trace!(%version, "Detected pnpm lockfile version");

        let lockfile = match version.major {
            5 => Self::V5(serde_yaml::from_slice(contents)?),
            6 => Self::V6(serde_yaml::from_slice(contents)?),
            9 => Self::V9(serde_yaml::from_slice(contents)?),
            _ => {
                return Err(Error::UnsupportedLockfileVersion {
                    version: version.to_string(),
                });
            }
        };

        Ok(Some(lockfile))
    }

    /// Converts the lockfile into merged dependency maps keyed by importer.
    #[must_use]
    pub fn into_projects(self) -> ProjectDependencies {
        match self {
            Self::V5(lockfile) => lockfile.into_projects(),
            Self::V6(lockfile) => lockfile.into_projects(),
            Self::V9(lockfile) => lockfile.into_projects(),
        }
    }
}

/// Dependency sections of one importer (or the document root) in a 5.x lockfile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImporterV5 {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
}

impl ImporterV5 {
    fn merged(&self) -> DependencyMap {
        merge_sections(
            [
                &self.dependencies,
                &self.dev_dependencies,
                &self.peer_dependencies,
                &self.optional_dependencies,
            ],
            String::as_str,
        )
    }
}

/// A 5.x lockfile.
///
/// ```yaml
/// lockfileVersion: 5.4
/// importers:
///   .:
///     specifiers:
///       '@aspect-test/a': ^2.0.2
///     dependencies:
///       '@aspect-test/a': 2.0.2
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockfileV5 {
    #[serde(flatten)]
    root: ImporterV5,
    #[serde(default)]
    importers: Option<BTreeMap<String, ImporterV5>>,
}

impl LockfileV5 {
    fn into_projects(self) -> ProjectDependencies {
        match self.importers {
            Some(importers) => importers
                .into_iter()
                .map(|(path, importer)| (path, importer.merged()))
                .collect(),
            None => ProjectDependencies::from([(ROOT_PROJECT.to_string(), self.root.merged())]),
        }
    }
}

/// A dependency entry in 6.x and 9.x lockfiles.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageRef {
    /// The range written in the project's manifest.
    #[serde(default)]
    pub specifier: Option<String>,
    /// The locked version (may carry peer suffixes or a `link:` target).
    pub version: String,
}

/// Dependency sections of one importer in 6.x and 9.x lockfiles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImporterV6 {
    #[serde(default)]
    dependencies: BTreeMap<String, PackageRef>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, PackageRef>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, PackageRef>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, PackageRef>,
}

impl ImporterV6 {
    fn merged(&self) -> DependencyMap {
        merge_sections(
            [
                &self.dependencies,
                &self.dev_dependencies,
                &self.peer_dependencies,
                &self.optional_dependencies,
            ],
            |dep: &PackageRef| dep.version.as_str(),
        )
    }
}

/// A 6.x lockfile.
///
/// ```yaml
/// lockfileVersion: '6.0'
/// dependencies:
///   '@aspect-test/c':
///     specifier: ^2.0.2
///     version: 2.0.2
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockfileV6 {
    #[serde(flatten)]
    root: ImporterV6,
    #[serde(default)]
    importers: Option<BTreeMap<String, ImporterV6>>,
}

impl LockfileV6 {
    fn into_projects(self) -> ProjectDependencies {
        match self.importers {
            Some(importers) => importers
                .into_iter()
                .map(|(path, importer)| (path, importer.merged()))
                .collect(),
            None => ProjectDependencies::from([(ROOT_PROJECT.to_string(), self.root.merged())]),
        }
    }
}

/// A 9.x lockfile. Projects are only ever listed under `importers`.
///
/// ```yaml
/// lockfileVersion: '9.0'
/// importers:
///   .:
///     dependencies:
///       left-pad:
///         specifier: ^1.3.0
///         version: 1.3.0
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockfileV9 {
    #[serde(default)]
    importers: Option<BTreeMap<String, ImporterV6>>,
}

impl LockfileV9 {
    fn into_projects(self) -> ProjectDependencies {
        match self.importers {
            Some(importers) => importers
                .into_iter()
                .map(|(path, importer)| (path, importer.merged()))
                .collect(),
            None => ProjectDependencies::from([(ROOT_PROJECT.to_string(), DependencyMap::new())]),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::needless_raw_string_hashes)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(yaml: &str) -> ProjectDependencies {
        parse_lock_dependencies(yaml.as_bytes()).unwrap()
    }

    #[test]
    fn empty_lockfile_has_no_projects() {
        assert!(parse("").is_empty());
        assert!(parse("\n   \n").is_empty());
    }

    #[test]
    fn lockfile_version_forms() {
        assert_eq!(
            lockfile_version("lockfileVersion: 5.4").unwrap(),
            LockfileVersion { major: 5, minor: 4 }
        );
        assert_eq!(
            lockfile_version("\n  lockfileVersion: '6.0'\n").unwrap(),
            LockfileVersion { major: 6, minor: 0 }
        );
        assert_eq!(
            lockfile_version("lockfileVersion: \"9.0\"").unwrap().to_string(),
            "9.0"
        );
    }

    #[test]
    fn first_version_line_wins() {
        let version = lockfile_version("lockfileVersion: '6.0'\nlockfileVersion: '9.0'\n").unwrap();
        assert_eq!(version.major, 6);
    }

    #[test]
    fn missing_version_is_an_error() {
        let result = parse_lock_dependencies(b"importers: {}\n");
        assert!(matches!(result, Err(Error::LockfileVersionMissing)));
    }

    #[test]
    fn malformed_version_is_an_error() {
        for yaml in ["lockfileVersion: six", "lockfileVersion: '6'", "lockfileVersion:"] {
            let result = parse_lock_dependencies(yaml.as_bytes());
            assert!(
                matches!(result, Err(Error::InvalidLockfileVersion { .. })),
                "{yaml}: {result:?}"
            );
        }
    }

    #[test]
    fn unsupported_version_is_an_error() {
        for yaml in ["lockfileVersion: 4.0", "lockfileVersion: '7.0'", "lockfileVersion: '10.0'"] {
            let result = parse_lock_dependencies(yaml.as_bytes());
            assert!(
                matches!(result, Err(Error::UnsupportedLockfileVersion { .. })),
                "{yaml}: {result:?}"
            );
        }
    }

    #[test]
    fn v5_basic_deps() {
        let projects = parse(
            r#"
lockfileVersion: 5.4

specifiers:
  '@aspect-test/a': 5.0.2
  '@aspect-test/c': 2.0.2
  jquery: 3.6.1

dependencies:
  '@aspect-test/a': 5.0.2

devDependencies:
  '@aspect-test/c': 2.0.2

peerDependencies:
  jquery: 3.6.1
"#,
        );

        assert_eq!(projects.len(), 1);
        let root = &projects[ROOT_PROJECT];
        assert_eq!(root.len(), 3);
        assert_eq!(root["@aspect-test/a"], "5.0.2");
        assert_eq!(root["jquery"], "3.6.1");
    }

    #[test]
    fn v5_no_deps_property() {
        let projects = parse("\nlockfileVersion: 5.4\n");
        assert_eq!(projects.len(), 1);
        assert!(projects[ROOT_PROJECT].is_empty());
    }

    #[test]
    fn v5_workspace_importers() {
        let projects = parse(
            r#"
lockfileVersion: 5.4
importers:
  .:
    specifiers:
      '@aspect-test/a': ^2.0.2
    dependencies:
      '@aspect-test/a': 2.0.2
  gazelle/ts/tests/simple_json_import:
    specifiers: {}
  infrastructure/cdn:
    specifiers:
      '@aspect-test/c': ^2.0.2
    dependencies:
      '@aspect-test/c': 2.0.2
packages:
  /@aspect-test/c/2.0.2:
    dev: false
"#,
        );

        assert_eq!(projects.len(), 3);
        assert_eq!(projects["."]["@aspect-test/a"], "2.0.2");
        assert!(projects["gazelle/ts/tests/simple_json_import"].is_empty());
        assert_eq!(projects["infrastructure/cdn"].len(), 1);
        assert_eq!(projects["infrastructure/cdn"]["@aspect-test/c"], "2.0.2");
    }

    #[test]
    fn v5_later_kinds_overwrite_earlier_kinds() {
        let projects = parse(
            r#"
lockfileVersion: 5.4
dependencies:
  shared: 1.0.0
  only-dep: 1.0.0
devDependencies:
  shared: 2.0.0
optionalDependencies:
  shared: 4.0.0
peerDependencies:
  shared: 3.0.0
"#,
        );

        let root = &projects[ROOT_PROJECT];
        assert_eq!(root.len(), 2);
        assert_eq!(root["shared"], "4.0.0");
        assert_eq!(root["only-dep"], "1.0.0");
    }

    #[test]
    fn v6_root_deps() {
        let projects = parse(
            r#"
lockfileVersion: '6.0'

dependencies:
  '@aspect-test/c':
    specifier: ^2.0.2
    version: 2.0.2

devDependencies:
  jquery:
    specifier: 3.6.1
    version: 3.6.1

packages:

  /@aspect-test/c@2.0.2:
    resolution: {integrity: sha512-test}
    dev: false
"#,
        );

        assert_eq!(projects.len(), 1);
        let root = &projects[ROOT_PROJECT];
        assert_eq!(root["@aspect-test/c"], "2.0.2");
        assert_eq!(root["jquery"], "3.6.1");
    }

    #[test]
    fn v6_importers() {
        let projects = parse(
            r#"
lockfileVersion: '6.0'

importers:

  .:
    dependencies:
      left-pad:
        specifier: ^1.3.0
        version: 1.3.0

  packages/web:
    dependencies:
      react:
        specifier: ^18.2.0
        version: 18.2.0
      '@acme/ui':
        specifier: workspace:*
        version: link:../ui
    devDependencies:
      react:
        specifier: ^18.3.0
        version: 18.3.1
"#,
        );

        assert_eq!(projects.len(), 2);
        assert_eq!(projects["."]["left-pad"], "1.3.0");
        assert_eq!(projects["packages/web"]["react"], "18.3.1");
        assert_eq!(projects["packages/web"]["@acme/ui"], "link:../ui");
    }

    #[test]
    fn v6_dependency_without_version_is_a_schema_error() {
        let result = parse_lock_dependencies(
            br#"
lockfileVersion: '6.0'
dependencies:
  left-pad: 1.3.0
"#,
        );

        assert!(matches!(result, Err(Error::Yaml { .. })));
    }

    #[test]
    fn v9_importers() {
        let projects = parse(
            r#"
lockfileVersion: '9.0'

settings:
  autoInstallPeers: true

importers:

  .:
    devDependencies:
      typescript:
        specifier: ^5.4.0
        version: 5.4.5

  lib:
    dependencies:
      '@types/node':
        specifier: ^20.0.0
        version: 20.12.7
    peerDependencies:
      typescript:
        specifier: '>=5'
        version: 5.4.5

packages:

  typescript@5.4.5:
    resolution: {integrity: sha512-test}
"#,
        );

        assert_eq!(projects.len(), 2);
        assert_eq!(projects["."]["typescript"], "5.4.5");
        assert_eq!(projects["lib"].len(), 2);
        assert_eq!(projects["lib"]["@types/node"], "20.12.7");
    }

    #[test]
    fn v9_later_kinds_overwrite_earlier_kinds() {
        let projects = parse(
            r#"
lockfileVersion: '9.0'

importers:

  .:
    dependencies:
      a:
        specifier: ^1.0.0
        version: 1.0.0
      b:
        specifier: ^1.0.0
        version: 1.0.0
    devDependencies:
      b:
        specifier: ^3.0.0
        version: 3.0.0
    optionalDependencies:
      a:
        specifier: ^2.0.0
        version: 2.0.0
"#,
        );

        let root = &projects[ROOT_PROJECT];
        assert_eq!(root.len(), 2);
        assert_eq!(root["a"], "2.0.0");
        assert_eq!(root["b"], "3.0.0");
    }

    #[test]
    fn v9_without_importers_has_empty_root() {
        let projects = parse("lockfileVersion: '9.0'\n");
        assert_eq!(projects.len(), 1);
        assert!(projects[ROOT_PROJECT].is_empty());
    }

    #[test]
    fn parser_reads_file_and_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"lockfileVersion: '6.0'\nimporters:\n  .:\n    dependencies:\n      left-pad:\n        specifier: ^1.3.0\n        version: 1.3.0\n")
            .unwrap();

        let projects = PnpmLockfileParser.parse(file.path()).unwrap();
        assert_eq!(projects["."]["left-pad"], "1.3.0");

        let mut bad = NamedTempFile::new().unwrap();
        bad.write_all(b"lockfileVersion: '6.0'\nimporters: [1, 2]\n")
            .unwrap();

        match PnpmLockfileParser.parse(bad.path()) {
            Err(Error::LockfileParseFailed { path, .. }) => assert_eq!(path, bad.path()),
            other => panic!("expected LockfileParseFailed, got {other:?}"),
        }
    }

    #[test]
    fn supports_expected_filename() {
        let parser = PnpmLockfileParser;
        assert!(parser.supports_lockfile(Path::new("/tmp/pnpm-lock.yaml")));
        assert!(!parser.supports_lockfile(Path::new("package-lock.json")));
        assert_eq!(parser.lockfile_name(), "pnpm-lock.yaml");
    }
}
