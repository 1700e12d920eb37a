//! Error types for workspace operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for workspace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading lockfiles and manifests.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The lockfile has content but no `lockfileVersion` declaration.
    #[error("Lockfile does not declare a lockfileVersion")]
    #[diagnostic(
        code(tsdeps::workspaces::lockfile_version_missing),
        help("pnpm lockfiles start with a 'lockfileVersion' line. Try regenerating it with 'pnpm install'")
    )]
    LockfileVersionMissing,

    /// The `lockfileVersion` value is not a `<major>.<minor>` version.
    #[error("Invalid lockfileVersion '{found}': expected a version like '6.0'")]
    #[diagnostic(
        code(tsdeps::workspaces::invalid_lockfile_version),
        help("The lockfile may be corrupted. Try regenerating it with 'pnpm install'")
    )]
    InvalidLockfileVersion {
        /// The value found after `lockfileVersion:`.
        found: String,
    },

    /// The lockfile major version has no decoder.
    #[error("Unsupported pnpm lockfile version: {version}")]
    #[diagnostic(
        code(tsdeps::workspaces::unsupported_lockfile_version),
        help("Supported pnpm lockfile versions: 5.x, 6.x, 9.x")
    )]
    UnsupportedLockfileVersion {
        /// The declared lockfile version.
        version: String,
    },

    /// Failed to parse lockfile.
    #[error("Failed to parse lockfile at {path}: {message}")]
    #[diagnostic(
        code(tsdeps::workspaces::lockfile_parse_failed),
        help("The lockfile may be corrupted. Try regenerating it with your package manager")
    )]
    LockfileParseFailed {
        /// Path to the lockfile.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Failed to parse a package manifest.
    #[error("Failed to parse package manifest at {path}: {message}")]
    #[diagnostic(
        code(tsdeps::workspaces::manifest_parse_failed),
        help("Ensure the package.json file contains a valid JSON object")
    )]
    ManifestParseFailed {
        /// Path to the manifest.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Two lockfiles declare the same project.
    #[error("Project '{project}' declared by {lockfile} is already declared by another lockfile")]
    #[diagnostic(
        code(tsdeps::workspaces::duplicate_project),
        help("Each directory may belong to only one pnpm lockfile importer")
    )]
    DuplicateProject {
        /// Workspace-relative path of the project.
        project: String,
        /// The lockfile that declared it a second time.
        lockfile: PathBuf,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(tsdeps::workspaces::io_error),
        help("Check that the referenced paths exist and that you have permission to read them")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(tsdeps::workspaces::json_error),
        help("Ensure the JSON has valid syntax")
    )]
    Json {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },

    /// YAML parsing error.
    #[error("YAML parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(tsdeps::workspaces::yaml_error),
        help("Ensure the YAML has valid syntax and matches the schema of its lockfileVersion")
    )]
    Yaml {
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source, path: None }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Yaml { source, path: None }
    }
}
