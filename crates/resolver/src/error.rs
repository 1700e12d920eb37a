//! Error types for workspace analysis.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running an analysis.
///
/// Only configuration problems and an unreadable workspace root abort a run.
/// Failures confined to one lockfile, manifest, tsconfig or source file are
/// reported as [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum Error {
    /// The workspace root is missing or not a directory.
    #[error("Workspace root not found: {path}")]
    #[diagnostic(
        code(tsdeps::resolver::workspace_not_found),
        help("Pass the directory containing the workspace's source tree")
    )]
    WorkspaceNotFound {
        /// The path that was given as the workspace root.
        path: PathBuf,
    },

    /// A glob in the configuration failed to compile.
    #[error("Invalid glob '{pattern}' in {field}: {source}")]
    #[diagnostic(
        code(tsdeps::resolver::invalid_glob),
        help("Check the glob syntax; '*' matches within one path segment and '**' across segments")
    )]
    InvalidGlob {
        /// Configuration field holding the glob.
        field: String,
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        #[source]
        source: globset::Error,
    },

    /// A label in the configuration is not well formed.
    #[error("Invalid label '{label}': {message}")]
    #[diagnostic(
        code(tsdeps::resolver::invalid_label),
        help("Labels have the form '//package:name'")
    )]
    InvalidLabel {
        /// The label text.
        label: String,
        /// What is wrong with it.
        message: String,
    },

    /// A TypeScript configuration file could not be parsed.
    #[error("Failed to parse tsconfig at {path}: {message}")]
    #[diagnostic(
        code(tsdeps::resolver::tsconfig_parse_failed),
        help("tsconfig files are JSON with comments; check for syntax errors and the 'extends' target")
    )]
    TsConfigParseFailed {
        /// Path to the tsconfig file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// The source parser rejected a file.
    #[error("Failed to parse source file {path}: {message}")]
    #[diagnostic(
        code(tsdeps::resolver::source_parse_failed),
        help("The file is indexed without imports")
    )]
    SourceParseFailed {
        /// Workspace-relative path of the source file.
        path: String,
        /// Description of the parse error.
        message: String,
    },

    /// Error raised by a lockfile or manifest.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspaces(#[from] tsdeps_workspaces::Error),

    /// Error raised while loading an ignore file.
    #[error(transparent)]
    #[diagnostic(code(tsdeps::resolver::ignore_file))]
    Ignore(#[from] tsdeps_ignore::Error),

    /// I/O error occurred.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(tsdeps::resolver::io_error),
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

    /// TOML parsing error.
    #[error("TOML parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(tsdeps::resolver::toml_error),
        help("Ensure tsdeps.toml has valid syntax and uses the documented camelCase keys")
    )]
    Toml {
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Wraps an I/O error with the path and operation it occurred in.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
            operation: operation.into(),
        }
    }
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

impl From<toml::de::Error> for Error {
    fn from(source: toml::de::Error) -> Self {
        Self::Toml { source, path: None }
    }
}
