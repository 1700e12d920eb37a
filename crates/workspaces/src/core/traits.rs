//! Core traits for lockfile parsing.

use crate::core::types::ProjectDependencies;
use crate::error::Result;
use std::path::Path;

/// Parses package manager-specific lockfiles into per-project dependency maps.
///
/// Every supported lockfile format converges on [`ProjectDependencies`]: a
/// map from the importer (project) path declared in the lockfile to the
/// packages that project declares.
///
/// # Example
///
/// ```rust,ignore
/// use tsdeps_workspaces::{LockfileParser, PnpmLockfileParser};
/// use std::path::Path;
///
/// let parser = PnpmLockfileParser;
/// let projects = parser.parse(Path::new("pnpm-lock.yaml"))?;
///
/// for (project, deps) in &projects {
///     tracing::info!(project, count = deps.len(), "project dependencies");
/// }
/// ```
pub trait LockfileParser {
    /// Parses the lockfile at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The lockfile version is missing, malformed or unsupported
    /// - The document does not match the schema of its declared version
    fn parse(&self, lockfile_path: &Path) -> Result<ProjectDependencies>;

    /// Checks if this parser can handle the given lockfile path.
    fn supports_lockfile(&self, path: &Path) -> bool;

    /// Returns the conventional lockfile name for this parser.
    fn lockfile_name(&self) -> &'static str;
}
