//! Workspace-wide import resolution for TypeScript monorepos.
//!
//! An analysis runs in two phases over a fixed directory snapshot:
//!
//! 1. **Index** ([`WorkspaceIndex::build`]): walk the tree once, honoring
//!    ignore files and excluded directories, and collect pnpm lockfiles,
//!    package manifests, tsconfig files, every analyzable source file with
//!    its owning [`Label`], and ambient module declarations.
//! 2. **Resolve** ([`Resolver::resolve_all`]): map every import of every
//!    source file to a label, or report it as a [`Diagnostic`].
//!
//! Extracting imports from source text is delegated to a [`SourceParser`].
//!
//! ```no_run
//! use std::path::Path;
//! use tsdeps_resolver::{ParsedSource, ResolverConfig, Result, analyze};
//!
//! let root = Path::new("/path/to/monorepo");
//! let config = ResolverConfig::discover(root)?;
//! let parser = |_path: &str, _source: &str| -> Result<ParsedSource> { Ok(ParsedSource::default()) };
//! let analysis = analyze(root, &config, &parser)?;
//!
//! if let Some(deps) = analysis.dependencies_of("src/main.ts") {
//!     assert!(deps.iter().all(|dep| dep.label.to_string().starts_with("//")));
//! }
//! # Ok::<(), tsdeps_resolver::Error>(())
//! ```

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod index;
pub mod label;
pub mod node;
mod paths;
pub mod resolve;
pub mod source;
pub mod tsconfig;

pub use config::{CONFIG_FILE_NAME, ImportRules, ResolverConfig};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::{Error, Result};
pub use index::{DirectoryFindings, IndexedFile, WorkspaceIndex};
pub use label::Label;
pub use resolve::{Analysis, Dependency, DependencyKind, ResolvedFile, Resolver};
pub use source::{FileKind, ImportKind, ImportStatement, ParsedSource, SourceParser, Span};
pub use tsconfig::{TsConfig, TsConfigIndex};

use std::path::Path;

/// Indexes and resolves the workspace at `root`.
///
/// # Errors
///
/// Returns [`Error::WorkspaceNotFound`] if `root` is not a directory, or a
/// configuration error if a glob or label in `config` is invalid. Problems
/// with individual workspace files are reported in
/// [`Analysis::diagnostics`].
pub fn analyze(root: &Path, config: &ResolverConfig, parser: &dyn SourceParser) -> Result<Analysis> {
    if !root.is_dir() {
        return Err(Error::WorkspaceNotFound {
            path: root.to_path_buf(),
        });
    }

    let rules = config.compile()?;
    let index = WorkspaceIndex::build(root, config, &rules, parser);
    Ok(Resolver::new(&index, config, &rules).resolve_all())
}
