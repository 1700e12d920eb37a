//! Package identity and dependency declarations for TypeScript workspaces.
//!
//! This crate holds the leaf components tsdeps builds its workspace index
//! from. None of them touch the rest of the workspace tree:
//!
//! - [`specifier`] - splits import specifiers into package name and subpath
//! - [`manifest`] - collects the entry points a `package.json` exposes
//! - [`parsers`] - decodes pnpm lockfiles (v5, v6, v9) into per-project
//!   dependency maps
//! - [`projects`] - indexes every pnpm project in a workspace and answers
//!   which project encloses a file
//!
//! # Example
//!
//! ```
//! use tsdeps_workspaces::{PnpmProjectIndex, parse_import_path, parse_lock_dependencies};
//! use std::path::Path;
//!
//! let lockfile = br#"
//! lockfileVersion: '6.0'
//! dependencies:
//!   left-pad:
//!     specifier: ^1.3.0
//!     version: 1.3.0
//! "#;
//!
//! let mut index = PnpmProjectIndex::new();
//! let projects = parse_lock_dependencies(lockfile)?;
//! index.add_lockfile(".", Path::new("pnpm-lock.yaml"), projects)?;
//!
//! let (pkg, _) = parse_import_path("left-pad/lib");
//! let found = index.lookup_package("src/main.ts", pkg).unwrap();
//! assert_eq!(found.version, "1.3.0");
//! # Ok::<(), tsdeps_workspaces::Error>(())
//! ```

pub mod core;
pub mod error;
pub mod manifest;
pub mod parsers;
pub mod projects;
pub mod specifier;

pub use crate::core::{DependencyMap, LockfileParser, PackageName, ProjectDependencies, ROOT_PROJECT, Version};
pub use error::{Error, Result};
pub use manifest::{Manifest, parse_manifest, parse_manifest_imports, read_manifest};
pub use parsers::{
    LockfileVersion, PnpmLockfile, PnpmLockfileParser, lockfile_version, parse_lock_dependencies,
};
pub use projects::{PackageMatch, PnpmProject, PnpmProjectIndex};
pub use specifier::{
    clean_path, is_local_specifier, join_path, parent_dir, parse_import_path,
    to_at_types_package,
};
