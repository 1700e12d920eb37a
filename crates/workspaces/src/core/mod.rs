//! Core abstractions for lockfile parsing and package identity.
//!
//! - **Traits** - The [`LockfileParser`] interface implemented per package manager
//! - **Types** - Dependency maps shared by every lockfile format

pub mod traits;
pub mod types;

pub use traits::LockfileParser;
pub use types::{DependencyMap, PackageName, ProjectDependencies, ROOT_PROJECT, Version};
