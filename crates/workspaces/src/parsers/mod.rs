//! Parser implementations for converting package-manager lockfiles into
//! per-project dependency maps.
//!
//! Each parser implements the [`LockfileParser`](crate::LockfileParser) trait
//! and focuses on a specific package manager.

pub mod javascript;

pub use javascript::*;
