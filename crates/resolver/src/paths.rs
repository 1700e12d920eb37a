//! Workspace-relative path helpers.
//!
//! Paths inside the index are `/`-separated and relative to the workspace
//! root, with the root directory itself written as `""`.

use std::path::{Component, Path};
use tsdeps_workspaces::{join_path, parent_dir};

/// Joins `rel` onto the workspace-relative directory `base`.
pub fn join(base: &str, rel: &str) -> String {
    match join_path(base, rel).as_str() {
        "." => String::new(),
        other => other.to_string(),
    }
}

/// Directory of a workspace-relative path, `""` at the root.
pub fn dir_of(path: &str) -> &str {
    match parent_dir(path) {
        "." | "/" => "",
        other => other,
    }
}

/// Last segment of a workspace-relative path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Ancestors of a workspace-relative directory, nearest first, ending at `""`.
pub fn ancestors(dir: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(dir);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.is_empty() {
            None
        } else {
            Some(dir_of(current))
        };
        Some(current)
    })
}

/// Converts an on-disk path below `root` into its workspace-relative form.
///
/// Returns `None` for paths outside `root` or with non-UTF-8 components.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}
