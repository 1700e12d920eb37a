//! Import specifier classification.
//!
//! Splits the text of an `import`/`require` target into the package it names
//! and the subpath within that package, honoring `@scope/name` packages.

/// Splits an import specifier into `(package_name, subpath)`.
///
/// Local specifiers (empty, or starting with `.` or `/`) are not package
/// references and return `("", specifier)`. A bare `@scope` with no member
/// segment is not a package reference either.
///
/// ```
/// use tsdeps_workspaces::parse_import_path;
///
/// assert_eq!(parse_import_path("@scope/pkg/sub/path"), ("@scope/pkg", "sub/path"));
/// assert_eq!(parse_import_path("lodash/debounce"), ("lodash", "debounce"));
/// assert_eq!(parse_import_path("./x"), ("", "./x"));
/// ```
#[must_use]
pub fn parse_import_path(specifier: &str) -> (&str, &str) {
    if is_local_specifier(specifier) {
        return ("", specifier);
    }

    if let Some(scoped) = specifier.strip_prefix('@') {
        let Some(scope_end) = scoped.find('/') else {
            return ("", specifier);
        };
        // +1 for the leading '@'
        let name_start = scope_end + 2;
        return match specifier[name_start..].find('/') {
            Some(name_len) => {
                let pkg_end = name_start + name_len;
                (&specifier[..pkg_end], &specifier[pkg_end + 1..])
            }
            None => (specifier, ""),
        };
    }

    match specifier.find('/') {
        Some(pkg_end) => (&specifier[..pkg_end], &specifier[pkg_end + 1..]),
        None => (specifier, ""),
    }
}

/// Maps a package name to the conventional name of its types-only package.
///
/// `@scope/name` becomes `@types/scope__name` and `name` (with any trailing
/// path segments dropped) becomes `@types/name`. Returns an empty string when
/// a scoped name has no member segment.
///
/// ```
/// use tsdeps_workspaces::to_at_types_package;
///
/// assert_eq!(to_at_types_package("@scope/pkg"), "@types/scope__pkg");
/// assert_eq!(to_at_types_package("lodash"), "@types/lodash");
/// ```
#[must_use]
pub fn to_at_types_package(pkg: &str) -> String {
    if pkg.is_empty() {
        return String::new();
    }

    if let Some(scoped) = pkg.strip_prefix('@') {
        return match scoped.split_once('/') {
            Some((scope, name)) => format!("@types/{scope}__{name}"),
            None => String::new(),
        };
    }

    match pkg.split_once('/') {
        Some((name, _)) => format!("@types/{name}"),
        None => format!("@types/{pkg}"),
    }
}

/// Returns `true` for relative (`.`) and absolute (`/`) specifiers, and for
/// the empty specifier.
#[must_use]
pub fn is_local_specifier(specifier: &str) -> bool {
    specifier.is_empty() || specifier.starts_with('.') || specifier.starts_with('/')
}

/// Lexically cleans a `/`-separated path.
///
/// Collapses duplicate separators, removes `.` segments and resolves `..`
/// against the preceding segment. A rooted path stays rooted and `..` at the
/// root is dropped. An empty result is returned as `.`.
///
/// ```
/// use tsdeps_workspaces::clean_path;
///
/// assert_eq!(clean_path("./foo/../bar.js"), "bar.js");
/// assert_eq!(clean_path("a//b/./c/"), "a/b/c");
/// assert_eq!(clean_path(""), ".");
/// ```
#[must_use]
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Joins two `/`-separated paths and cleans the result.
///
/// An empty or `.` base yields the cleaned `rel`.
#[must_use]
pub fn join_path(base: &str, rel: &str) -> String {
    if base.is_empty() || base == "." {
        clean_path(rel)
    } else {
        clean_path(&format!("{base}/{rel}"))
    }
}

/// Returns the directory portion of a cleaned path, `.` when there is none.
#[must_use]
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}
