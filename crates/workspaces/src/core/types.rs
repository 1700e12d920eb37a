//! Core types shared by lockfile parsers and the project index.

use std::collections::BTreeMap;

/// A package name as written in a lockfile or import specifier (e.g. `@scope/pkg`).
pub type PackageName = String;

/// A resolved version string as recorded by the lockfile (e.g. `1.3.0`, `link:../lib`).
pub type Version = String;

/// Packages declared by one project, mapped to their locked versions.
///
/// Built fresh per lockfile parse and never mutated afterwards.
pub type DependencyMap = BTreeMap<PackageName, Version>;

/// Dependency maps keyed by the importer path declared in the lockfile.
///
/// Importer paths are relative to the lockfile's directory; the lockfile's own
/// directory is [`ROOT_PROJECT`].
pub type ProjectDependencies = BTreeMap<String, DependencyMap>;

/// Importer key denoting the directory containing the lockfile.
pub const ROOT_PROJECT: &str = ".";

/// Merges dependency sections in order, later sections overwriting earlier
/// ones on a name collision.
pub(crate) fn merge_sections<'a, I, V>(sections: I, version: impl Fn(&V) -> &str) -> DependencyMap
where
    I: IntoIterator<Item = &'a BTreeMap<String, V>>,
    V: 'a,
{
    let mut merged = DependencyMap::new();
    for section in sections {
        for (name, value) in section {
            merged.insert(name.clone(), version(value).to_string());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sections_last_write_wins() {
        let deps = BTreeMap::from([("a".to_string(), "1.0.0".to_string())]);
        let dev = BTreeMap::from([
            ("a".to_string(), "2.0.0".to_string()),
            ("b".to_string(), "1.0.0".to_string()),
        ]);

        let merged = merge_sections([&deps, &dev], String::as_str);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged["a"], "2.0.0");
        assert_eq!(merged["b"], "1.0.0");
    }

    #[test]
    fn test_merge_sections_empty() {
        let merged = merge_sections::<_, String>([], String::as_str);
        assert!(merged.is_empty());
    }
}
