//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use regex::Regex;
use std::fs;
use std::sync::LazyLock;
use tempfile::TempDir;
use tsdeps_resolver::{ImportKind, ImportStatement, ParsedSource, Result, Span};

struct Rule {
    pattern: Regex,
    kind: ImportKind,
    type_only: bool,
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let rule = |pattern: &str, kind, type_only| Rule {
        pattern: Regex::new(pattern).expect("valid import pattern"),
        kind,
        type_only,
    };
    vec![
        rule(r#"^\s*import\s+type\s.*\bfrom\s+['"]([^'"]+)['"]"#, ImportKind::Import, true),
        rule(r#"^\s*export\s+type\s.*\bfrom\s+['"]([^'"]+)['"]"#, ImportKind::Export, true),
        rule(r#"^\s*import\s.*\bfrom\s+['"]([^'"]+)['"]"#, ImportKind::Import, false),
        rule(r#"^\s*import\s+['"]([^'"]+)['"]"#, ImportKind::Import, false),
        rule(r#"^\s*export\s.*\bfrom\s+['"]([^'"]+)['"]"#, ImportKind::Export, false),
        rule(r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#, ImportKind::Require, false),
        rule(r#"\bimport\(\s*['"]([^'"]+)['"]\s*\)"#, ImportKind::DynamicImport, false),
        rule(r#"^\s*///\s*<reference\s+types=['"]([^'"]+)['"]"#, ImportKind::TypeReference, true),
    ]
});

static DECLARE_MODULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*declare\s+module\s+['"]([^'"]+)['"]"#).expect("valid pattern"));

/// Line-based stand-in for a real TypeScript parser: the first matching rule
/// on each line yields one import.
pub fn parse_source(_path: &str, source: &str) -> Result<ParsedSource> {
    let mut parsed = ParsedSource::default();
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        if let Some(caps) = DECLARE_MODULE.captures(line) {
            parsed.modules.push(caps[1].to_string());
        } else if let Some((rule, spec)) = RULES
            .iter()
            .find_map(|rule| rule.pattern.captures(line).and_then(|c| c.get(1)).map(|m| (rule, m)))
        {
            let mut import = ImportStatement::new(spec.as_str(), rule.kind)
                .with_span(Span::new(offset + spec.start(), offset + spec.end()));
            if rule.type_only {
                import = import.type_only();
            }
            parsed.imports.push(import);
        }
        offset += line.len();
    }

    Ok(parsed)
}

/// Creates a workspace on disk from `(path, contents)` pairs.
pub fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, contents).unwrap();
    }
    dir
}

/// A pnpm v6 lockfile whose root project declares each `(name, version)`.
pub fn v6_lockfile(packages: &[(&str, &str)]) -> String {
    let mut lockfile = String::from("lockfileVersion: '6.0'\n\ndependencies:\n");
    for (name, version) in packages {
        lockfile.push_str(&format!(
            "  '{name}':\n    specifier: ^{version}\n    version: {version}\n"
        ));
    }
    lockfile
}
