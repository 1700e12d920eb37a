//! Package manifest (`package.json`) entry-point resolution.
//!
//! Collects the files a package exposes as importable entry points from the
//! `main`, `types`, `typings` and `exports` fields, normalized relative to the
//! manifest's directory.

use crate::error::{Error, Result};
use crate::specifier::clean_path;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Fields holding a single entry path, in resolution order.
const ENTRY_FIELDS: [&str; 3] = ["main", "types", "typings"];

/// The parts of a package manifest relevant to import resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// The package `name`, if declared.
    pub name: Option<String>,
    /// Entry points in declaration order, relative to the manifest directory.
    pub entries: Vec<String>,
}

/// Parses a manifest from a reader.
///
/// Invalid JSON is an error. Unexpected but valid shapes (a `null` export,
/// a numeric export target, a non-object document) contribute nothing.
///
/// # Errors
///
/// Returns [`Error::Json`] if the input is not valid JSON and [`Error::Io`]
/// if the reader fails.
pub fn parse_manifest<R: Read>(reader: R) -> Result<Manifest> {
    let value: Value = serde_json::from_reader(reader)?;

    let Value::Object(fields) = value else {
        tracing::debug!("package manifest is not a JSON object");
        return Ok(Manifest::default());
    };

    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let mut entries = Vec::new();
    for field in ENTRY_FIELDS {
        if let Some(Value::String(path)) = fields.get(field) {
            push_entry(&mut entries, path);
        }
    }

    match fields.get("exports") {
        Some(Value::String(path)) => push_entry(&mut entries, path),
        Some(Value::Object(map)) => {
            for target in map.values() {
                match target {
                    Value::String(path) => push_entry(&mut entries, path),
                    Value::Null => {}
                    other => {
                        tracing::trace!(target = %other, "skipping unsupported package export target");
                    }
                }
            }
        }
        Some(Value::Array(targets)) => {
            for target in targets {
                if let Value::String(path) = target {
                    push_entry(&mut entries, path);
                }
            }
        }
        _ => {}
    }

    Ok(Manifest { name, entries })
}

/// Parses a manifest from a reader, returning only its entry points.
///
/// # Errors
///
/// See [`parse_manifest`].
pub fn parse_manifest_imports<R: Read>(reader: R) -> Result<Vec<String>> {
    parse_manifest(reader).map(|manifest| manifest.entries)
}

/// Reads and parses the manifest at `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and
/// [`Error::ManifestParseFailed`] if it is not valid JSON.
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let contents = fs::read(path).map_err(|source| Error::Io {
        source,
        path: Some(path.to_path_buf()),
        operation: "reading package manifest".to_string(),
    })?;

    let manifest = parse_manifest(contents.as_slice()).map_err(|e| Error::ManifestParseFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    tracing::debug!(
        path = %path.display(),
        name = manifest.name.as_deref().unwrap_or_default(),
        entries = manifest.entries.len(),
        "Read package manifest"
    );

    Ok(manifest)
}

fn push_entry(entries: &mut Vec<String>, path: &str) {
    let path = path.strip_prefix("./").unwrap_or(path);
    if path.is_empty() {
        return;
    }
    entries.push(clean_path(path));
}
