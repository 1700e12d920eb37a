//! Source file classification and the syntax-tree extraction seam.
//!
//! tsdeps does not parse TypeScript itself. A [`SourceParser`] turns file
//! contents into the import statements and ambient module declarations the
//! index needs; everything else about a file is decided here from its name.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Source extensions, without the leading dot.
pub const SOURCE_EXTENSIONS: [&str; 8] = ["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Declaration-file extensions, without the leading dot.
pub const DECLARATION_EXTENSIONS: [&str; 3] = ["d.ts", "d.mts", "d.cts"];

/// Data-file extensions. Importable but never parsed.
pub const DATA_EXTENSIONS: [&str; 1] = ["json"];

/// Extensions appended to an extensionless import, in resolution order.
pub const RESOLUTION_EXTENSIONS: [&str; 11] = [
    "ts", "tsx", "d.ts", "mts", "d.mts", "cts", "d.cts", "js", "jsx", "mjs", "cjs",
];

/// Base name of a directory's entry file.
pub const INDEX_FILE_NAME: &str = "index";

/// How a workspace file takes part in analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    /// Compiled source: parsed for imports.
    Source,
    /// Type declarations: parsed for imports and ambient modules.
    Declaration,
    /// Data such as JSON: importable, never parsed.
    Data,
}

impl FileKind {
    /// Returns `true` if files of this kind are handed to the [`SourceParser`].
    #[must_use]
    pub fn is_parsed(self) -> bool {
        matches!(self, Self::Source | Self::Declaration)
    }
}

/// Classifies a file by name, returning `None` for files outside analysis.
#[must_use]
pub fn classify_file(file_name: &str) -> Option<FileKind> {
    if DECLARATION_EXTENSIONS
        .iter()
        .any(|ext| has_extension(file_name, ext))
    {
        return Some(FileKind::Declaration);
    }
    if SOURCE_EXTENSIONS.iter().any(|ext| has_extension(file_name, ext)) {
        return Some(FileKind::Source);
    }
    if DATA_EXTENSIONS.iter().any(|ext| has_extension(file_name, ext)) {
        return Some(FileKind::Data);
    }
    None
}

fn has_extension(file_name: &str, ext: &str) -> bool {
    file_name
        .strip_suffix(ext)
        .and_then(|stem| stem.strip_suffix('.'))
        .is_some_and(|stem| !stem.is_empty())
}

/// Returns the TypeScript files that compile to the JavaScript file at `path`.
///
/// `a.js` may be written as `a.ts`, `a.tsx` or declared by `a.d.ts`; the
/// module variants map to their module counterparts.
#[must_use]
pub fn typescript_sources_for(path: &str) -> Vec<String> {
    const SWAPS: [(&str, &[&str]); 4] = [
        (".js", &[".ts", ".tsx", ".d.ts"]),
        (".jsx", &[".tsx"]),
        (".mjs", &[".mts", ".d.mts"]),
        (".cjs", &[".cts", ".d.cts"]),
    ];

    SWAPS
        .iter()
        .find_map(|(js, ts)| {
            path.strip_suffix(js)
                .map(|stem| ts.iter().map(|ext| format!("{stem}{ext}")).collect())
        })
        .unwrap_or_default()
}

/// The syntactic form an import was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportKind {
    /// `import ... from "x"` or `import "x"`
    Import,
    /// `export ... from "x"`
    Export,
    /// `require("x")`
    Require,
    /// `import("x")`
    DynamicImport,
    /// `/// <reference types="x" />`
    TypeReference,
}

/// Byte range of an import specifier in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Offset of the first byte.
    pub start: usize,
    /// Offset one past the last byte.
    pub end: usize,
}

impl Span {
    /// Creates a span.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One import extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatement {
    /// The specifier text as written.
    pub specifier: String,
    /// Syntactic form.
    pub kind: ImportKind,
    /// Location of the specifier.
    pub span: Span,
    /// `import type` / `export type`; only types cross this edge.
    pub type_only: bool,
}

impl ImportStatement {
    /// A value import of `specifier` with an empty span.
    pub fn new(specifier: impl Into<String>, kind: ImportKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
            span: Span::default(),
            type_only: false,
        }
    }

    /// Marks the import as type-only.
    #[must_use]
    pub fn type_only(mut self) -> Self {
        self.type_only = true;
        self
    }

    /// Sets the source span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// What a [`SourceParser`] extracts from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSource {
    /// Imports in source order.
    pub imports: Vec<ImportStatement>,
    /// Names of ambient `declare module "name"` declarations.
    pub modules: Vec<String>,
}

/// Extracts imports and ambient module declarations from source text.
///
/// Implementations are shared across the index-phase worker pool.
pub trait SourceParser: Send + Sync {
    /// Parses `source`, the contents of the workspace-relative file `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceParseFailed`](crate::Error::SourceParseFailed)
    /// when the text cannot be parsed. The file is still indexed.
    fn parse(&self, path: &str, source: &str) -> Result<ParsedSource>;
}

impl<F> SourceParser for F
where
    F: Fn(&str, &str) -> Result<ParsedSource> + Send + Sync,
{
    fn parse(&self, path: &str, source: &str) -> Result<ParsedSource> {
        self(path, source)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_file() {
        assert_eq!(classify_file("a.ts"), Some(FileKind::Source));
        assert_eq!(classify_file("a.tsx"), Some(FileKind::Source));
        assert_eq!(classify_file("a.cjs"), Some(FileKind::Source));
        assert_eq!(classify_file("a.d.ts"), Some(FileKind::Declaration));
        assert_eq!(classify_file("a.d.mts"), Some(FileKind::Declaration));
        assert_eq!(classify_file("data.json"), Some(FileKind::Data));
        assert_eq!(classify_file("README.md"), None);
        assert_eq!(classify_file(".ts"), None);
        assert_eq!(classify_file("ts"), None);
    }

    #[test]
    fn test_only_code_is_parsed() {
        assert!(FileKind::Source.is_parsed());
        assert!(FileKind::Declaration.is_parsed());
        assert!(!FileKind::Data.is_parsed());
    }

    #[test]
    fn test_typescript_sources_for() {
        assert_eq!(typescript_sources_for("lib/a.js"), ["lib/a.ts", "lib/a.tsx", "lib/a.d.ts"]);
        assert_eq!(typescript_sources_for("a.jsx"), ["a.tsx"]);
        assert_eq!(typescript_sources_for("a.mjs"), ["a.mts", "a.d.mts"]);
        assert_eq!(typescript_sources_for("a.cjs"), ["a.cts", "a.d.cts"]);
        assert!(typescript_sources_for("a.ts").is_empty());
    }

    #[test]
    fn test_closure_parser() {
        let parser = |_: &str, source: &str| -> Result<ParsedSource> {
            Ok(ParsedSource {
                imports: vec![ImportStatement::new(source.trim(), ImportKind::Import).type_only()],
                modules: Vec::new(),
            })
        };

        let parsed = SourceParser::parse(&parser, "a.ts", " react ").unwrap();
        assert_eq!(parsed.imports[0].specifier, "react");
        assert!(parsed.imports[0].type_only);
    }
}
