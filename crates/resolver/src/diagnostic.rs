//! Non-fatal findings reported alongside an analysis.

use crate::source::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// A relative or absolute import matched no workspace file.
    UnresolvedLocal,
    /// A bare import names a package no enclosing project declares.
    ExternalUnmanaged,
    /// A lockfile, manifest, tsconfig, ignore file or source file could not
    /// be read or parsed; its data is absent from the index.
    InvalidInput,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnresolvedLocal => "unresolved-local",
            Self::ExternalUnmanaged => "external-unmanaged",
            Self::InvalidInput => "invalid-input",
        })
    }
}

/// A reported problem that does not abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// Workspace-relative path of the file the diagnostic is about.
    pub file: String,
    /// The import specifier, for import diagnostics.
    pub specifier: Option<String>,
    /// Location of the specifier in `file`.
    pub span: Option<Span>,
    /// Human-readable detail.
    pub message: String,
}

impl Diagnostic {
    /// A diagnostic about one import in `file`.
    pub fn import(
        kind: DiagnosticKind,
        file: impl Into<String>,
        specifier: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            file: file.into(),
            specifier: Some(specifier.into()),
            span: Some(span),
            message: message.into(),
        }
    }

    /// A diagnostic about an input file that was skipped.
    pub fn invalid_input(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::InvalidInput,
            file: file.into(),
            specifier: None,
            span: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.file)?;
        if let Some(span) = self.span {
            write!(f, ":{}", span.start)?;
        }
        if let Some(specifier) = &self.specifier {
            write!(f, ": '{specifier}'")?;
        }
        write!(f, ": {}", self.message)
    }
}
