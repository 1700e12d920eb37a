//! Build-graph labels.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A reference to a build-graph target, rendered as `//package:name`.
///
/// `package` is the workspace-relative directory of the BUILD file (empty for
/// the workspace root) and `name` is the target within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    /// Workspace-relative package directory.
    pub package: String,
    /// Target name within the package.
    pub name: String,
}

impl Label {
    /// Creates a label from its parts.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Parses `//package:name`, `//package` (the target named after the last
    /// package segment) or `:name` (a target in the root package).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLabel`] for any other form.
    pub fn parse(label: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidLabel {
            label: label.to_string(),
            message: message.to_string(),
        };

        if let Some(name) = label.strip_prefix(':') {
            if name.is_empty() {
                return Err(invalid("target name is empty"));
            }
            return Ok(Self::new("", name));
        }

        let rest = label
            .strip_prefix("//")
            .ok_or_else(|| invalid("labels must start with '//' or ':'"))?;

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => (package, name.to_string()),
            None => {
                let name = rest.rsplit('/').next().unwrap_or_default();
                (rest, name.to_string())
            }
        };

        if name.is_empty() {
            return Err(invalid("target name is empty"));
        }
        if package.starts_with('/') || package.ends_with('/') {
            return Err(invalid("package must not start or end with '/'"));
        }

        Ok(Self::new(package, name))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.package, self.name)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Label {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}
