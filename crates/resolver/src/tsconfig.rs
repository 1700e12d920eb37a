//! TypeScript project configuration (`tsconfig.json`).
//!
//! Only the options that change how an import specifier maps to a file are
//! read: `extends`, `compilerOptions.baseUrl`, `paths`, `rootDirs`, `types`
//! and the project `references`. Every path is stored workspace-relative so
//! a config inherited through `extends` needs no re-basing.

use crate::error::{Error, Result};
use crate::paths::{ancestors, dir_of, join};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsConfigJson {
    #[serde(default)]
    extends: Option<ExtendsJson>,
    #[serde(default)]
    compiler_options: CompilerOptionsJson,
    #[serde(default)]
    references: Option<Vec<ReferenceJson>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExtendsJson {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptionsJson {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    paths: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    root_dirs: Option<Vec<String>>,
    #[serde(default)]
    types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ReferenceJson {
    path: String,
}

/// `compilerOptions.paths` with the directory of the config declaring them.
///
/// Targets resolve against the effective `baseUrl` of the config using the
/// mappings, and against `dir` only when no `baseUrl` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMappings {
    /// Workspace-relative directory of the declaring config.
    pub dir: String,
    /// Pattern to target list, as declared.
    pub mappings: BTreeMap<String, Vec<String>>,
}

/// A loaded tsconfig with `extends` applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsConfig {
    /// Workspace-relative directory holding the config.
    pub dir: String,
    /// Workspace-relative path of the config file.
    pub file: String,
    /// Workspace-relative paths of the configs this one extends.
    pub extends: Vec<String>,
    /// Effective `baseUrl`, workspace-relative.
    pub base_url: Option<String>,
    /// Effective `paths`.
    pub paths: Option<PathMappings>,
    /// Effective `rootDirs`, workspace-relative.
    pub root_dirs: Vec<String>,
    /// Effective `types`.
    pub types: Vec<String>,
    /// Workspace-relative directories of referenced projects.
    pub references: Vec<String>,
}

impl TsConfig {
    /// Loads `dir/file_name` from the workspace at `root`, following `extends`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid config.
    /// A missing or broken `extends` target is logged and ignored.
    pub fn load(root: &Path, dir: &str, file_name: &str) -> Result<Self> {
        let file = join(dir, file_name);
        let mut chain = HashSet::new();
        let config = Self::load_file(root, &file, &mut chain)?;
        tracing::debug!(
            file = %config.file,
            paths = config.paths.as_ref().map_or(0, |p| p.mappings.len()),
            references = config.references.len(),
            "Loaded tsconfig"
        );
        Ok(config)
    }

    /// Parses config text for the workspace-relative `file`, loading any
    /// `extends` targets from `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TsConfigParseFailed`] if the text is not a valid config.
    pub fn parse(root: &Path, file: &str, contents: &str) -> Result<Self> {
        let mut chain = HashSet::from([file.to_string()]);
        Self::parse_with_chain(root, file, contents, &mut chain)
    }

    fn load_file(root: &Path, file: &str, chain: &mut HashSet<String>) -> Result<Self> {
        let path = root.join(file);
        let contents = fs::read_to_string(&path)
            .map_err(|source| Error::io(source, &path, "reading tsconfig"))?;

        chain.insert(file.to_string());
        let config = Self::parse_with_chain(root, file, &contents, chain);
        chain.remove(file);
        config
    }

    fn parse_with_chain(
        root: &Path,
        file: &str,
        contents: &str,
        chain: &mut HashSet<String>,
    ) -> Result<Self> {
        let invalid = |message: String| Error::TsConfigParseFailed {
            path: file.into(),
            message,
        };

        let value = jsonc_parser::parse_to_value(contents, &jsonc_parser::ParseOptions::default())
            .map_err(|err| invalid(err.to_string()))?
            .map_or(Value::Object(serde_json::Map::new()), convert_jsonc_to_serde_value);
        let raw: TsConfigJson =
            serde_json::from_value(value).map_err(|err| invalid(err.to_string()))?;

        let dir = dir_of(file).to_string();
        let mut config = Self::empty(&dir, file);

        let extends = match raw.extends {
            Some(ExtendsJson::One(spec)) => vec![spec],
            Some(ExtendsJson::Many(specs)) => specs,
            None => Vec::new(),
        };
        for spec in extends {
            let Some(base_file) = resolve_extends(root, &dir, &spec) else {
                tracing::warn!(file, extends = %spec, "tsconfig extends target not found");
                continue;
            };
            if chain.contains(&base_file) {
                tracing::warn!(file, extends = %base_file, "Recursive tsconfig extends");
                continue;
            }
            match Self::load_file(root, &base_file, chain) {
                Ok(base) => {
                    config.inherit(base);
                    config.extends.push(base_file);
                }
                Err(e) => {
                    tracing::warn!(file, extends = %base_file, error = %e, "Failed to load base tsconfig");
                }
            }
        }

        let options = raw.compiler_options;
        if let Some(base_url) = options.base_url {
            config.base_url = Some(join(&dir, &base_url));
        }
        if let Some(mappings) = options.paths {
            config.paths = Some(PathMappings {
                dir: dir.clone(),
                mappings,
            });
        }
        if let Some(root_dirs) = options.root_dirs {
            config.root_dirs = root_dirs.iter().map(|d| join(&dir, d)).collect();
        }
        if let Some(types) = options.types {
            config.types = types;
        }
        config.references = raw
            .references
            .unwrap_or_default()
            .iter()
            .filter(|r| !r.path.is_empty())
            .map(|r| {
                let target = join(&dir, &r.path);
                if target.ends_with(".json") {
                    dir_of(&target).to_string()
                } else {
                    target
                }
            })
            .collect();

        Ok(config)
    }

    fn empty(dir: &str, file: &str) -> Self {
        Self {
            dir: dir.to_string(),
            file: file.to_string(),
            extends: Vec::new(),
            base_url: None,
            paths: None,
            root_dirs: Vec::new(),
            types: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Takes every inheritable option from `base`. References are not inherited.
    fn inherit(&mut self, base: Self) {
        if base.base_url.is_some() {
            self.base_url = base.base_url;
        }
        if base.paths.is_some() {
            self.paths = base.paths;
        }
        if !base.root_dirs.is_empty() {
            self.root_dirs = base.root_dirs;
        }
        if !base.types.is_empty() {
            self.types = base.types;
        }
    }

    /// Expands a bare specifier into workspace-relative candidate paths, in
    /// priority order: exact `paths` keys, `*` patterns (longest prefix, then
    /// longest suffix first), then `baseUrl`.
    #[must_use]
    pub fn expand_paths(&self, specifier: &str) -> Vec<String> {
        let mut candidates = Vec::new();

        if let Some(paths) = &self.paths {
            let base = self.base_url.as_deref().unwrap_or(&paths.dir);
            if let Some(targets) = paths.mappings.get(specifier) {
                candidates.extend(targets.iter().map(|t| join(base, t)));
            }

            let mut patterns: Vec<(&str, &str, &[String])> = paths
                .mappings
                .iter()
                .filter_map(|(key, targets)| {
                    let (prefix, suffix) = key.split_once('*')?;
                    let matches = specifier.len() >= prefix.len() + suffix.len()
                        && specifier.starts_with(prefix)
                        && specifier.ends_with(suffix);
                    matches.then_some((prefix, suffix, targets.as_slice()))
                })
                .collect();
            patterns.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(b.1.len().cmp(&a.1.len())));

            for (prefix, suffix, targets) in patterns {
                let matched = &specifier[prefix.len()..specifier.len() - suffix.len()];
                for target in targets {
                    candidates.push(join(base, &target.replacen('*', matched, 1)));
                }
            }

            if !candidates.is_empty() {
                tracing::trace!(specifier, ?candidates, "tsconfig paths matched");
            }
        }

        if let Some(base_url) = &self.base_url {
            candidates.push(join(base_url, specifier));
        }

        candidates
    }

    /// Returns the directories equivalent to `dir` under the other `rootDirs`.
    #[must_use]
    pub fn root_dir_alternatives(&self, dir: &str) -> Vec<String> {
        let Some((owner, offset)) = self.root_dirs.iter().find_map(|root| {
            if root.is_empty() {
                Some((root, dir))
            } else if dir == root {
                Some((root, ""))
            } else {
                dir.strip_prefix(root.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|rest| (root, rest))
            }
        }) else {
            return Vec::new();
        };

        self.root_dirs
            .iter()
            .filter(|root| *root != owner)
            .map(|root| join(root, offset))
            .collect()
    }
}

/// Finds the file an `extends` specifier names.
fn resolve_extends(root: &Path, dir: &str, spec: &str) -> Option<String> {
    let exists = |candidate: &str| root.join(candidate).is_file();
    let with_json = |candidate: String| -> Option<String> {
        if exists(&candidate) {
            return Some(candidate);
        }
        let json = format!("{candidate}.json");
        exists(&json).then_some(json)
    };

    if spec.starts_with("./") || spec.starts_with("../") || spec.starts_with('/') {
        let candidate = if let Some(rooted) = spec.strip_prefix('/') {
            join("", rooted)
        } else {
            join(dir, spec)
        };
        return with_json(candidate);
    }

    ancestors(dir).find_map(|ancestor| {
        let candidate = join(ancestor, &format!("node_modules/{spec}"));
        with_json(candidate.clone()).or_else(|| {
            let nested = join(&candidate, "tsconfig.json");
            exists(&nested).then_some(nested)
        })
    })
}

/// Converts a `jsonc_parser` value into a `serde_json` value.
fn convert_jsonc_to_serde_value(jsonc_value: jsonc_parser::JsonValue) -> Value {
    match jsonc_value {
        jsonc_parser::JsonValue::Null => Value::Null,
        jsonc_parser::JsonValue::Boolean(b) => Value::Bool(b),
        jsonc_parser::JsonValue::Number(n) => {
            if let Ok(i) = n.parse::<i64>() {
                Value::Number(i.into())
            } else if let Ok(f) = n.parse::<f64>() {
                serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
            } else {
                Value::Null
            }
        }
        jsonc_parser::JsonValue::String(s) => Value::String(s.to_string()),
        jsonc_parser::JsonValue::Array(arr) => {
            Value::Array(arr.into_iter().map(convert_jsonc_to_serde_value).collect())
        }
        jsonc_parser::JsonValue::Object(obj) => {
            let mut map = serde_json::Map::new();
            for (key, value) in obj {
                map.insert(key, convert_jsonc_to_serde_value(value));
            }
            Value::Object(map)
        }
    }
}

/// Every tsconfig in a workspace, keyed by directory.
#[derive(Debug, Clone, Default)]
pub struct TsConfigIndex {
    configs: BTreeMap<String, TsConfig>,
}

impl TsConfigIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a config, replacing any previous config for the same directory.
    pub fn insert(&mut self, config: TsConfig) {
        self.configs.insert(config.dir.clone(), config);
    }

    /// Number of configs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Returns `true` if no config was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Returns the config declared in `dir`.
    #[must_use]
    pub fn get(&self, dir: &str) -> Option<&TsConfig> {
        self.configs.get(dir)
    }

    /// Returns the config governing the file at `path`: the one in its own
    /// directory or the nearest ancestor directory.
    #[must_use]
    pub fn config_for(&self, path: &str) -> Option<&TsConfig> {
        ancestors(dir_of(path)).find_map(|dir| self.configs.get(dir))
    }

    /// Builds the project-reference graph: one node per config directory or
    /// referenced directory, one edge per `references` entry.
    #[must_use]
    pub fn reference_graph(&self) -> DiGraph<String, ()> {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut node = |graph: &mut DiGraph<String, ()>, dir: &str| {
            *nodes
                .entry(dir.to_string())
                .or_insert_with(|| graph.add_node(dir.to_string()))
        };

        for config in self.configs.values() {
            let from = node(&mut graph, &config.dir);
            for reference in &config.references {
                let to = node(&mut graph, reference);
                graph.update_edge(from, to, ());
            }
        }

        graph
    }
}
