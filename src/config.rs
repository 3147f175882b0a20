//! Run configuration.
//!
//! Built either in code (`Config::default().with_kv_path(..)`), from CLI
//! flags, or from a JSON file via [`Config::load`].
use std::path::Path;

use indexmap::IndexSet;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ident::{sanitize_for, Dialect, Identifier};
use crate::schema::SchemaPath;

pub const DEFAULT_ROOT_NAME: &str = "root_object";
pub const DEFAULT_TYPE_SUFFIX: &str = "_t";

/// What to do when two observations of one slot have kinds with no join
/// (e.g. string vs boolean).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Fail with `Error::SchemaConflict`.
    Strict,
    /// Keep the earlier observation's shape and log a warning.
    #[default]
    PreferFirst,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the (possibly synthetic) top-level object.
    pub root_name: Identifier,
    /// Object paths to treat as key/value maps. Every path starts at `root_name`.
    pub kv_paths: IndexSet<SchemaPath>,
    /// Passed through to the emitter: borrow strings instead of owning them.
    pub use_view: bool,
    pub type_prefix: String,
    pub type_suffix: String,
    pub conflict_policy: ConflictPolicy,
    pub dialect: Dialect,
}

impl Default for Config {
    fn default() -> Self {
        let dialect = Dialect::default();
        Self {
            root_name: sanitize_for(DEFAULT_ROOT_NAME, dialect),
            kv_paths: IndexSet::new(),
            use_view: false,
            type_prefix: String::new(),
            type_suffix: DEFAULT_TYPE_SUFFIX.to_string(),
            conflict_policy: ConflictPolicy::default(),
            dialect,
        }
    }
}

impl Config {
    /// Exact-sequence membership in `kv_paths`.
    pub fn path_matches(&self, path: &SchemaPath) -> bool {
        self.kv_paths.contains(path)
    }

    pub fn sanitize(&self, raw: &str) -> Identifier {
        sanitize_for(raw, self.dialect)
    }

    /// Registry name for objects found under `hint`.
    pub fn object_name(&self, hint: &str) -> Identifier {
        self.sanitize(&format!("{}{hint}{}", self.type_prefix, self.type_suffix))
    }

    /// Parse a dotted member path (`a.b.c`, with `\.` for a literal dot).
    /// Segments are sanitized the same way member names are; the root name is
    /// prepended unless the path already starts with it. `None` for an empty
    /// path.
    pub fn parse_kv_path(&self, text: &str) -> Option<SchemaPath> {
        let segments = split_dotted(text);
        if segments.is_empty() {
            return None;
        }
        let mut path: SchemaPath = segments.iter().map(|s| self.sanitize(s)).collect();
        if path.segments().first() != Some(&self.root_name) {
            path.push_front(self.root_name.clone());
        }
        Some(path)
    }

    /// Changing the root re-roots kv paths that were already added.
    #[must_use]
    pub fn with_root_name(mut self, raw: &str) -> Self {
        let root = self.sanitize(raw);
        self.kv_paths = self.kv_paths
            .into_iter()
            .map(|p| {
                let mut rerooted = SchemaPath::root(root.clone());
                for seg in p.iter().skip(1) { rerooted.push(seg.clone()); }
                rerooted
            })
            .collect();
        self.root_name = root;
        self
    }

    /// Empty paths are ignored.
    #[must_use]
    pub fn with_kv_path(mut self, text: &str) -> Self {
        if let Some(path) = self.parse_kv_path(text) {
            self.kv_paths.insert(path);
        }
        self
    }

    #[must_use]
    pub fn with_use_view(mut self, use_view: bool) -> Self {
        self.use_view = use_view;
        self
    }

    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Only affects names sanitized afterwards; set it before adding kv paths.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self.root_name = self.sanitize(&self.root_name.clone());
        self
    }

    #[must_use]
    pub fn with_type_affixes(mut self, prefix: &str, suffix: &str) -> Self {
        self.type_prefix = prefix.to_string();
        self.type_suffix = suffix.to_string();
        self
    }

    /// Read a JSON config file. Every field is optional.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(source)
            .map_err(|e| Error::Config { message: e.to_string() })?;
        Ok(file.into_config())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    root_name: Option<String>,
    kv_paths: Vec<String>,
    use_view: Option<bool>,
    type_prefix: Option<String>,
    type_suffix: Option<String>,
    conflict_policy: Option<ConflictPolicy>,
    dialect: Option<Dialect>,
}

impl ConfigFile {
    fn into_config(self) -> Config {
        let mut config = Config::default();
        if let Some(dialect) = self.dialect {
            config = config.with_dialect(dialect);
        }
        if let Some(root) = &self.root_name {
            config = config.with_root_name(root);
        }
        for path in &self.kv_paths {
            config = config.with_kv_path(path);
        }
        if let Some(use_view) = self.use_view {
            config.use_view = use_view;
        }
        if let Some(prefix) = self.type_prefix {
            config.type_prefix = prefix;
        }
        if let Some(suffix) = self.type_suffix {
            config.type_suffix = suffix;
        }
        if let Some(policy) = self.conflict_policy {
            config.conflict_policy = policy;
        }
        config
    }
}

/// `memberA.memberB.member\.C` → `["memberA", "memberB", "member.C"]`
fn split_dotted(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    if text.is_empty() {
        return out;
    }
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            '.' => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}

// ------------------------------- Tests ------------------------------------ //
