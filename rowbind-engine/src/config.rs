//! Engine configuration, read from `rowbind.toml` or built in code.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Runtime settings of a [`crate::Controller`].
///
/// ```toml
/// table_prefix = "shop_"
/// default_limit = 25
/// max_cascade_depth = 3
/// strict_selectors = true
/// tag = "sql"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Namespace prepended to every derived table name.
    #[serde(default)]
    pub table_prefix: String,
    /// Page size used when `get` is called with `limit < 1`.
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    /// Deepest level of child rows a cascade reaches. Direct children are depth 1.
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: u32,
    /// Unknown filter selectors are errors when set, dropped otherwise.
    #[serde(default = "default_strict_selectors")]
    pub strict_selectors: bool,
    /// Annotation tag read when deriving schemas.
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_limit() -> i64 {
    rowbind_query::DEFAULT_LIMIT
}

fn default_max_cascade_depth() -> u32 {
    3
}

fn default_strict_selectors() -> bool {
    true
}

fn default_tag() -> String {
    rowbind_schema::DEFAULT_TAG.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            default_limit: default_limit(),
            max_cascade_depth: default_max_cascade_depth(),
            strict_selectors: default_strict_selectors(),
            tag: default_tag(),
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    pub fn with_table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = prefix.to_string();
        self
    }

    pub fn with_max_cascade_depth(mut self, depth: u32) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    pub fn lenient(mut self) -> Self {
        self.strict_selectors = false;
        self
    }
}
