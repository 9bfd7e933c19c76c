//! YAML configuration for the pipeline.
//!
//! Every field has a default, so an empty file (or no file) reproduces the
//! stock behaviour. Command-line flags are applied on top by the caller.

use crate::error::{Error, Result, UnterminatedPolicy};
use crate::passes::{BooleanMode, Pass, PassSet, RoleStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Values accepted by the `role` enum column
pub const DEFAULT_ALLOWED_ROLES: [&str; 15] = [
    "guest",
    "new",
    "member",
    "artist",
    "band",
    "studio",
    "choir",
    "group",
    "community",
    "label",
    "editor",
    "manager",
    "admin",
    "sadmin",
    "user",
];

/// Boolean normalization settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanConfig {
    pub mode: BooleanMode,
    /// Columns always treated as boolean, keyed by table name
    pub columns: HashMap<String, Vec<String>>,
}

/// Enum repair settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub strategy: RoleStrategy,
    /// Tables whose INSERTs carry the role column
    pub tables: Vec<String>,
    /// Name of the role column
    pub column: String,
    /// Replacement for values outside the allowed set
    pub fallback: String,
    pub allowed: Vec<String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            strategy: RoleStrategy::default(),
            tables: vec!["user".to_string()],
            column: "role".to_string(),
            fallback: "user".to_string(),
            allowed: DEFAULT_ALLOWED_ROLES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Passes to run; always executed in canonical order
    pub passes: PassSet,
    /// Schema qualifiers stripped by the identifiers pass
    pub schemas: Vec<String>,
    /// What to do with rows of a COPY block that never terminates
    pub unterminated: UnterminatedPolicy,
    pub booleans: BooleanConfig,
    pub roles: RoleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            passes: PassSet::all(),
            schemas: vec!["public".to_string()],
            unterminated: UnterminatedPolicy::default(),
            booleans: BooleanConfig::default(),
            roles: RoleConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that deserialize fine but cannot work
    pub fn validate(&self) -> Result<()> {
        if self.passes.contains(Pass::Roles) {
            let roles = &self.roles;
            if roles.column.trim().is_empty() {
                return Err(Error::Config("roles.column must not be empty".to_string()));
            }
            if roles.allowed.is_empty() {
                return Err(Error::Config("roles.allowed must not be empty".to_string()));
            }
            if !roles.allowed.iter().any(|r| r == &roles.fallback) {
                return Err(Error::Config(format!(
                    "roles.fallback '{}' is not one of roles.allowed",
                    roles.fallback
                )));
            }
        }
        if self.passes.contains(Pass::Booleans)
            && self.booleans.mode == BooleanMode::Columns
            && self.booleans.columns.is_empty()
        {
            return Err(Error::Config(
                "booleans.mode 'columns' requires booleans.columns".to_string(),
            ));
        }
        if self.schemas.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::Config("schemas must not contain empty names".to_string()));
        }
        Ok(())
    }
}
