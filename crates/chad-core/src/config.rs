//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once at startup, validated, and then only
//! read. The defaults for each layout are TOML documents compiled into the
//! binary; a user file with the same structure replaces them wholesale.

use std::collections::HashMap;
use std::path::Path;

use chad_model::{SchemaVersion, TableKind};
use chad_store::IndexDef;
use chad_transform::{CompiledRule, StatusRule, TableRule};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

const CHAD_DEFAULTS: &str = include_str!("../config/chad.toml");
const BEVAN_DEFAULTS: &str = include_str!("../config/bevan.toml");

type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub schema: SchemaVersion,
    /// Destination strings that record a death.
    pub death_events: Vec<String>,
    pub status: StatusRule,
    pub tables: Vec<TableRule>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
}

impl PipelineConfig {
    /// The compiled-in defaults for `version`.
    pub fn embedded(version: SchemaVersion) -> ConfigResult<Self> {
        let text = match version {
            SchemaVersion::Chad => CHAD_DEFAULTS,
            SchemaVersion::Bevan => BEVAN_DEFAULTS,
        };
        Self::from_toml_str(text, &format!("embedded {version} defaults"))
    }

    pub fn from_toml_str(text: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        config.validate()?;
        debug!(origin, schema = %config.schema, tables = config.tables.len(), "config loaded");
        Ok(config)
    }

    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// Resolve the configuration for a run.
    ///
    /// With an override file its content is used as-is, and a requested
    /// schema must agree with the one it declares.
    pub fn load(schema: Option<SchemaVersion>, path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => {
                let config = Self::from_path(path)?;
                if let Some(expected) = schema.filter(|s| *s != config.schema) {
                    return Err(ConfigError::SchemaMismatch {
                        expected,
                        found: config.schema,
                    });
                }
                Ok(config)
            }
            None => Self::embedded(schema.unwrap_or_default()),
        }
    }

    /// Structural checks; also compiles every pattern once.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tables.is_empty() {
            return Err(ConfigError::NoTables);
        }
        let mut owners: HashMap<&str, TableKind> = HashMap::new();
        let mut seen_tables = Vec::with_capacity(self.tables.len());
        for rule in &self.tables {
            if seen_tables.contains(&rule.table) {
                return Err(ConfigError::DuplicateTable {
                    table: rule.table.to_string(),
                });
            }
            seen_tables.push(rule.table);
            for category in &rule.categories {
                if let Some(first) = owners.insert(category.as_str(), rule.table) {
                    return Err(ConfigError::SharedCategory {
                        category: category.clone(),
                        first: first.to_string(),
                        second: rule.table.to_string(),
                    });
                }
            }
        }
        self.compile_rules()?;
        Ok(())
    }

    /// Compiled rules in population order.
    pub fn compile_rules(&self) -> ConfigResult<Vec<CompiledRule>> {
        let mut rules = self
            .tables
            .iter()
            .cloned()
            .map(CompiledRule::new)
            .collect::<Result<Vec<_>, _>>()?;
        rules.sort_by_key(|rule| rule.rule().table.population_rank());
        Ok(rules)
    }

    pub fn rule_for(&self, table: TableKind) -> Option<&TableRule> {
        self.tables.iter().find(|rule| rule.table == table)
    }

    /// Every category the run reads, in population order, without repeats.
    pub fn required_categories(&self) -> Vec<String> {
        let mut tables: Vec<&TableRule> = self.tables.iter().collect();
        tables.sort_by_key(|rule| rule.table.population_rank());

        let mut categories: Vec<String> = Vec::new();
        let status = self.status.categories();
        let all = tables
            .iter()
            .flat_map(|rule| rule.categories.iter().map(String::as_str))
            .chain(status);
        for category in all {
            if !categories.iter().any(|c| c == category) {
                categories.push(category.to_string());
            }
        }
        categories
    }
}
