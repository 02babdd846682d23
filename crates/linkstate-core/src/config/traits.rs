//! Core configuration trait for link store components
//!
//! Configuration is layered: compiled defaults, then a TOML file, then
//! environment variables. Environment keys carry the `LINKSTATE_` prefix and
//! use a double underscore between section and field, so
//! `LINKSTATE_ANTI_ENTROPY__INTERVAL_MS` sets `anti_entropy.interval_ms`.

use super::validation::ValidationResult;
use crate::errors::{LinkStoreError, LinkStoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "LINKSTATE_";

/// Core trait for link store configuration types
pub trait LinkStateConfig: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Validate the configuration
    fn validate(&self) -> ValidationResult;

    /// Parse configuration from TOML text; missing fields keep their defaults
    fn load_from_str(content: &str) -> LinkStoreResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| LinkStoreError::config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> LinkStoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LinkStoreError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::load_from_str(&content)
    }

    /// Merge with `LINKSTATE_*` environment variables
    fn merge_with_env(&mut self) -> LinkStoreResult<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge with an explicit set of `LINKSTATE_*` variables
    fn merge_with_vars<I>(&mut self, vars: I) -> LinkStoreResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = env_key_to_path(&key) {
                self.set_from_string(&config_key, &value)?;
                tracing::debug!(key = %config_key, "Applied environment override");
            }
        }
        self.validate()?;
        Ok(())
    }

    /// Set a dotted configuration key from its string form
    fn set_from_string(&mut self, key: &str, value: &str) -> LinkStoreResult<()> {
        let mut tree = toml::Value::try_from(&*self)
            .map_err(|e| LinkStoreError::config(format!("Failed to encode config: {}", e)))?;
        set_nested_value(&mut tree, key, parse_scalar(value))?;
        *self = tree
            .try_into()
            .map_err(|e| LinkStoreError::config(format!("Invalid value for '{}': {}", key, e)))?;
        Ok(())
    }
}

/// Map `LINKSTATE_SECTION__FIELD` to `section.field`
fn env_key_to_path(key: &str) -> Option<String> {
    let rest = key.strip_prefix(ENV_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_lowercase().replace("__", "."))
}

fn parse_scalar(value: &str) -> toml::Value {
    if let Ok(int) = value.parse::<i64>() {
        toml::Value::Integer(int)
    } else if let Ok(flag) = value.parse::<bool>() {
        toml::Value::Boolean(flag)
    } else {
        toml::Value::String(value.to_string())
    }
}

/// Replace an existing leaf addressed by dot notation (e.g. "a.b.c")
fn set_nested_value(tree: &mut toml::Value, key: &str, value: toml::Value) -> LinkStoreResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        return Err(LinkStoreError::config("Empty key"));
    };

    let mut current = tree;
    for part in sections {
        current = current
            .get_mut(*part)
            .filter(|v| v.is_table())
            .ok_or_else(|| LinkStoreError::config(format!("Unknown config section '{}'", part)))?;
    }

    let table = current
        .as_table_mut()
        .ok_or_else(|| LinkStoreError::config("Cannot set value on non-table"))?;
    match table.get_mut(*leaf) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(LinkStoreError::config(format!("Unknown config key '{}'", key))),
    }
}
