use graph_contract::{GraphError, Result, Value};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configuration accepted by [`crate::MemoryGraphStore::initialize`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryStoreConfig {
    /// What `add_nodes` / `add_edges` do when an id already exists
    pub on_duplicate: DuplicatePolicy,

    /// How `update_node` / `update_edge` apply properties
    pub update_mode: UpdateMode,

    /// Reject edges whose endpoints are not stored
    pub enforce_referential_integrity: bool,

    /// Upper bound on stored nodes (None = unbounded)
    pub max_nodes: Option<usize>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            on_duplicate: DuplicatePolicy::Reject,
            update_mode: UpdateMode::Merge,
            enforce_referential_integrity: false,
            max_nodes: None,
        }
    }
}

impl MemoryStoreConfig {
    /// Strict store: duplicates rejected, dangling edges refused
    pub fn strict() -> Self {
        Self {
            enforce_referential_integrity: true,
            ..Default::default()
        }
    }

    /// Last-writer-wins store: duplicates overwrite, updates replace
    pub fn last_writer_wins() -> Self {
        Self {
            on_duplicate: DuplicatePolicy::Overwrite,
            update_mode: UpdateMode::Replace,
            ..Default::default()
        }
    }

    /// Parse a plugin config mapping. `null` means defaults.
    pub fn from_value(config: &Value) -> Result<Self> {
        let parsed: Self = if config.is_null() {
            Self::default()
        } else {
            serde_json::from_value(config.clone())
                .map_err(|e| GraphError::configuration(e.to_string()))?
        };
        parsed.validate().map_err(GraphError::configuration)?;
        Ok(parsed)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_nodes == Some(0) {
            return Err("max_nodes must be > 0 when set".to_string());
        }
        Ok(())
    }
}

/// Insert behaviour on id collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the whole batch with a duplicate id error
    Reject,
    /// Replace the stored record, keeping its position
    Overwrite,
}

/// Property update behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Incoming keys are written over the stored map
    Merge,
    /// The stored map is replaced
    Replace,
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_contract::ErrorKind;
    use serde_json::json;

    #[test]
    fn null_config_means_defaults() {
        assert_eq!(
            MemoryStoreConfig::from_value(&Value::Null).unwrap(),
            MemoryStoreConfig::default()
        );
        assert_eq!(
            MemoryStoreConfig::from_value(&json!({})).unwrap(),
            MemoryStoreConfig::default()
        );
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = MemoryStoreConfig::from_value(&json!({"on_duplicate": "overwrite"})).unwrap();
        assert_eq!(config.on_duplicate, DuplicatePolicy::Overwrite);
        assert_eq!(config.update_mode, UpdateMode::Merge);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_configuration_errors() {
        for bad in [
            json!({"on_duplicat": "reject"}),
            json!({"update_mode": "append"}),
            json!({"max_nodes": 0}),
            json!({"max_nodes": -3}),
            json!("reject"),
        ] {
            let err = MemoryStoreConfig::from_value(&bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{bad}");
        }
    }
}
