use crate::error::{GraphError, Result};
use crate::types::Properties;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Backend-interpreted query descriptor passed to `execute` and `export_graph`.
///
/// The meaning of `query` and `parameters` belongs to the backend; this type only
/// carries them. Keyword arguments of a call map onto `parameters`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQuery {
    pub query: String,
    #[serde(default)]
    pub parameters: Properties,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl GraphQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Conflict policy for `import_graph` when an incoming id already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Replace the stored record
    Overwrite,
    /// Keep the stored record, ignore the incoming one
    Skip,
    /// Union properties (incoming wins) and append unseen sources
    Merge,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Skip => "skip",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "merge" => Ok(Self::Merge),
            other => Err(GraphError::invalid_option(format!(
                "unknown merge strategy '{other}' (expected overwrite, skip or merge)"
            ))),
        }
    }
}

/// Counts reported by `import_graph`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub nodes_inserted: usize,
    pub nodes_updated: usize,
    pub nodes_skipped: usize,
    pub edges_inserted: usize,
    pub edges_updated: usize,
    pub edges_skipped: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.nodes_inserted
            + self.nodes_updated
            + self.nodes_skipped
            + self.edges_inserted
            + self.edges_updated
            + self.edges_skipped
    }

    /// Summary as a JSON mapping
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
