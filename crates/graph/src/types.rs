use crate::error::{GraphError, RecordKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-compatible property bag attached to nodes and edges.
///
/// Keys are unique and kept sorted, so two equal maps always serialize to the
/// same bytes.
pub type Properties = serde_json::Map<String, Value>;

/// Free-form metadata carried by a [`crate::GraphContext`]
pub type Metadata = serde_json::Map<String, Value>;

/// Provenance pointer to the datum that justified a node or edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    plugin_name: String,
    table_name: String,
    row_id: String,
    segment_slice: String,
}

impl SourceRef {
    pub fn new(
        plugin_name: impl Into<String>,
        table_name: impl Into<String>,
        row_id: impl Into<String>,
        segment_slice: impl Into<String>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            table_name: table_name.into(),
            row_id: row_id.into(),
            segment_slice: segment_slice.into(),
        }
    }

    /// Producing plugin
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Logical collection inside the producing plugin
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn row_id(&self) -> &str {
        &self.row_id
    }

    /// Sub-locator inside the row (timestamp range, byte range, ...)
    pub fn segment_slice(&self) -> &str {
        &self.segment_slice
    }
}

/// Graph vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord")]
pub struct GraphNode {
    id: String,
    label: String,
    properties: Properties,
    sources: Vec<SourceRef>,
}

#[derive(Deserialize)]
struct NodeRecord {
    id: String,
    label: String,
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    sources: Vec<SourceRef>,
}

impl TryFrom<NodeRecord> for GraphNode {
    type Error = GraphError;

    fn try_from(record: NodeRecord) -> Result<Self> {
        Ok(GraphNode::new(record.id, record.label)?
            .with_properties(record.properties)
            .with_sources(record.sources))
    }
}

impl GraphNode {
    /// Create a node with no properties and no sources.
    ///
    /// Fails when `id` or `label` is empty.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let label = label.into();
        if id.is_empty() {
            return Err(GraphError::invalid_record(
                RecordKind::Node,
                "id must not be empty",
            ));
        }
        if label.is_empty() {
            return Err(GraphError::invalid_record(
                RecordKind::Node,
                format!("label of node {id} must not be empty"),
            ));
        }
        Ok(Self {
            id,
            label,
            properties: Properties::new(),
            sources: Vec::new(),
        })
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Extend properties; incoming keys win
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = SourceRef>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn sources(&self) -> &[SourceRef] {
        &self.sources
    }

    /// True when `source` is structurally equal to one of this node's sources
    pub fn has_source(&self, source: &SourceRef) -> bool {
        self.sources.iter().any(|s| s == source)
    }

    /// Human readable name: the `key` property, falling back to the id
    pub fn display_name(&self, key: &str) -> String {
        match self.properties.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Null) | Some(Value::String(_)) | None => self.id.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Copy of this node with `properties` replacing the current map
    pub fn replace_properties(&self, properties: Properties) -> Self {
        Self {
            properties,
            ..self.clone()
        }
    }

    /// Copy of this node with `incoming` merged in.
    ///
    /// Incoming properties win on key collision; sources not yet present are
    /// appended in order.
    pub fn merged_with(&self, incoming: &GraphNode) -> Self {
        let mut merged = self.clone();
        merged.properties.extend(incoming.properties.clone());
        for source in &incoming.sources {
            if !merged.has_source(source) {
                merged.sources.push(source.clone());
            }
        }
        merged
    }
}

/// Directed relationship `source_id -> target_id`.
///
/// Endpoints are not checked against any node set here; self-loops are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EdgeRecord")]
pub struct GraphEdge {
    id: String,
    source_id: String,
    target_id: String,
    relation_type: String,
    properties: Properties,
}

#[derive(Deserialize)]
struct EdgeRecord {
    id: String,
    source_id: String,
    target_id: String,
    relation_type: String,
    #[serde(default)]
    properties: Properties,
}

impl TryFrom<EdgeRecord> for GraphEdge {
    type Error = GraphError;

    fn try_from(record: EdgeRecord) -> Result<Self> {
        Ok(GraphEdge::new(
            record.id,
            record.source_id,
            record.target_id,
            record.relation_type,
        )?
        .with_properties(record.properties))
    }
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Result<Self> {
        let edge = Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: relation_type.into(),
            properties: Properties::new(),
        };

        let missing = if edge.id.is_empty() {
            Some("id")
        } else if edge.source_id.is_empty() {
            Some("source_id")
        } else if edge.target_id.is_empty() {
            Some("target_id")
        } else if edge.relation_type.is_empty() {
            Some("relation_type")
        } else {
            None
        };
        if let Some(field) = missing {
            return Err(GraphError::invalid_record(
                RecordKind::Edge,
                format!("{field} of edge '{}' must not be empty", edge.id),
            ));
        }

        Ok(edge)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn relation_type(&self) -> &str {
        &self.relation_type
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// True when either endpoint is `node_id`
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }

    pub fn replace_properties(&self, properties: Properties) -> Self {
        Self {
            properties,
            ..self.clone()
        }
    }

    /// Copy of this edge with `incoming` properties merged in (incoming wins)
    pub fn merged_with(&self, incoming: &GraphEdge) -> Self {
        let mut merged = self.clone();
        merged.properties.extend(incoming.properties.clone());
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn source() -> SourceRef {
        SourceRef::new("transcriber", "transcriptions", "row-1", "timestamp:00:10-00:20")
    }

    #[test]
    fn empty_id_or_label_is_rejected() {
        assert_eq!(
            GraphNode::new("", "Person").unwrap_err().kind(),
            ErrorKind::InvalidRecord
        );
        assert_eq!(
            GraphNode::new("n1", "").unwrap_err().kind(),
            ErrorKind::InvalidRecord
        );
        assert_eq!(
            GraphEdge::new("e1", "a", "b", "").unwrap_err().kind(),
            ErrorKind::InvalidRecord
        );
        assert_eq!(
            GraphEdge::new("e1", "", "b", "REL").unwrap_err().kind(),
            ErrorKind::InvalidRecord
        );
    }

    #[test]
    fn self_loops_are_allowed() {
        let edge = GraphEdge::new("e1", "a", "a", "REFERS_TO").unwrap();
        assert!(edge.is_self_loop());
        assert!(edge.touches("a"));
    }

    #[test]
    fn source_equality_is_structural() {
        let node = GraphNode::new("n1", "Person").unwrap().with_source(source());
        assert!(node.has_source(&source()));
        let other = SourceRef::new("transcriber", "transcriptions", "row-1", "timestamp:00:20-00:30");
        assert!(!node.has_source(&other));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let named = GraphNode::new("n1", "Person")
            .unwrap()
            .with_property("name", "Sun Tzu");
        assert_eq!(named.display_name("name"), "Sun Tzu");

        let unnamed = GraphNode::new("n2", "Person").unwrap();
        assert_eq!(unnamed.display_name("name"), "n2");

        let numeric = GraphNode::new("n3", "Year").unwrap().with_property("name", 512);
        assert_eq!(numeric.display_name("name"), "512");
    }

    #[test]
    fn node_serializes_every_key() {
        let node = GraphNode::new("n1", "Concept").unwrap();
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({"id": "n1", "label": "Concept", "properties": {}, "sources": []})
        );
    }

    #[test]
    fn node_missing_optional_fields_defaults_to_empty() {
        let node: GraphNode = serde_json::from_value(json!({"id": "n1", "label": "Concept"})).unwrap();
        assert!(node.properties().is_empty());
        assert!(node.sources().is_empty());
    }

    #[test]
    fn node_with_empty_label_fails_to_deserialize() {
        let result: std::result::Result<GraphNode, _> =
            serde_json::from_value(json!({"id": "n1", "label": ""}));
        assert!(result.is_err());
    }

    #[test]
    fn merged_with_unions_properties_and_sources() {
        let base = GraphNode::new("n1", "Person")
            .unwrap()
            .with_property("name", "Sun Tzu")
            .with_property("era", "Ancient China")
            .with_source(source());
        let other_source = SourceRef::new("ocr", "pages", "row-9", "bytes:0-120");
        let incoming = GraphNode::new("n1", "Person")
            .unwrap()
            .with_property("era", "Spring and Autumn")
            .with_source(source())
            .with_source(other_source.clone());

        let merged = base.merged_with(&incoming);
        assert_eq!(merged.property("name"), Some(&json!("Sun Tzu")));
        assert_eq!(merged.property("era"), Some(&json!("Spring and Autumn")));
        assert_eq!(merged.sources(), &[source(), other_source]);
    }
}
