use crate::error::{GraphError, RecordKind, Result};
use crate::types::{GraphEdge, GraphNode, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Order-preserving bundle of nodes, edges and metadata.
///
/// This is the unit handed to and returned by [`crate::GraphPlugin`] methods and
/// the unit of cross-process transfer (see the `transfer` module). Node and edge
/// ids are unique within their sequence. Consumers may rely on order, e.g. the
/// first node of a `get_context` result is the requested root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ContextRecord")]
pub struct GraphContext {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    metadata: Metadata,
}

#[derive(Deserialize)]
struct ContextRecord {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(default)]
    metadata: Metadata,
}

impl TryFrom<ContextRecord> for GraphContext {
    type Error = GraphError;

    fn try_from(record: ContextRecord) -> Result<Self> {
        Ok(GraphContext::new(record.nodes, record.edges)?.with_metadata_map(record.metadata))
    }
}

impl GraphContext {
    /// Bundle `nodes` and `edges`, rejecting duplicate ids in either sequence
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Result<Self> {
        ensure_unique(nodes.iter().map(GraphNode::id), RecordKind::Node)?;
        ensure_unique(edges.iter().map(GraphEdge::id), RecordKind::Edge)?;
        Ok(Self {
            nodes,
            edges,
            metadata: Metadata::new(),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id() == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Distinct node labels in first-seen order
    pub fn labels(&self) -> Vec<&str> {
        first_seen(self.nodes.iter().map(GraphNode::label))
    }

    /// Distinct relation types in first-seen order
    pub fn relation_types(&self) -> Vec<&str> {
        first_seen(self.edges.iter().map(GraphEdge::relation_type))
    }

    pub fn into_parts(self) -> (Vec<GraphNode>, Vec<GraphEdge>, Metadata) {
        (self.nodes, self.edges, self.metadata)
    }
}

fn ensure_unique<'a>(ids: impl Iterator<Item = &'a str>, kind: RecordKind) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(GraphError::duplicate_id(kind, id));
        }
    }
    Ok(())
}

fn first_seen<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(*item)).collect()
}
