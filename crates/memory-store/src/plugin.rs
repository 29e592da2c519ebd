use crate::config::{DuplicatePolicy, MemoryStoreConfig, UpdateMode};
use crate::store::GraphState;
use graph_contract::{
    BatchPolicy, GraphContext, GraphEdge, GraphError, GraphNode, GraphPlugin, GraphQuery,
    ImportSummary, MergeStrategy, Properties, RecordKind, Result, SourceRef, Value,
};
use std::collections::HashSet;
use std::sync::RwLock;

pub const PLUGIN_NAME: &str = "memory-graph-store";

struct Inner {
    config: MemoryStoreConfig,
    state: GraphState,
}

/// In-memory [`GraphPlugin`] backend.
///
/// Batches are all-or-nothing: `add_nodes`, `add_edges` and `import_graph`
/// validate the whole input before writing anything. Concurrent callers are
/// serialised by a read/write lock; the last writer wins.
pub struct MemoryGraphStore {
    inner: RwLock<Option<Inner>>,
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraphStore {
    /// Uninitialised store; call [`GraphPlugin::initialize`] before use
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Store initialised with `config`
    pub fn with_config(config: MemoryStoreConfig) -> Result<Self> {
        config.validate().map_err(GraphError::configuration)?;
        Ok(Self {
            inner: RwLock::new(Some(Inner {
                config,
                state: GraphState::default(),
            })),
        })
    }

    fn with_inner<T>(&self, f: impl FnOnce(&Inner) -> Result<T>) -> Result<T> {
        let guard = self.inner.read().map_err(|_| poisoned())?;
        let inner = guard
            .as_ref()
            .ok_or_else(|| GraphError::not_initialized(PLUGIN_NAME))?;
        f(inner)
    }

    fn with_inner_mut<T>(&self, f: impl FnOnce(&mut Inner) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        let inner = guard
            .as_mut()
            .ok_or_else(|| GraphError::not_initialized(PLUGIN_NAME))?;
        f(inner)
    }
}

fn poisoned() -> GraphError {
    GraphError::backend("memory store lock poisoned")
}

fn ensure_batch_unique<'a>(ids: impl Iterator<Item = &'a str>, kind: RecordKind) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(GraphError::duplicate_id(kind, id));
        }
    }
    Ok(())
}

fn ensure_capacity(config: &MemoryStoreConfig, state: &GraphState, incoming: usize) -> Result<()> {
    if let Some(max) = config.max_nodes {
        if state.node_count() + incoming > max {
            return Err(GraphError::backend(format!(
                "node limit {max} exceeded ({} stored, {incoming} new)",
                state.node_count()
            )));
        }
    }
    Ok(())
}

/// Every edge endpoint must be stored already or arrive in `incoming`
fn ensure_endpoints<'a>(
    state: &GraphState,
    edges: impl Iterator<Item = &'a GraphEdge>,
    incoming: &HashSet<&str>,
) -> Result<()> {
    for edge in edges {
        for endpoint in [edge.source_id(), edge.target_id()] {
            if !state.contains_node(endpoint) && !incoming.contains(endpoint) {
                return Err(GraphError::UnknownNode {
                    edge_id: edge.id().to_string(),
                    node_id: endpoint.to_string(),
                });
            }
        }
    }
    Ok(())
}

impl GraphPlugin for MemoryGraphStore {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::AllOrNothing
    }

    fn initialize(&mut self, config: &Value) -> Result<()> {
        let config = MemoryStoreConfig::from_value(config)?;
        let slot = self.inner.get_mut().map_err(|_| poisoned())?;
        if let Some(inner) = slot.as_mut() {
            log::debug!("Reconfiguring {PLUGIN_NAME}, keeping stored graph");
            inner.config = config;
            return Ok(());
        }
        *slot = Some(Inner {
            config,
            state: GraphState::default(),
        });
        log::info!("Initialized {PLUGIN_NAME}");
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        let slot = match self.inner.get_mut() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.take().is_some() {
            log::info!("Released {PLUGIN_NAME}");
        }
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.read().map(|g| g.is_some()).unwrap_or(false)
    }

    fn get_config_schema(&self) -> Value {
        let schema = schemars::schema_for!(MemoryStoreConfig);
        serde_json::to_value(&schema).unwrap_or_else(|err| {
            log::warn!("Failed to serialize config schema: {err}");
            Value::Null
        })
    }

    fn get_current_config(&self) -> Result<Value> {
        self.with_inner(|inner| {
            serde_json::to_value(&inner.config).map_err(|e| GraphError::backend(e.to_string()))
        })
    }

    fn add_nodes(&self, nodes: Vec<GraphNode>) -> Result<Vec<String>> {
        self.with_inner_mut(|inner| {
            ensure_batch_unique(nodes.iter().map(GraphNode::id), RecordKind::Node)?;
            if inner.config.on_duplicate == DuplicatePolicy::Reject {
                if let Some(existing) = nodes.iter().find(|n| inner.state.contains_node(n.id())) {
                    return Err(GraphError::duplicate_id(RecordKind::Node, existing.id()));
                }
            }
            let new = nodes
                .iter()
                .filter(|n| !inner.state.contains_node(n.id()))
                .count();
            ensure_capacity(&inner.config, &inner.state, new)?;

            let ids: Vec<String> = nodes.iter().map(|n| n.id().to_string()).collect();
            for node in nodes {
                inner.state.put_node(node);
            }
            log::debug!("Added {} nodes", ids.len());
            Ok(ids)
        })
    }

    fn add_edges(&self, edges: Vec<GraphEdge>) -> Result<Vec<String>> {
        self.with_inner_mut(|inner| {
            ensure_batch_unique(edges.iter().map(GraphEdge::id), RecordKind::Edge)?;
            if inner.config.on_duplicate == DuplicatePolicy::Reject {
                if let Some(existing) = edges.iter().find(|e| inner.state.contains_edge(e.id())) {
                    return Err(GraphError::duplicate_id(RecordKind::Edge, existing.id()));
                }
            }
            if inner.config.enforce_referential_integrity {
                ensure_endpoints(&inner.state, edges.iter(), &HashSet::new())?;
            }

            let ids: Vec<String> = edges.iter().map(|e| e.id().to_string()).collect();
            for edge in edges {
                inner.state.put_edge(edge);
            }
            log::debug!("Added {} edges", ids.len());
            Ok(ids)
        })
    }

    fn update_node(&self, id: &str, properties: Properties) -> Result<bool> {
        self.with_inner_mut(|inner| {
            let merge = inner.config.update_mode == UpdateMode::Merge;
            Ok(inner.state.replace_node_properties(id, properties, merge))
        })
    }

    fn update_edge(&self, id: &str, properties: Properties) -> Result<bool> {
        self.with_inner_mut(|inner| {
            let merge = inner.config.update_mode == UpdateMode::Merge;
            Ok(inner.state.replace_edge_properties(id, properties, merge))
        })
    }

    fn delete_nodes(&self, ids: &[String], cascade: bool) -> Result<usize> {
        self.with_inner_mut(|inner| {
            let removed = ids
                .iter()
                .filter(|id| inner.state.remove_node(id, cascade))
                .count();
            Ok(removed)
        })
    }

    fn delete_edges(&self, ids: &[String]) -> Result<usize> {
        self.with_inner_mut(|inner| {
            Ok(ids.iter().filter(|id| inner.state.remove_edge(id)).count())
        })
    }

    fn get_node(&self, id: &str) -> Result<Option<GraphNode>> {
        self.with_inner(|inner| Ok(inner.state.node(id).cloned()))
    }

    fn get_edge(&self, id: &str) -> Result<Option<GraphEdge>> {
        self.with_inner(|inner| Ok(inner.state.edge(id).cloned()))
    }

    fn get_context(
        &self,
        node_id: &str,
        depth: usize,
        filter_labels: Option<&[String]>,
    ) -> Result<GraphContext> {
        self.with_inner(|inner| inner.state.neighbourhood(node_id, depth, filter_labels))
    }

    fn find_nodes_by_source(&self, source: &SourceRef) -> Result<Vec<GraphNode>> {
        self.with_inner(|inner| Ok(inner.state.find_by_source(source)))
    }

    fn find_nodes_by_label(&self, label: &str, limit: usize) -> Result<Vec<GraphNode>> {
        self.with_inner(|inner| Ok(inner.state.find_by_label(label, limit)))
    }

    fn execute(&self, query: &GraphQuery) -> Result<GraphContext> {
        self.with_inner(|inner| {
            let ctx = inner.state.select(query)?;
            Ok(ctx.with_metadata(
                "query",
                serde_json::to_value(query).map_err(|e| GraphError::backend(e.to_string()))?,
            ))
        })
    }

    fn import_graph(&self, graph: &GraphContext, strategy: MergeStrategy) -> Result<ImportSummary> {
        self.with_inner_mut(|inner| {
            if inner.config.enforce_referential_integrity {
                let incoming: HashSet<&str> = graph.nodes().iter().map(GraphNode::id).collect();
                ensure_endpoints(&inner.state, graph.edges().iter(), &incoming)?;
            }
            let new = graph
                .nodes()
                .iter()
                .filter(|n| !inner.state.contains_node(n.id()))
                .count();
            ensure_capacity(&inner.config, &inner.state, new)?;

            let mut summary = ImportSummary::default();
            for node in graph.nodes() {
                let existing = inner.state.node(node.id()).cloned();
                match (existing, strategy) {
                    (None, _) => {
                        inner.state.put_node(node.clone());
                        summary.nodes_inserted += 1;
                    }
                    (Some(_), MergeStrategy::Skip) => summary.nodes_skipped += 1,
                    (Some(_), MergeStrategy::Overwrite) => {
                        inner.state.put_node(node.clone());
                        summary.nodes_updated += 1;
                    }
                    (Some(existing), MergeStrategy::Merge) => {
                        let merged = existing.merged_with(node);
                        inner.state.put_node(merged);
                        summary.nodes_updated += 1;
                    }
                }
            }
            for edge in graph.edges() {
                let existing = inner.state.edge(edge.id()).cloned();
                match (existing, strategy) {
                    (None, _) => {
                        inner.state.put_edge(edge.clone());
                        summary.edges_inserted += 1;
                    }
                    (Some(_), MergeStrategy::Skip) => summary.edges_skipped += 1,
                    (Some(_), MergeStrategy::Overwrite) => {
                        inner.state.put_edge(edge.clone());
                        summary.edges_updated += 1;
                    }
                    (Some(existing), MergeStrategy::Merge) => {
                        let merged = existing.merged_with(edge);
                        inner.state.put_edge(merged);
                        summary.edges_updated += 1;
                    }
                }
            }

            log::info!(
                "Imported graph with strategy {strategy}: {} nodes inserted, {} updated, {} skipped",
                summary.nodes_inserted,
                summary.nodes_updated,
                summary.nodes_skipped
            );
            Ok(summary)
        })
    }

    fn export_graph(&self, filter: Option<&GraphQuery>) -> Result<GraphContext> {
        self.with_inner(|inner| {
            let ctx = match filter {
                Some(query) => inner.state.select(query)?,
                None => inner.state.snapshot()?,
            };
            Ok(ctx
                .with_metadata("plugin", PLUGIN_NAME)
                .with_metadata("version", env!("CARGO_PKG_VERSION")))
        })
    }

    fn get_schema(&self) -> Result<Value> {
        self.with_inner(|inner| Ok(inner.state.schema()))
    }
}
