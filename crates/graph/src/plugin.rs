use crate::context::GraphContext;
use crate::error::Result;
use crate::query::{GraphQuery, ImportSummary, MergeStrategy};
use crate::types::{GraphEdge, GraphNode, Properties, SourceRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a backend treats a mutation batch that is only partly acceptable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// The whole batch is validated first; any failure leaves the store untouched
    AllOrNothing,
    /// Acceptable records are written, the rest are reported or dropped
    BestEffort,
}

/// Capability set every graph storage backend implements.
///
/// Every method is required, so a backend that misses one is rejected when the
/// `impl` is compiled rather than on first use:
///
/// ```compile_fail
/// use graph_contract::GraphPlugin;
///
/// struct HalfBackend;
///
/// impl GraphPlugin for HalfBackend {
///     fn name(&self) -> &str {
///         "half"
///     }
///     fn version(&self) -> &str {
///         "0.0.1"
///     }
/// }
/// ```
///
/// Lifecycle methods take `&mut self`. Data methods take `&self` and may be
/// called from several threads; backends synchronise internally and guarantee
/// per-call atomicity only. `name`, `version`, `batch_policy`,
/// `is_initialized`, `get_config_schema`, `initialize` and `cleanup` are usable
/// at any time; every other method fails with
/// [`crate::GraphError::NotInitialized`] until `initialize` has succeeded.
///
/// "Not found" is never an error: single lookups return `Ok(None)` and searches
/// return an empty vector.
pub trait GraphPlugin: Send + Sync {
    /// Stable backend identifier
    fn name(&self) -> &str;

    /// Semantic version of the backend
    fn version(&self) -> &str;

    /// Partial-batch behaviour of `add_nodes`, `add_edges` and `import_graph`
    fn batch_policy(&self) -> BatchPolicy;

    /// Apply `config`. Fails with a configuration error on invalid input.
    fn initialize(&mut self, config: &Value) -> Result<()>;

    /// Release backend resources. Safe after a failed or missing `initialize`.
    fn cleanup(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// JSON schema describing the accepted configuration
    fn get_config_schema(&self) -> Value;

    /// Configuration currently in effect
    fn get_current_config(&self) -> Result<Value>;

    /// Insert nodes, returning the accepted ids in input order
    fn add_nodes(&self, nodes: Vec<GraphNode>) -> Result<Vec<String>>;

    /// Insert edges, returning the accepted ids in input order
    fn add_edges(&self, edges: Vec<GraphEdge>) -> Result<Vec<String>>;

    /// Merge or replace node properties. `Ok(false)` when `id` is unknown.
    fn update_node(&self, id: &str, properties: Properties) -> Result<bool>;

    /// Merge or replace edge properties. `Ok(false)` when `id` is unknown.
    fn update_edge(&self, id: &str, properties: Properties) -> Result<bool>;

    /// Remove nodes and, with `cascade`, every edge touching them.
    ///
    /// Returns how many nodes were actually removed. Without `cascade` the
    /// touching edges stay and dangle.
    fn delete_nodes(&self, ids: &[String], cascade: bool) -> Result<usize>;

    /// Returns how many edges were actually removed
    fn delete_edges(&self, ids: &[String]) -> Result<usize>;

    fn get_node(&self, id: &str) -> Result<Option<GraphNode>>;

    fn get_edge(&self, id: &str) -> Result<Option<GraphEdge>>;

    /// Subgraph reachable from `node_id` within `depth` hops.
    ///
    /// `depth == 0` is the node alone; `depth == 1` adds its direct neighbours
    /// and the edges connecting them to it. `filter_labels` restricts which
    /// neighbours are admitted.
    fn get_context(
        &self,
        node_id: &str,
        depth: usize,
        filter_labels: Option<&[String]>,
    ) -> Result<GraphContext>;

    /// Nodes whose sources contain a structurally equal `source`
    fn find_nodes_by_source(&self, source: &SourceRef) -> Result<Vec<GraphNode>>;

    /// Up to `limit` nodes carrying `label`, in an order stable across calls
    fn find_nodes_by_label(&self, label: &str, limit: usize) -> Result<Vec<GraphNode>>;

    /// Run a backend-native query and normalise the result
    fn execute(&self, query: &GraphQuery) -> Result<GraphContext>;

    /// Ingest `graph` under `strategy`
    fn import_graph(&self, graph: &GraphContext, strategy: MergeStrategy) -> Result<ImportSummary>;

    /// Whole graph, or the subset matching `filter`
    fn export_graph(&self, filter: Option<&GraphQuery>) -> Result<GraphContext>;

    /// Informational description of stored labels and relation types
    fn get_schema(&self) -> Result<Value>;
}

/// Owned, type-erased backend
pub type DynPlugin = Box<dyn GraphPlugin>;

/// Compile-time check that `P` satisfies the full capability set.
///
/// ```
/// # use graph_contract::{assert_plugin, DynPlugin};
/// fn bind<P: graph_contract::GraphPlugin + 'static>(plugin: P) -> DynPlugin {
///     assert_plugin::<P>();
///     Box::new(plugin)
/// }
/// ```
pub const fn assert_plugin<P: GraphPlugin + ?Sized>() {}

const _: () = assert_plugin::<dyn GraphPlugin>();
