//! # Graph Memory Store
//!
//! Reference [`graph_contract::GraphPlugin`] backend that keeps the whole graph
//! in process memory.
//!
//! ## Behaviour
//!
//! - **Batches** are all-or-nothing; duplicates inside a batch always fail
//! - **Duplicates** against stored ids follow [`DuplicatePolicy`]
//! - **Updates** merge or replace properties per [`UpdateMode`]
//! - **Edges** may reference missing nodes unless referential integrity is
//!   enforced; such edges dangle until both endpoints exist
//! - **Ordering** of every listing is insertion order
//! - **Queries** (`execute`, filtered `export_graph`): `query` is a label
//!   (`""`/`"*"` for any), `parameters` are property equality filters
//!
//! ## Example
//!
//! ```rust
//! use graph_contract::{GraphNode, GraphPlugin};
//! use graph_memory_store::MemoryGraphStore;
//!
//! let mut store = MemoryGraphStore::new();
//! store.initialize(&serde_json::json!({"on_duplicate": "reject"}))?;
//! store.add_nodes(vec![GraphNode::new("a", "Person")?])?;
//! assert_eq!(store.find_nodes_by_label("Person", 10)?.len(), 1);
//! store.cleanup()?;
//! # Ok::<(), graph_contract::GraphError>(())
//! ```

mod config;
mod plugin;
mod store;

pub use config::{DuplicatePolicy, MemoryStoreConfig, UpdateMode};
pub use plugin::{MemoryGraphStore, PLUGIN_NAME};

const _: () = graph_contract::assert_plugin::<MemoryGraphStore>();
