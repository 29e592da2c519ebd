//! # Graph Contract
//!
//! Plugin-agnostic graph data contract: value types for nodes, edges and
//! provenance, a stable JSON transfer format, the capability set every storage
//! backend implements, and a Mermaid projection for documentation.
//!
//! ## Architecture
//!
//! ```text
//! Producer (extraction pipeline, importer, ...)
//!     │
//!     ├──> SourceRef / GraphNode / GraphEdge   (validated value objects)
//!     │
//!     ├──> GraphContext                         (ordered bundle + metadata)
//!     │      ├─ to_bytes / from_bytes
//!     │      ├─ write_to / from_file
//!     │      └─ to_temp_file / with_temp_file   (hand-off by path)
//!     │
//!     ├──> dyn GraphPlugin                      (any backend)
//!     │      ├─ add_* / update_* / delete_*
//!     │      ├─ get_node / get_edge / get_context
//!     │      ├─ find_nodes_by_source / find_nodes_by_label
//!     │      └─ execute / import_graph / export_graph
//!     │
//!     └──> mermaid::render                      (GraphContext -> diagram text)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use graph_contract::{mermaid, GraphContext, GraphEdge, GraphNode, SourceRef};
//!
//! let source = SourceRef::new("transcriber", "transcriptions", "row-1", "timestamp:00:10-00:20");
//! let author = GraphNode::new("a", "Person")?
//!     .with_property("name", "Sun Tzu")
//!     .with_source(source);
//! let book = GraphNode::new("b", "Concept")?.with_property("name", "The Art of War");
//! let edge = GraphEdge::new("e", "a", "b", "AUTHORED")?;
//!
//! let ctx = GraphContext::new(vec![author, book], vec![edge])?;
//! let copy = GraphContext::from_bytes(&ctx.to_bytes()?)?;
//! assert_eq!(copy, ctx);
//!
//! let diagram = mermaid::context_to_mermaid(&ctx, "LR", None)?;
//! assert!(diagram.contains("-->|AUTHORED|"));
//! # Ok::<(), graph_contract::GraphError>(())
//! ```

mod context;
mod error;
pub mod mermaid;
mod plugin;
mod query;
mod transfer;
mod types;

pub use context::GraphContext;
pub use error::{ErrorKind, GraphError, RecordKind, Result};
pub use mermaid::{FlowDirection, MermaidOptions};
pub use plugin::{assert_plugin, BatchPolicy, DynPlugin, GraphPlugin};
pub use query::{GraphQuery, ImportSummary, MergeStrategy};
pub use transfer::TransferFile;
pub use types::{GraphEdge, GraphNode, Metadata, Properties, SourceRef};

pub use serde_json::Value;
