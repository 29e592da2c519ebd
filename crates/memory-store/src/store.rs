use graph_contract::{GraphContext, GraphEdge, GraphNode, GraphQuery, Properties, Result, SourceRef};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

#[derive(Debug)]
pub(crate) struct StoredNode {
    pub node: GraphNode,
    seq: u64,
}

#[derive(Debug)]
pub(crate) struct StoredEdge {
    pub edge: GraphEdge,
    seq: u64,
    /// Set while both endpoints are stored; `None` means the edge dangles
    link: Option<EdgeIndex>,
}

/// Node/edge storage behind the memory backend.
///
/// Nodes live in a stable petgraph so indices survive removals. Edge records are
/// kept by id; an edge is linked into the petgraph only while both endpoints
/// exist, and is linked again once a missing endpoint is (re)inserted.
/// Insertion sequence numbers give every listing a stable order.
#[derive(Debug, Default)]
pub(crate) struct GraphState {
    graph: StableDiGraph<StoredNode, String>,
    node_index: HashMap<String, NodeIndex>,
    edges: HashMap<String, StoredEdge>,
    next_seq: u64,
}

impl GraphState {
    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn dangling_edge_count(&self) -> usize {
        self.edges.values().filter(|e| e.link.is_none()).count()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&idx| &self.graph[idx].node)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.get(id).map(|stored| &stored.edge)
    }

    /// Insert or replace a node. A replaced node keeps its position.
    pub fn put_node(&mut self, node: GraphNode) {
        if let Some(&idx) = self.node_index.get(node.id()) {
            self.graph[idx].node = node;
            return;
        }

        let id = node.id().to_string();
        let seq = self.bump_seq();
        let idx = self.graph.add_node(StoredNode { node, seq });
        self.node_index.insert(id.clone(), idx);
        self.link_pending(&id);
    }

    /// Insert or replace an edge. A replaced edge keeps its position.
    pub fn put_edge(&mut self, edge: GraphEdge) {
        let seq = match self.edges.remove(edge.id()) {
            Some(old) => {
                if let Some(link) = old.link {
                    self.graph.remove_edge(link);
                }
                old.seq
            }
            None => self.bump_seq(),
        };

        let link = self.link_for(&edge);
        self.edges
            .insert(edge.id().to_string(), StoredEdge { edge, seq, link });
    }

    /// Remove a node. With `cascade`, every edge touching it goes too;
    /// otherwise those edges are unlinked and left dangling.
    pub fn remove_node(&mut self, id: &str, cascade: bool) -> bool {
        let Some(idx) = self.node_index.remove(id) else {
            return false;
        };

        let touching: Vec<String> = self
            .edges
            .values()
            .filter(|stored| stored.edge.touches(id))
            .map(|stored| stored.edge.id().to_string())
            .collect();

        for edge_id in touching {
            if cascade {
                self.remove_edge(&edge_id);
            } else if let Some(stored) = self.edges.get_mut(&edge_id) {
                if let Some(link) = stored.link.take() {
                    self.graph.remove_edge(link);
                }
            }
        }

        self.graph.remove_node(idx);
        true
    }

    pub fn remove_edge(&mut self, id: &str) -> bool {
        let Some(stored) = self.edges.remove(id) else {
            return false;
        };
        if let Some(link) = stored.link {
            self.graph.remove_edge(link);
        }
        true
    }

    pub fn replace_node_properties(&mut self, id: &str, properties: Properties, merge: bool) -> bool {
        let Some(&idx) = self.node_index.get(id) else {
            return false;
        };
        let slot = &mut self.graph[idx].node;
        *slot = if merge {
            slot.clone().with_properties(properties)
        } else {
            slot.replace_properties(properties)
        };
        true
    }

    pub fn replace_edge_properties(&mut self, id: &str, properties: Properties, merge: bool) -> bool {
        let Some(stored) = self.edges.get_mut(id) else {
            return false;
        };
        stored.edge = if merge {
            stored.edge.clone().with_properties(properties)
        } else {
            stored.edge.replace_properties(properties)
        };
        true
    }

    /// All nodes in insertion order
    pub fn nodes_in_order(&self) -> Vec<&GraphNode> {
        let mut stored: Vec<&StoredNode> = self
            .graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| &s.node).collect()
    }

    /// All edges, dangling ones included, in insertion order
    pub fn edges_in_order(&self) -> Vec<&GraphEdge> {
        let mut stored: Vec<&StoredEdge> = self.edges.values().collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| &s.edge).collect()
    }

    pub fn find_by_source(&self, source: &SourceRef) -> Vec<GraphNode> {
        self.nodes_in_order()
            .into_iter()
            .filter(|node| node.has_source(source))
            .cloned()
            .collect()
    }

    pub fn find_by_label(&self, label: &str, limit: usize) -> Vec<GraphNode> {
        self.nodes_in_order()
            .into_iter()
            .filter(|node| node.label() == label)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Breadth-first neighbourhood of `root`, ignoring edge direction.
    ///
    /// Nodes come out ordered by hop distance, then insertion order, so the
    /// root is always first. An edge is included when both endpoints are in
    /// the result and at least one of them is closer than `depth`.
    pub fn neighbourhood(
        &self,
        root: &str,
        depth: usize,
        filter_labels: Option<&[String]>,
    ) -> Result<GraphContext> {
        let Some(&start) = self.node_index.get(root) else {
            return Ok(GraphContext::empty());
        };

        let admits = |idx: NodeIndex| match filter_labels {
            Some(labels) => labels.iter().any(|l| l == self.graph[idx].node.label()),
            None => true,
        };

        let mut distance: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let hops = distance[&current];
            if hops >= depth {
                continue;
            }
            for neighbour in self.graph.neighbors_undirected(current) {
                if distance.contains_key(&neighbour) || !admits(neighbour) {
                    continue;
                }
                distance.insert(neighbour, hops + 1);
                queue.push_back(neighbour);
            }
        }

        let mut reached: Vec<(usize, u64, NodeIndex)> = distance
            .iter()
            .map(|(&idx, &hops)| (hops, self.graph[idx].seq, idx))
            .collect();
        reached.sort();
        let nodes = reached
            .iter()
            .map(|&(_, _, idx)| self.graph[idx].node.clone())
            .collect();

        let mut edge_ids: HashSet<&str> = HashSet::new();
        for (&idx, &hops) in &distance {
            if hops >= depth {
                continue;
            }
            let incident = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .chain(self.graph.edges_directed(idx, Direction::Incoming));
            for edge in incident {
                if distance.contains_key(&edge.source()) && distance.contains_key(&edge.target()) {
                    edge_ids.insert(edge.weight().as_str());
                }
            }
        }
        let edges = self.ordered_edges(edge_ids);

        Ok(GraphContext::new(nodes, edges)?
            .with_metadata("root", root)
            .with_metadata("depth", depth))
    }

    /// Nodes matching `query` plus the linked edges between them.
    ///
    /// `query.query` is a label, `""` or `"*"` for any label. Every parameter
    /// must equal the node property of the same name. `limit` caps nodes.
    pub fn select(&self, query: &GraphQuery) -> Result<GraphContext> {
        let label = query.query.trim();
        let any_label = label.is_empty() || label == "*";
        let limit = query.limit.unwrap_or(usize::MAX);

        let nodes: Vec<GraphNode> = self
            .nodes_in_order()
            .into_iter()
            .filter(|node| any_label || node.label() == label)
            .filter(|node| {
                query
                    .parameters
                    .iter()
                    .all(|(key, expected)| node.property(key) == Some(expected))
            })
            .take(limit)
            .cloned()
            .collect();

        let selected: HashSet<&str> = nodes.iter().map(GraphNode::id).collect();
        let edges: Vec<GraphEdge> = self
            .edges_in_order()
            .into_iter()
            .filter(|edge| {
                selected.contains(edge.source_id()) && selected.contains(edge.target_id())
            })
            .cloned()
            .collect();

        GraphContext::new(nodes, edges)
    }

    /// Every stored node and edge
    pub fn snapshot(&self) -> Result<GraphContext> {
        GraphContext::new(
            self.nodes_in_order().into_iter().cloned().collect(),
            self.edges_in_order().into_iter().cloned().collect(),
        )
    }

    pub fn schema(&self) -> Value {
        let mut labels: BTreeMap<&str, usize> = BTreeMap::new();
        for node in self.nodes_in_order() {
            *labels.entry(node.label()).or_default() += 1;
        }
        let mut relation_types: BTreeMap<&str, usize> = BTreeMap::new();
        for stored in self.edges.values() {
            *relation_types.entry(stored.edge.relation_type()).or_default() += 1;
        }

        json!({
            "labels": labels,
            "relation_types": relation_types,
            "node_count": self.node_count(),
            "edge_count": self.edge_count(),
            "dangling_edge_count": self.dangling_edge_count(),
        })
    }

    fn ordered_edges(&self, ids: HashSet<&str>) -> Vec<GraphEdge> {
        let mut stored: Vec<&StoredEdge> = ids.into_iter().filter_map(|id| self.edges.get(id)).collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| s.edge.clone()).collect()
    }

    fn link_for(&mut self, edge: &GraphEdge) -> Option<EdgeIndex> {
        let from = *self.node_index.get(edge.source_id())?;
        let to = *self.node_index.get(edge.target_id())?;
        Some(self.graph.add_edge(from, to, edge.id().to_string()))
    }

    /// Link dangling edges that touch `node_id` and now have both endpoints
    fn link_pending(&mut self, node_id: &str) {
        let pending: Vec<String> = self
            .edges
            .values()
            .filter(|stored| stored.link.is_none() && stored.edge.touches(node_id))
            .map(|stored| stored.edge.id().to_string())
            .collect();

        for edge_id in pending {
            let Some(edge) = self.edges.get(&edge_id).map(|s| s.edge.clone()) else {
                continue;
            };
            let link = self.link_for(&edge);
            if let (Some(link), Some(stored)) = (link, self.edges.get_mut(&edge_id)) {
                stored.link = Some(link);
                log::debug!("Linked previously dangling edge {edge_id}");
            }
        }
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}
