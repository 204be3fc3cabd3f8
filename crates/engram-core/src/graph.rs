//! # Graph Snapshot
//!
//! The in-memory, read-only view of the knowledge graph that every
//! algorithm runs over.
//!
//! A snapshot is validated once, when it is built: every edge endpoint must
//! name a node of the same snapshot, ids must be unique, and numeric fields
//! are clamped into range. After that the adjacency lists are shared by
//! reference with the reasoning engine, the query optimizer and the
//! consolidation engine, and never regrouped per call.
//!
//! Adjacency lists keep edges in the order they were supplied. Traversals
//! visit them in that order, which is what makes tie-breaking reproducible.

use crate::storage::{EdgeSelector, Repository};
use crate::{Edge, EdgeId, EngramError, Node, NodeId, primitives};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Nodes by id plus edges grouped by source and by target.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    /// Node storage: NodeId -> Node
    nodes: BTreeMap<NodeId, Node>,

    /// All edges in supply order.
    edges: Vec<Edge>,

    /// Edge id -> position in `edges`
    edge_index: BTreeMap<EdgeId, usize>,

    /// Adjacency list: from_node -> positions in `edges`
    outgoing: BTreeMap<NodeId, Vec<usize>>,

    /// Reverse adjacency: to_node -> positions in `edges`
    incoming: BTreeMap<NodeId, Vec<usize>>,
}

impl GraphSnapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a validated snapshot.
    ///
    /// # Errors
    ///
    /// - `DuplicateNode` / `DuplicateEdge` if an id repeats
    /// - `IntegrityViolation` if an edge endpoint is not among `nodes`
    pub fn build(
        nodes: impl IntoIterator<Item = Node>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Self, EngramError> {
        let mut snapshot = Self::new();

        for mut node in nodes {
            if snapshot.nodes.contains_key(&node.id) {
                return Err(EngramError::DuplicateNode(node.id));
            }
            if node.clamp_fields() {
                tracing::debug!(node = %node.id, "clamped out-of-range node fields");
            }
            snapshot.nodes.insert(node.id.clone(), node);
        }

        for mut edge in edges {
            if snapshot.edge_index.contains_key(&edge.id) {
                return Err(EngramError::DuplicateEdge(edge.id));
            }
            for endpoint in [&edge.from_node, &edge.to_node] {
                if !snapshot.nodes.contains_key(endpoint) {
                    return Err(EngramError::IntegrityViolation {
                        edge: edge.id.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
            if edge.clamp_fields() {
                tracing::debug!(edge = %edge.id, "clamped out-of-range edge fields");
            }

            let position = snapshot.edges.len();
            snapshot.edge_index.insert(edge.id.clone(), position);
            snapshot
                .outgoing
                .entry(edge.from_node.clone())
                .or_default()
                .push(position);
            snapshot
                .incoming
                .entry(edge.to_node.clone())
                .or_default()
                .push(position);
            snapshot.edges.push(edge);
        }

        tracing::debug!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "snapshot built"
        );
        Ok(snapshot)
    }

    /// Load a full snapshot from a repository, page by page.
    ///
    /// Nodes come from `list_nodes` until `has_more` is false; edges come
    /// from a single wildcard `edges_from` call.
    pub fn load(repository: &impl Repository, page_size: usize) -> Result<Self, EngramError> {
        let limit = page_size.max(1);
        let mut nodes = Vec::new();
        let mut page = 1;

        loop {
            let batch = repository.list_nodes(page, limit)?;
            nodes.extend(batch.items);
            if !batch.has_more {
                break;
            }
            page = page.saturating_add(1);
        }

        let edges = repository.edges_from(&EdgeSelector::All)?;
        Self::build(nodes, edges)
    }

    /// Load with the default page size.
    pub fn load_all(repository: &impl Repository) -> Result<Self, EngramError> {
        Self::load(repository, primitives::DEFAULT_PAGE_SIZE)
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Check if the snapshot contains a node.
    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Resolve a node's name, or the placeholder for unknown ids.
    #[must_use]
    pub fn name_of(&self, id: &NodeId) -> &str {
        self.nodes
            .get(id)
            .map_or(primitives::UNKNOWN_NAME, |n| n.name.as_str())
    }

    /// Look up an edge.
    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edge_index.get(id).map(|&i| &self.edges[i])
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges in supply order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Edges leaving `id`, in adjacency-list order.
    pub fn outgoing(&self, id: &NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing
            .get(id)
            .into_iter()
            .flat_map(|positions| positions.iter().map(|&i| &self.edges[i]))
    }

    /// Edges arriving at `id`, in adjacency-list order.
    pub fn incoming(&self, id: &NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.incoming
            .get(id)
            .into_iter()
            .flat_map(|positions| positions.iter().map(|&i| &self.edges[i]))
    }

    /// Get the total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of a snapshot, for import/export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl From<&GraphSnapshot> for SnapshotData {
    fn from(snapshot: &GraphSnapshot) -> Self {
        Self {
            nodes: snapshot.nodes().cloned().collect(),
            edges: snapshot.edges().cloned().collect(),
        }
    }
}

impl TryFrom<SnapshotData> for GraphSnapshot {
    type Error = EngramError;

    fn try_from(data: SnapshotData) -> Result<Self, Self::Error> {
        Self::build(data.nodes, data.edges)
    }
}

// =============================================================================
// TESTS
// =============================================================================
