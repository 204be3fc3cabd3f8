//! In-memory repository.

use super::{EdgeSelector, Page, Repository};
use crate::graph::SnapshotData;
use crate::{Edge, EngramError, Node, NodeId, NodeUpdate};
use std::collections::BTreeMap;

/// A `Repository` held entirely in memory.
///
/// Nodes are listed in id order; edges are returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node. Returns the previous node, if any.
    pub fn insert_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Insert an edge whose endpoints already exist.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), EngramError> {
        for endpoint in [&edge.from_node, &edge.to_node] {
            if !self.nodes.contains_key(endpoint) {
                return Err(EngramError::IntegrityViolation {
                    edge: edge.id.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Number of stored nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl TryFrom<SnapshotData> for MemoryRepository {
    type Error = EngramError;

    fn try_from(data: SnapshotData) -> Result<Self, Self::Error> {
        let mut repo = Self::new();
        for node in data.nodes {
            if let Some(previous) = repo.insert_node(node) {
                return Err(EngramError::DuplicateNode(previous.id));
            }
        }
        for edge in data.edges {
            repo.insert_edge(edge)?;
        }
        Ok(repo)
    }
}

impl Repository for MemoryRepository {
    fn list_nodes(&self, page: usize, limit: usize) -> Result<Page<Node>, EngramError> {
        Ok(Page::slice(
            self.nodes.values().cloned(),
            self.nodes.len(),
            page,
            limit,
        ))
    }

    fn edges_from(&self, selector: &EdgeSelector) -> Result<Vec<Edge>, EngramError> {
        Ok(self
            .edges
            .iter()
            .filter(|e| selector.matches(e))
            .cloned()
            .collect())
    }

    fn get_node(&self, id: &NodeId) -> Result<Option<Node>, EngramError> {
        Ok(self.nodes.get(id).cloned())
    }

    fn update_node(&mut self, id: &NodeId, update: &NodeUpdate) -> Result<Node, EngramError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| EngramError::NodeNotFound(id.clone()))?;
        update.apply_to(node);
        Ok(node.clone())
    }
}
