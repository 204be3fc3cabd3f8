//! # redb-backed Repository
//!
//! A disk-backed `Repository` using the redb embedded database.
//!
//! Nodes and edges are stored as postcard-encoded values keyed by id, so
//! listings come back in id order. Durability is whatever redb provides;
//! the core does not depend on it.

use super::{EdgeSelector, Page, Repository};
use crate::graph::{GraphSnapshot, SnapshotData};
use crate::{Edge, EngramError, Node, NodeId, NodeUpdate};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for nodes: node id -> postcard Node bytes
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Table for edges: edge id -> postcard Edge bytes
const EDGES: TableDefinition<&str, &[u8]> = TableDefinition::new("edges");

fn io_err(e: impl std::fmt::Display) -> EngramError {
    EngramError::IoError(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, EngramError> {
    postcard::to_allocvec(value).map_err(|e| EngramError::SerializationError(e.to_string()))
}

fn decode<'a, T: serde::Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, EngramError> {
    postcard::from_bytes(bytes).map_err(|e| EngramError::DeserializationError(e.to_string()))
}

/// A repository persisted in a redb database file.
pub struct RedbRepository {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRepository").finish_non_exhaustive()
    }
}

impl RedbRepository {
    /// Open or create a repository at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngramError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(NODES).map_err(io_err)?;
            let _ = write_txn.open_table(EDGES).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Insert or replace a node.
    pub fn insert_node(&mut self, node: &Node) -> Result<(), EngramError> {
        let bytes = encode(node)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(NODES).map_err(io_err)?;
            table
                .insert(node.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    /// Insert or replace an edge. Both endpoints must already be stored.
    pub fn insert_edge(&mut self, edge: &Edge) -> Result<(), EngramError> {
        let bytes = encode(edge)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let nodes = write_txn.open_table(NODES).map_err(io_err)?;
            for endpoint in [&edge.from_node, &edge.to_node] {
                if nodes.get(endpoint.as_str()).map_err(io_err)?.is_none() {
                    return Err(EngramError::IntegrityViolation {
                        edge: edge.id.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
            let mut table = write_txn.open_table(EDGES).map_err(io_err)?;
            table
                .insert(edge.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    /// Replace the whole store with `data` in one transaction.
    ///
    /// The data is validated as a snapshot first; nothing is written if it
    /// is not a valid graph.
    pub fn replace_all(&mut self, data: &SnapshotData) -> Result<(), EngramError> {
        GraphSnapshot::build(data.nodes.iter().cloned(), data.edges.iter().cloned())?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        write_txn.delete_table(NODES).map_err(io_err)?;
        write_txn.delete_table(EDGES).map_err(io_err)?;
        {
            let mut nodes = write_txn.open_table(NODES).map_err(io_err)?;
            for node in &data.nodes {
                let bytes = encode(node)?;
                nodes
                    .insert(node.id.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
            }
            let mut edges = write_txn.open_table(EDGES).map_err(io_err)?;
            for edge in &data.edges {
                let bytes = encode(edge)?;
                edges
                    .insert(edge.id.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;

        tracing::info!(
            nodes = data.nodes.len(),
            edges = data.edges.len(),
            "repository replaced"
        );
        Ok(())
    }

    /// Get the total number of nodes.
    pub fn node_count(&self) -> Result<usize, EngramError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(NODES).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    /// Get the total number of edges.
    pub fn edge_count(&self) -> Result<usize, EngramError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(EDGES).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }
}

// =============================================================================
// REPOSITORY TRAIT IMPLEMENTATION
// =============================================================================

impl Repository for RedbRepository {
    fn list_nodes(&self, page: usize, limit: usize) -> Result<Page<Node>, EngramError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(NODES).map_err(io_err)?;
        let total = table.len().map_err(io_err)? as usize;
        let offset = page.max(1).saturating_sub(1).saturating_mul(limit);

        let mut items = Vec::new();
        for entry in table.iter().map_err(io_err)?.skip(offset).take(limit) {
            let (_, value) = entry.map_err(io_err)?;
            items.push(decode::<Node>(value.value())?);
        }

        let has_more = offset.saturating_add(items.len()) < total;
        Ok(Page {
            items,
            total,
            has_more,
        })
    }

    fn edges_from(&self, selector: &EdgeSelector) -> Result<Vec<Edge>, EngramError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(EDGES).map_err(io_err)?;

        let mut edges = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let edge: Edge = decode(value.value())?;
            if selector.matches(&edge) {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    fn get_node(&self, id: &NodeId) -> Result<Option<Node>, EngramError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(NODES).map_err(io_err)?;
        match table.get(id.as_str()).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn update_node(&mut self, id: &NodeId, update: &NodeUpdate) -> Result<Node, EngramError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let node = {
            let mut table = write_txn.open_table(NODES).map_err(io_err)?;
            let mut node: Node = match table.get(id.as_str()).map_err(io_err)? {
                Some(data) => decode(data.value())?,
                None => return Err(EngramError::NodeNotFound(id.clone())),
            };
            update.apply_to(&mut node);
            let bytes = encode(&node)?;
            table.insert(id.as_str(), bytes.as_slice()).map_err(io_err)?;
            node
        };
        write_txn.commit().map_err(io_err)?;
        Ok(node)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{NodeType, RelationType};
    use chrono::{DateTime, Duration, Utc};
    use tempfile::tempdir;

    fn at() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(365)
    }

    fn node(id: &str) -> Node {
        Node::new(id, NodeType::Algorithm, id, at()).with_description("stored node")
    }

    #[test]
    fn insert_and_get_node() {
        let temp = tempdir().expect("temp dir");
        let mut repo = RedbRepository::open(temp.path().join("test.redb")).expect("open");

        repo.insert_node(&node("a")).expect("insert");
        let loaded = repo.get_node(&NodeId::new("a")).expect("get");
        assert_eq!(loaded, Some(node("a")));
        assert_eq!(repo.get_node(&NodeId::new("b")).expect("get"), None);
    }

    #[test]
    fn persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");

        {
            let mut repo = RedbRepository::open(&path).expect("open");
            repo.insert_node(&node("a")).expect("insert");
            repo.insert_node(&node("b")).expect("insert");
            repo.insert_edge(&Edge::new("e", "a", "b", RelationType::Requires, at()))
                .expect("edge");
        }

        let repo = RedbRepository::open(&path).expect("reopen");
        assert_eq!(repo.node_count().expect("count"), 2);
        assert_eq!(repo.edge_count().expect("count"), 1);
    }

    #[test]
    fn insert_edge_rejects_dangling_endpoint() {
        let temp = tempdir().expect("temp dir");
        let mut repo = RedbRepository::open(temp.path().join("test.redb")).expect("open");
        repo.insert_node(&node("a")).expect("insert");

        let result = repo.insert_edge(&Edge::new("e", "a", "ghost", RelationType::Uses, at()));
        assert!(matches!(result, Err(EngramError::IntegrityViolation { .. })));
        assert_eq!(repo.edge_count().expect("count"), 0);
    }

    #[test]
    fn list_nodes_paginates_in_id_order() {
        let temp = tempdir().expect("temp dir");
        let mut repo = RedbRepository::open(temp.path().join("test.redb")).expect("open");
        for id in ["d", "a", "c", "b", "e"] {
            repo.insert_node(&node(id)).expect("insert");
        }

        let first = repo.list_nodes(1, 2).expect("page");
        let ids: Vec<_> = first.items.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(first.total, 5);
        assert!(first.has_more);

        let last = repo.list_nodes(3, 2).expect("page");
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
    }

    #[test]
    fn update_node_persists() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("test.redb");
        {
            let mut repo = RedbRepository::open(&path).expect("open");
            repo.insert_node(&node("a")).expect("insert");
            let update = NodeUpdate {
                strength: Some(0.25),
                ..NodeUpdate::default()
            };
            repo.update_node(&NodeId::new("a"), &update).expect("update");
        }

        let repo = RedbRepository::open(&path).expect("reopen");
        let stored = repo.get_node(&NodeId::new("a")).expect("get").expect("exists");
        assert_eq!(stored.cognitive_state.strength, 0.25);
    }

    #[test]
    fn update_missing_node_fails() {
        let temp = tempdir().expect("temp dir");
        let mut repo = RedbRepository::open(temp.path().join("test.redb")).expect("open");
        let result = repo.update_node(&NodeId::new("nope"), &NodeUpdate::default());
        assert!(matches!(result, Err(EngramError::NodeNotFound(_))));
    }

    #[test]
    fn replace_all_swaps_contents_and_validates() {
        let temp = tempdir().expect("temp dir");
        let mut repo = RedbRepository::open(temp.path().join("test.redb")).expect("open");
        repo.insert_node(&node("old")).expect("insert");

        let data = SnapshotData {
            nodes: vec![node("x"), node("y")],
            edges: vec![Edge::new("e", "x", "y", RelationType::DependsOn, at())],
        };
        repo.replace_all(&data).expect("replace");
        assert_eq!(repo.node_count().expect("count"), 2);
        assert!(repo.get_node(&NodeId::new("old")).expect("get").is_none());

        let broken = SnapshotData {
            nodes: vec![node("x")],
            edges: vec![Edge::new("e", "x", "gone", RelationType::DependsOn, at())],
        };
        assert!(repo.replace_all(&broken).is_err());
        assert_eq!(repo.node_count().expect("count"), 2);
    }

    #[test]
    fn edges_from_selects_source() {
        let temp = tempdir().expect("temp dir");
        let mut repo = RedbRepository::open(temp.path().join("test.redb")).expect("open");
        for id in ["a", "b", "c"] {
            repo.insert_node(&node(id)).expect("insert");
        }
        repo.insert_edge(&Edge::new("e1", "a", "b", RelationType::Uses, at()))
            .expect("edge");
        repo.insert_edge(&Edge::new("e2", "c", "b", RelationType::Uses, at()))
            .expect("edge");

        let from_c = repo
            .edges_from(&EdgeSelector::From(NodeId::new("c")))
            .expect("edges");
        assert_eq!(from_c.len(), 1);
        assert_eq!(from_c[0].id.as_str(), "e2");
    }
}
