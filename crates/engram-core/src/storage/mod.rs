//! # Storage Module
//!
//! The repository boundary between the core and its storage collaborator.
//!
//! The core only ever needs four calls: paginated node listing, edge
//! retrieval (per source or wildcard), single-node reads, and partial
//! node writes. Two reference implementations ship with the crate:
//! - `MemoryRepository`: `BTreeMap`-backed, for tests and one-shot loads
//! - `RedbRepository`: redb tables of postcard-encoded entities

mod memory;
mod redb_repo;

pub use memory::MemoryRepository;
pub use redb_repo::RedbRepository;

use crate::{Edge, EngramError, Node, NodeId, NodeUpdate};
use serde::{Deserialize, Serialize};

/// Which edges an `edges_from` call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeSelector {
    /// Every edge in the store.
    All,
    /// Edges whose `from_node` is the given id.
    From(NodeId),
}

impl EdgeSelector {
    /// Check whether an edge is selected.
    #[must_use]
    pub fn matches(&self, edge: &Edge) -> bool {
        match self {
            Self::All => true,
            Self::From(id) => &edge.from_node == id,
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Cut page `page` (1-based; 0 is read as 1) of size `limit` out of `items`.
    pub fn slice(
        items: impl IntoIterator<Item = T>,
        total: usize,
        page: usize,
        limit: usize,
    ) -> Self {
        let offset = page.max(1).saturating_sub(1).saturating_mul(limit);
        let items: Vec<T> = items.into_iter().skip(offset).take(limit).collect();
        let has_more = offset.saturating_add(items.len()) < total;
        Self {
            items,
            total,
            has_more,
        }
    }
}

/// The storage collaborator interface consumed by the core.
///
/// Implementations own durability and write serialization; the core
/// assumes writes to one node id are serialized by the implementation.
pub trait Repository {
    /// List nodes, `limit` per page, pages numbered from 1.
    fn list_nodes(&self, page: usize, limit: usize) -> Result<Page<Node>, EngramError>;

    /// Retrieve edges for one source node, or all edges.
    fn edges_from(&self, selector: &EdgeSelector) -> Result<Vec<Edge>, EngramError>;

    /// Read a single node.
    fn get_node(&self, id: &NodeId) -> Result<Option<Node>, EngramError>;

    /// Apply a partial update and return the stored result.
    ///
    /// Returns `NodeNotFound` if the id is unknown.
    fn update_node(&mut self, id: &NodeId, update: &NodeUpdate) -> Result<Node, EngramError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_slice_first_middle_last() {
        let first = Page::slice(0..10, 10, 1, 4);
        assert_eq!(first.items, vec![0, 1, 2, 3]);
        assert!(first.has_more);

        let last = Page::slice(0..10, 10, 3, 4);
        assert_eq!(last.items, vec![8, 9]);
        assert!(!last.has_more);

        let past_end = Page::slice(0..10, 10, 9, 4);
        assert!(past_end.items.is_empty());
        assert!(!past_end.has_more);
    }

    #[test]
    fn page_zero_reads_as_first_page() {
        assert_eq!(Page::slice(0..5, 5, 0, 2).items, vec![0, 1]);
    }
}
