//! # Query Optimizer
//!
//! Derived indices over one [`GraphSnapshot`]:
//! - full-text inverted index over `name + " " + description`
//! - node-type and edge-type indices
//! - a Bloom filter over node ids
//!
//! The optimizer is an owned value with an explicit `build`/`clear`
//! lifecycle. Indices are never updated incrementally: after any change to
//! the underlying graph the caller must `build` again. Nothing here detects
//! staleness.

mod bloom;
mod text;

pub use bloom::BloomFilter;
pub use text::tokenize;

use crate::graph::GraphSnapshot;
use crate::primitives::{
    BLOOM_BITS_PER_NODE, BLOOM_DEFAULT_HASHES, BLOOM_MIN_BITS, DEFAULT_SEARCH_LIMIT,
};
use crate::{EdgeId, NodeId, NodeType, RelationType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::mem::size_of;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Bloom filter sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub bloom_hashes: u32,
    pub bloom_bits_per_node: usize,
    pub bloom_min_bits: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            bloom_hashes: BLOOM_DEFAULT_HASHES,
            bloom_bits_per_node: BLOOM_BITS_PER_NODE,
            bloom_min_bits: BLOOM_MIN_BITS,
        }
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: NodeId,
    /// Matched query tokens over total query tokens.
    pub score: f64,
}

/// Restrictions applied on top of a text search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Keep nodes of any of these types. Empty keeps everything.
    pub node_types: Vec<NodeType>,
    /// Accepted for callers that correlate edges themselves; does not
    /// restrict node hits.
    pub edge_types: Vec<RelationType>,
    pub max_results: Option<usize>,
}

/// Index sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerStats {
    pub full_text_terms: usize,
    pub node_types: usize,
    pub edge_types: usize,
    pub bloom_filter_size: usize,
    pub estimated_memory_bytes: usize,
}

/// How much of a query the full-text index knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub covered: Vec<String>,
    pub missing: Vec<String>,
    /// `covered / (covered + missing)`, 1.0 for a query without terms.
    pub score: f64,
}

// =============================================================================
// OPTIMIZER
// =============================================================================

/// Inverted, type and membership indices for one snapshot.
#[derive(Debug, Clone, Default)]
pub struct QueryOptimizer {
    config: OptimizerConfig,
    /// term -> node ids, in node iteration order, each id once
    full_text: BTreeMap<String, Vec<NodeId>>,
    node_types: BTreeMap<NodeType, Vec<NodeId>>,
    edge_types: BTreeMap<RelationType, Vec<EdgeId>>,
    /// `None` until built.
    bloom: Option<BloomFilter>,
}

impl QueryOptimizer {
    /// Create an empty optimizer with default sizing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty optimizer.
    #[must_use]
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Rebuild every index from `graph`, discarding the previous ones.
    pub fn build(&mut self, graph: &GraphSnapshot) {
        self.clear();

        let mut bloom = BloomFilter::with_capacity(
            graph.node_count(),
            self.config.bloom_bits_per_node,
            self.config.bloom_min_bits,
            self.config.bloom_hashes,
        );

        for node in graph.nodes() {
            let text = format!("{} {}", node.name, node.description);
            for term in tokenize(&text) {
                let postings = self.full_text.entry(term).or_default();
                if postings.last() != Some(&node.id) {
                    postings.push(node.id.clone());
                }
            }
            self.node_types
                .entry(node.node_type)
                .or_default()
                .push(node.id.clone());
            bloom.insert(node.id.as_str());
        }

        for edge in graph.edges() {
            self.edge_types
                .entry(edge.relation)
                .or_default()
                .push(edge.id.clone());
        }

        self.bloom = Some(bloom);
        tracing::debug!(
            terms = self.full_text.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "query indices built"
        );
    }

    /// Drop every index. `might_exist` answers `true` again afterwards.
    pub fn clear(&mut self) {
        self.full_text.clear();
        self.node_types.clear();
        self.edge_types.clear();
        self.bloom = None;
    }

    /// Check whether `build` has run since the last `clear`.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.bloom.is_some()
    }

    /// Ranked full-text search.
    ///
    /// Each query token adds one to every node in its posting list; the
    /// score is that count over the number of query tokens. Higher scores
    /// first; equal scores keep the order in which nodes were first hit.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut positions: BTreeMap<&NodeId, usize> = BTreeMap::new();
        let mut matches: Vec<(&NodeId, usize)> = Vec::new();

        for token in &tokens {
            for id in self.full_text.get(token).into_iter().flatten() {
                match positions.get(id) {
                    Some(&i) => matches[i].1 += 1,
                    None => {
                        positions.insert(id, matches.len());
                        matches.push((id, 1));
                    }
                }
            }
        }

        // Stable sort keeps discovery order among equal counts.
        matches.sort_by(|a, b| b.1.cmp(&a.1));

        let total = tokens.len() as f64;
        matches
            .into_iter()
            .take(limit)
            .map(|(id, count)| SearchHit {
                id: id.clone(),
                score: count as f64 / total,
            })
            .collect()
    }

    /// `search`, then keep only nodes of the requested types.
    pub fn search_with_filters(&self, query: &str, filters: &SearchFilters) -> Vec<SearchHit> {
        let limit = filters.max_results.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let hits = self.search(query, usize::MAX);

        if filters.node_types.is_empty() {
            return hits.into_iter().take(limit).collect();
        }

        let allowed: BTreeSet<&NodeId> = filters
            .node_types
            .iter()
            .flat_map(|t| self.filter_by_node_type(*t))
            .collect();

        hits.into_iter()
            .filter(|hit| allowed.contains(&hit.id))
            .take(limit)
            .collect()
    }

    /// Nodes of one type, in node order.
    #[must_use]
    pub fn filter_by_node_type(&self, node_type: NodeType) -> &[NodeId] {
        self.node_types
            .get(&node_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Edges of one relation kind, in edge order.
    #[must_use]
    pub fn filter_by_edge_type(&self, relation: RelationType) -> &[EdgeId] {
        self.edge_types
            .get(&relation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Lookup by type name; an unknown name is an empty result.
    #[must_use]
    pub fn filter_by_node_type_name(&self, name: &str) -> &[NodeId] {
        name.parse::<NodeType>()
            .map(|t| self.filter_by_node_type(t))
            .unwrap_or_default()
    }

    /// Lookup by relation name; an unknown name is an empty result.
    #[must_use]
    pub fn filter_by_edge_type_name(&self, name: &str) -> &[EdgeId] {
        name.parse::<RelationType>()
            .map(|r| self.filter_by_edge_type(r))
            .unwrap_or_default()
    }

    /// Fast negative membership test. Always `true` before `build`.
    #[must_use]
    pub fn might_exist(&self, id: &NodeId) -> bool {
        self.bloom
            .as_ref()
            .is_none_or(|bloom| bloom.might_contain(id.as_str()))
    }

    /// Index sizes and a rough memory estimate.
    #[must_use]
    pub fn stats(&self) -> OptimizerStats {
        let id_bytes = |s: &str| s.len() + size_of::<String>();

        let full_text_bytes: usize = self
            .full_text
            .iter()
            .map(|(term, ids)| {
                id_bytes(term) + ids.iter().map(|id| id_bytes(id.as_str())).sum::<usize>()
            })
            .sum();
        let node_type_bytes: usize = self
            .node_types
            .values()
            .flatten()
            .map(|id| id_bytes(id.as_str()))
            .sum();
        let edge_type_bytes: usize = self
            .edge_types
            .values()
            .flatten()
            .map(|id| id_bytes(id.as_str()))
            .sum();
        let bloom_bytes = self.bloom.as_ref().map_or(0, BloomFilter::byte_size);

        OptimizerStats {
            full_text_terms: self.full_text.len(),
            node_types: self.node_types.len(),
            edge_types: self.edge_types.len(),
            bloom_filter_size: self.bloom.as_ref().map_or(0, BloomFilter::bit_count),
            estimated_memory_bytes: full_text_bytes
                + node_type_bytes
                + edge_type_bytes
                + bloom_bytes,
        }
    }

    /// Split the distinct query terms into indexed and unknown ones.
    pub fn coverage(&self, query: &str) -> Coverage {
        let mut seen = BTreeSet::new();
        let (covered, missing): (Vec<String>, Vec<String>) = tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .partition(|t| self.full_text.contains_key(t));

        let total = covered.len() + missing.len();
        let score = if total == 0 {
            1.0
        } else {
            covered.len() as f64 / total as f64
        };

        Coverage {
            covered,
            missing,
            score,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
