//! # Reasoning Engine
//!
//! Read-only structural queries over a [`GraphSnapshot`]:
//! - `explain_concept`: a node and its direct relations, grouped by kind
//! - `compare_concepts`: level/cognitive deltas and relation overlap
//! - `find_path`: minimum-hop BFS path
//! - `compute_dependencies`: prerequisite closure with hop depth
//! - `detect_contradictions`: one triple per inhibitory edge
//! - `generate_curriculum`: unmet prerequisites in learnable order
//!
//! Lookups of unknown ids never fail: they degrade to a placeholder name
//! or an empty result. Every traversal is bounded by `MAX_TRAVERSAL_DEPTH`
//! and a visited set, and walks adjacency lists in snapshot order so ties
//! resolve the same way on every run.

use crate::graph::GraphSnapshot;
use crate::primitives::{HOURS_PER_CONCEPT, MAX_TRAVERSAL_DEPTH};
use crate::{CognitiveState, EdgeId, Level, Node, NodeId, RelationType};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

// =============================================================================
// RESULT TYPES
// =============================================================================

/// A neighbour reached through one edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedConcept {
    pub edge: EdgeId,
    pub id: NodeId,
    pub name: String,
    pub strength: f64,
    pub confidence: f64,
}

/// A node with its direct relations, grouped by relation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub id: NodeId,
    pub name: String,
    /// `None` when the id is not in the snapshot.
    pub node: Option<Node>,
    pub outgoing: BTreeMap<RelationType, Vec<RelatedConcept>>,
    pub incoming: BTreeMap<RelationType, Vec<RelatedConcept>>,
}

impl Explanation {
    /// Check whether the explained node exists.
    #[must_use]
    pub fn found(&self) -> bool {
        self.node.is_some()
    }

    /// Number of edges touching the node.
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.outgoing
            .values()
            .chain(self.incoming.values())
            .map(Vec::len)
            .sum()
    }
}

/// Identity of one side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRef {
    pub id: NodeId,
    pub name: String,
    pub found: bool,
}

/// `b − a` on each level axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelDelta {
    pub abstraction: f64,
    pub difficulty: f64,
    pub volatility: f64,
}

impl LevelDelta {
    fn between(a: &Level, b: &Level) -> Self {
        Self {
            abstraction: b.abstraction - a.abstraction,
            difficulty: b.difficulty - a.difficulty,
            volatility: b.volatility - a.volatility,
        }
    }
}

/// `b − a` on each cognitive field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CognitiveDelta {
    pub strength: f64,
    pub activation: f64,
    pub confidence: f64,
}

impl CognitiveDelta {
    fn between(a: &CognitiveState, b: &CognitiveState) -> Self {
        Self {
            strength: b.strength - a.strength,
            activation: b.activation - a.activation,
            confidence: b.confidence - a.confidence,
        }
    }
}

/// Side-by-side comparison of two nodes.
///
/// When either node is missing, every computed field is `None`/empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub a: ConceptRef,
    pub b: ConceptRef,
    pub level: Option<LevelDelta>,
    pub cognitive: Option<CognitiveDelta>,
    /// Jaccard overlap of the outgoing relation kinds.
    pub relation_overlap: Option<f64>,
    pub shared_relations: Vec<RelationType>,
}

/// A path as ids plus resolved names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResult {
    pub nodes: Vec<NodeId>,
    pub names: Vec<String>,
}

impl PathResult {
    /// Check if no path was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges on the path.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// One member of a dependency closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: NodeId,
    /// Hops from the queried node.
    pub depth: usize,
}

/// An inhibitory edge, read as a contradiction between its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub edge: EdgeId,
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub relation: RelationType,
}

/// One entry of a learning path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumStep {
    pub id: NodeId,
    pub name: String,
    pub difficulty: f64,
}

/// An ordered learning path toward a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub target: NodeId,
    /// Prerequisites first, target last.
    pub steps: Vec<CurriculumStep>,
    /// Nodes on, or only reachable through, a dependency cycle. They close
    /// the path in difficulty order.
    pub cyclic: Vec<NodeId>,
    pub estimated_hours: usize,
}

impl Curriculum {
    fn empty(target: &NodeId) -> Self {
        Self {
            target: target.clone(),
            steps: Vec::new(),
            cyclic: Vec::new(),
            estimated_hours: 0,
        }
    }

    /// The ordered node ids.
    #[must_use]
    pub fn ids(&self) -> Vec<NodeId> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    /// Check if there is nothing left to learn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Difficulty of each step, in path order.
    #[must_use]
    pub fn difficulty_progression(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.difficulty).collect()
    }

    /// Study time as text: hours below a day, whole days otherwise.
    #[must_use]
    pub fn estimated_time(&self) -> String {
        if self.estimated_hours < 24 {
            format!("{} hours", self.estimated_hours)
        } else {
            format!("{} days", self.estimated_hours / 24)
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Stateless reasoning over one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ReasoningEngine<'g> {
    graph: &'g GraphSnapshot,
}

impl<'g> ReasoningEngine<'g> {
    /// Create an engine borrowing `graph`.
    #[must_use]
    pub fn new(graph: &'g GraphSnapshot) -> Self {
        Self { graph }
    }

    fn related(
        &self,
        edge_id: &EdgeId,
        other: &NodeId,
        strength: f64,
        confidence: f64,
    ) -> RelatedConcept {
        RelatedConcept {
            edge: edge_id.clone(),
            id: other.clone(),
            name: self.graph.name_of(other).to_string(),
            strength,
            confidence,
        }
    }

    /// Explain a node through its direct relations.
    pub fn explain_concept(&self, id: &NodeId) -> Explanation {
        let mut outgoing: BTreeMap<RelationType, Vec<RelatedConcept>> = BTreeMap::new();
        for edge in self.graph.outgoing(id) {
            outgoing.entry(edge.relation).or_default().push(self.related(
                &edge.id,
                &edge.to_node,
                edge.weight.strength,
                edge.confidence,
            ));
        }

        let mut incoming: BTreeMap<RelationType, Vec<RelatedConcept>> = BTreeMap::new();
        for edge in self.graph.incoming(id) {
            incoming.entry(edge.relation).or_default().push(self.related(
                &edge.id,
                &edge.from_node,
                edge.weight.strength,
                edge.confidence,
            ));
        }

        Explanation {
            id: id.clone(),
            name: self.graph.name_of(id).to_string(),
            node: self.graph.node(id).cloned(),
            outgoing,
            incoming,
        }
    }

    fn concept_ref(&self, id: &NodeId) -> ConceptRef {
        ConceptRef {
            id: id.clone(),
            name: self.graph.name_of(id).to_string(),
            found: self.graph.contains_node(id),
        }
    }

    fn relation_kinds(&self, id: &NodeId) -> BTreeSet<RelationType> {
        self.graph.outgoing(id).map(|e| e.relation).collect()
    }

    /// Compare two nodes.
    pub fn compare_concepts(&self, a: &NodeId, b: &NodeId) -> Comparison {
        let mut comparison = Comparison {
            a: self.concept_ref(a),
            b: self.concept_ref(b),
            level: None,
            cognitive: None,
            relation_overlap: None,
            shared_relations: Vec::new(),
        };

        let (Some(node_a), Some(node_b)) = (self.graph.node(a), self.graph.node(b)) else {
            return comparison;
        };

        let kinds_a = self.relation_kinds(a);
        let kinds_b = self.relation_kinds(b);
        let shared: Vec<RelationType> = kinds_a.intersection(&kinds_b).copied().collect();
        let union = kinds_a.union(&kinds_b).count();
        let overlap = if union == 0 {
            0.0
        } else {
            shared.len() as f64 / union as f64
        };

        comparison.level = Some(LevelDelta::between(&node_a.level, &node_b.level));
        comparison.cognitive = Some(CognitiveDelta::between(
            &node_a.cognitive_state,
            &node_b.cognitive_state,
        ));
        comparison.relation_overlap = Some(overlap);
        comparison.shared_relations = shared;
        comparison
    }

    /// Minimum-hop path from `from` to `to` over directed edges.
    ///
    /// Empty if either end is unknown or `to` is more than `max_depth`
    /// hops away.
    pub fn find_path(&self, from: &NodeId, to: &NodeId, max_depth: usize) -> PathResult {
        if !self.graph.contains_node(from) || !self.graph.contains_node(to) {
            return PathResult::default();
        }
        if from == to {
            return self.path_result(vec![from.clone()]);
        }

        let max_depth = max_depth.min(MAX_TRAVERSAL_DEPTH);
        let mut visited: BTreeSet<&NodeId> = BTreeSet::new();
        let mut prev: BTreeMap<&NodeId, &NodeId> = BTreeMap::new();
        let mut queue = VecDeque::new();

        visited.insert(from);
        queue.push_back((from, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }

            for edge in self.graph.outgoing(current) {
                let next = &edge.to_node;
                if !visited.insert(next) {
                    continue;
                }
                prev.insert(next, current);

                if next == to {
                    let mut path = vec![to.clone()];
                    let mut cursor = to;
                    while let Some(&p) = prev.get(cursor) {
                        path.push(p.clone());
                        cursor = p;
                    }
                    path.reverse();
                    return self.path_result(path);
                }
                queue.push_back((next, depth.saturating_add(1)));
            }
        }

        PathResult::default()
    }

    fn path_result(&self, nodes: Vec<NodeId>) -> PathResult {
        let names = nodes
            .iter()
            .map(|id| self.graph.name_of(id).to_string())
            .collect();
        PathResult { nodes, names }
    }

    /// Everything `id` depends on through `depends_on`/`requires`, up to
    /// `max_depth` hops, in BFS discovery order.
    ///
    /// The queried node itself is never part of the result, even on a cycle.
    pub fn compute_dependencies(&self, id: &NodeId, max_depth: usize) -> Vec<Dependency> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }

        let max_depth = max_depth.min(MAX_TRAVERSAL_DEPTH);
        let mut visited: BTreeSet<&NodeId> = BTreeSet::new();
        let mut queue = VecDeque::new();
        let mut closure = Vec::new();

        visited.insert(id);
        queue.push_back((id, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in self.graph.outgoing(current) {
                if !edge.relation.is_prerequisite() || !visited.insert(&edge.to_node) {
                    continue;
                }
                let next_depth = depth.saturating_add(1);
                closure.push(Dependency {
                    id: edge.to_node.clone(),
                    depth: next_depth,
                });
                queue.push_back((&edge.to_node, next_depth));
            }
        }

        closure
    }

    /// One triple per `fails_on`/`competes_with` edge, in snapshot order.
    ///
    /// A reverse edge between the same pair is a second contradiction.
    pub fn detect_contradictions(&self) -> Vec<Contradiction> {
        self.graph
            .edges()
            .filter(|e| e.relation.is_inhibitory())
            .map(|e| Contradiction {
                edge: e.id.clone(),
                node_a: e.from_node.clone(),
                node_b: e.to_node.clone(),
                relation: e.relation,
            })
            .collect()
    }

    /// Learning path to `target` for someone who already knows `known`.
    ///
    /// The path holds every unmet prerequisite of `target` followed by the
    /// target itself. It is empty when the target is known, unknown to the
    /// snapshot, or has no unmet prerequisite.
    pub fn generate_curriculum(&self, known: &BTreeSet<NodeId>, target: &NodeId) -> Curriculum {
        if known.contains(target) || !self.graph.contains_node(target) {
            return Curriculum::empty(target);
        }

        let mut members: BTreeSet<&NodeId> = BTreeSet::new();
        members.insert(target);
        let closure = self.compute_dependencies(target, MAX_TRAVERSAL_DEPTH);
        for dep in &closure {
            if let Some(node) = self.graph.node(&dep.id) {
                members.insert(&node.id);
            }
        }

        if members.iter().all(|id| *id == target || known.contains(*id)) {
            return Curriculum::empty(target);
        }

        // Order the whole closure, known nodes included, so constraints that
        // pass through a known node still hold between the remaining ones.
        let (ordered, cyclic) = self.order_prerequisites_first(&members);

        let steps: Vec<CurriculumStep> = ordered
            .into_iter()
            .filter(|id| !known.contains(*id))
            .map(|id| CurriculumStep {
                id: id.clone(),
                name: self.graph.name_of(id).to_string(),
                difficulty: self.difficulty(id),
            })
            .collect();

        if !cyclic.is_empty() {
            tracing::warn!(
                node = %target,
                cycle_members = cyclic.len(),
                "dependency cycle in curriculum closure"
            );
        }

        Curriculum {
            target: target.clone(),
            estimated_hours: steps.len().saturating_mul(HOURS_PER_CONCEPT),
            steps,
            cyclic: cyclic
                .into_iter()
                .filter(|id| !known.contains(*id))
                .cloned()
                .collect(),
        }
    }

    fn difficulty(&self, id: &NodeId) -> f64 {
        self.graph.node(id).map_or(0.0, |n| n.level.difficulty)
    }

    /// Kahn's algorithm over prerequisite edges inside `members`; among
    /// ready nodes the easiest goes first, then the smallest id.
    ///
    /// Returns the full order and, separately, the members left over by a
    /// cycle (also appended to the order).
    fn order_prerequisites_first<'m>(
        &self,
        members: &BTreeSet<&'m NodeId>,
    ) -> (Vec<&'m NodeId>, Vec<&'m NodeId>) {
        let mut pending: BTreeMap<&NodeId, usize> = members.iter().map(|&id| (id, 0)).collect();
        let mut unlocks: BTreeMap<&NodeId, Vec<&'m NodeId>> = BTreeMap::new();

        for &dependent in members {
            for edge in self.graph.outgoing(dependent) {
                let prerequisite = &edge.to_node;
                if !edge.relation.is_prerequisite()
                    || prerequisite == dependent
                    || !members.contains(prerequisite)
                {
                    continue;
                }
                if let Some(count) = pending.get_mut(dependent) {
                    *count = count.saturating_add(1);
                }
                unlocks.entry(prerequisite).or_default().push(dependent);
            }
        }

        let mut ready: BinaryHeap<Reverse<ReadyNode<'m>>> = members
            .iter()
            .filter(|id| pending.get(**id) == Some(&0))
            .map(|&id| Reverse(ReadyNode::new(id, self.difficulty(id))))
            .collect();

        let mut order = Vec::with_capacity(members.len());
        while let Some(Reverse(next)) = ready.pop() {
            order.push(next.id);
            for &dependent in unlocks.get(next.id).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.push(Reverse(ReadyNode::new(dependent, self.difficulty(dependent))));
                    }
                }
            }
        }

        let mut cyclic: Vec<ReadyNode<'m>> = members
            .iter()
            .filter(|id| pending.get(**id).is_some_and(|c| *c > 0))
            .map(|&id| ReadyNode::new(id, self.difficulty(id)))
            .collect();
        cyclic.sort();
        let cyclic: Vec<&NodeId> = cyclic.into_iter().map(|r| r.id).collect();
        order.extend(cyclic.iter().copied());

        (order, cyclic)
    }
}

/// Heap entry ordered by difficulty, then id.
#[derive(Debug, Clone, Copy)]
struct ReadyNode<'a> {
    difficulty: f64,
    id: &'a NodeId,
}

impl<'a> ReadyNode<'a> {
    fn new(id: &'a NodeId, difficulty: f64) -> Self {
        Self { difficulty, id }
    }
}

impl PartialEq for ReadyNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReadyNode<'_> {}

impl PartialOrd for ReadyNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.difficulty
            .total_cmp(&other.difficulty)
            .then_with(|| self.id.cmp(other.id))
    }
}

// =============================================================================
// TESTS
// =============================================================================
