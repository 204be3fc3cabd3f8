//! # Property-Based Tests
//!
//! Invariants of the reasoning, indexing and consolidation engines over
//! randomly generated graphs.

use chrono::{DateTime, Duration, Utc};
use engram_core::{
    ConsolidationEngine, Edge, GraphSnapshot, Node, NodeId, NodeType, QueryOptimizer,
    ReasoningEngine, RelationType, snapshot_from_bytes, snapshot_to_bytes,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// HELPERS
// =============================================================================

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn node_id(i: usize) -> NodeId {
    NodeId::new(format!("n{:02}", i))
}

/// `size` nodes and one edge per `(from, to, relation)` triple, indices
/// reduced modulo `size`.
fn random_graph(
    size: usize,
    edges: &[(usize, usize, usize)],
    difficulties: &[f64],
) -> GraphSnapshot {
    let nodes = (0..size).map(|i| {
        let difficulty = difficulties.get(i).copied().unwrap_or(0.5);
        Node::new(node_id(i), NodeType::Concept, format!("Node {}", i), epoch())
            .with_difficulty(difficulty)
    });
    let edges = edges.iter().enumerate().map(|(k, &(from, to, relation))| {
        Edge::new(
            format!("e{}", k),
            node_id(from % size),
            node_id(to % size),
            RelationType::ALL[relation % RelationType::ALL.len()],
            epoch(),
        )
    });
    GraphSnapshot::build(nodes, edges).expect("build")
}

/// Hop distance from `from` to every reachable node, by plain BFS.
fn distances(graph: &GraphSnapshot, from: &NodeId) -> BTreeMap<NodeId, usize> {
    let mut dist = BTreeMap::new();
    let mut queue = VecDeque::new();
    dist.insert(from.clone(), 0);
    queue.push_back(from.clone());
    while let Some(current) = queue.pop_front() {
        let d = dist[&current];
        for edge in graph.outgoing(&current) {
            if !dist.contains_key(&edge.to_node) {
                dist.insert(edge.to_node.clone(), d + 1);
                queue.push_back(edge.to_node.clone());
            }
        }
    }
    dist
}

fn edge_strategy(max: usize) -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
    vec((0..max, 0..max, 0usize..19), 0..40)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// A path from a node to itself is that node alone, at any depth.
    #[test]
    fn path_to_self_is_trivial(
        size in 1usize..12,
        edges in edge_strategy(12),
        start in 0usize..12,
        depth in 0usize..8
    ) {
        let graph = random_graph(size, &edges, &[]);
        let x = node_id(start % size);
        let path = ReasoningEngine::new(&graph).find_path(&x, &x, depth);
        prop_assert_eq!(path.nodes, vec![x]);
    }

    /// Found paths follow real edges and are no longer than the true distance.
    #[test]
    fn path_is_valid_and_shortest(
        size in 2usize..12,
        edges in edge_strategy(12),
        from in 0usize..12,
        to in 0usize..12,
        depth in 0usize..8
    ) {
        let graph = random_graph(size, &edges, &[]);
        let (from, to) = (node_id(from % size), node_id(to % size));
        let path = ReasoningEngine::new(&graph).find_path(&from, &to, depth);
        let dist = distances(&graph, &from);

        match dist.get(&to) {
            Some(&d) if d <= depth => {
                prop_assert_eq!(path.hops(), d);
                prop_assert_eq!(path.nodes.first(), Some(&from));
                prop_assert_eq!(path.nodes.last(), Some(&to));
                for pair in path.nodes.windows(2) {
                    prop_assert!(graph.outgoing(&pair[0]).any(|e| e.to_node == pair[1]));
                }
                prop_assert_eq!(path.names.len(), path.nodes.len());
            }
            _ => prop_assert!(path.is_empty()),
        }
    }

    /// Dependency closure never repeats a node and never includes the query.
    #[test]
    fn dependencies_visit_each_node_once(
        size in 1usize..12,
        edges in edge_strategy(12),
        start in 0usize..12
    ) {
        let graph = random_graph(size, &edges, &[]);
        let start = node_id(start % size);
        let deps = ReasoningEngine::new(&graph).compute_dependencies(&start, 100);

        let unique: BTreeSet<_> = deps.iter().map(|d| d.id.clone()).collect();
        prop_assert_eq!(unique.len(), deps.len());
        prop_assert!(deps.len() < graph.node_count());
        prop_assert!(!unique.contains(&start));
        prop_assert!(deps.windows(2).all(|w| w[0].depth <= w[1].depth));
    }

    /// One contradiction per inhibitory edge.
    #[test]
    fn contradictions_match_inhibitory_edges(
        size in 1usize..10,
        edges in edge_strategy(10)
    ) {
        let graph = random_graph(size, &edges, &[]);
        let inhibitory = graph.edges().filter(|e| e.relation.is_inhibitory()).count();
        prop_assert_eq!(
            ReasoningEngine::new(&graph).detect_contradictions().len(),
            inhibitory
        );
    }

    /// On an acyclic prerequisite graph every prerequisite precedes its
    /// dependent, known nodes are excluded and the target comes last.
    #[test]
    fn curriculum_respects_prerequisites(
        size in 2usize..12,
        pairs in vec((0usize..12, 0usize..12), 0..30),
        known in vec(0usize..12, 0..4),
        difficulties in vec(0.0f64..=1.0, 12)
    ) {
        // Edges only point from higher to lower index, so there is no cycle.
        let edges: Vec<(usize, usize, usize)> = pairs
            .iter()
            .map(|&(a, b)| (a % size, b % size))
            .filter(|(a, b)| a > b)
            .map(|(a, b)| (a, b, 0))
            .collect();
        let graph = random_graph(size, &edges, &difficulties);
        let target = node_id(size - 1);
        let known: BTreeSet<NodeId> = known
            .iter()
            .map(|&k| node_id(k % (size - 1)))
            .collect();

        let curriculum = ReasoningEngine::new(&graph).generate_curriculum(&known, &target);
        let order = curriculum.ids();
        prop_assert!(curriculum.cyclic.is_empty());

        if order.is_empty() {
            return Ok(());
        }
        prop_assert_eq!(order.last(), Some(&target));
        prop_assert!(order.iter().all(|id| !known.contains(id)));

        let position: BTreeMap<&NodeId, usize> =
            order.iter().enumerate().map(|(i, id)| (id, i)).collect();
        for edge in graph.edges() {
            if let (Some(&dependent), Some(&prerequisite)) =
                (position.get(&edge.from_node), position.get(&edge.to_node))
            {
                prop_assert!(prerequisite < dependent);
            }
        }
    }

    /// A known target always yields an empty curriculum.
    #[test]
    fn known_target_has_empty_curriculum(
        size in 1usize..10,
        edges in edge_strategy(10),
        target in 0usize..10
    ) {
        let graph = random_graph(size, &edges, &[]);
        let target = node_id(target % size);
        let known: BTreeSet<NodeId> = [target.clone()].into_iter().collect();
        prop_assert!(
            ReasoningEngine::new(&graph)
                .generate_curriculum(&known, &target)
                .is_empty()
        );
    }

    /// No false negatives for built ids.
    #[test]
    fn bloom_filter_has_no_false_negatives(size in 1usize..300) {
        let graph = random_graph(size, &[], &[]);
        let mut optimizer = QueryOptimizer::new();
        optimizer.build(&graph);
        for node in graph.nodes() {
            prop_assert!(optimizer.might_exist(&node.id));
        }
    }

    /// Decay never raises strength and never leaves [0, 1].
    #[test]
    fn decay_stays_in_range(
        strength in 0.0f64..=1.0,
        rate in -1.0f64..1.0,
        days in -400i64..4000
    ) {
        let mut node = Node::new("n", NodeType::Concept, "N", epoch());
        node.cognitive_state.strength = strength;
        node.cognitive_state.decay_rate = rate;

        let outcome = ConsolidationEngine::new().decay(&node, epoch() + Duration::days(days));
        prop_assert!(outcome.new_strength >= 0.0);
        prop_assert!(outcome.new_strength <= strength);
        prop_assert!(outcome.elapsed_days >= 0.0);
    }

    /// Reinforcement stays bounded and keeps timestamps monotonic.
    #[test]
    fn reinforcement_is_bounded(
        strength in 0.0f64..=1.0,
        confidence in 0.0f64..=1.0,
        offsets in vec(-1000i64..1000, 1..30)
    ) {
        let engine = ConsolidationEngine::new();
        let mut node = Node::new("n", NodeType::Concept, "N", epoch());
        node.cognitive_state.strength = strength;
        node.cognitive_state.confidence = confidence;

        for offset in offsets {
            let before = node.temporal.last_reinforced_at;
            engine
                .reinforce(&node, epoch() + Duration::hours(offset))
                .apply_to(&mut node);
            let state = node.cognitive_state;
            prop_assert!(state.strength <= 1.0 && state.confidence <= 1.0);
            prop_assert_eq!(state.activation, 1.0);
            prop_assert!(node.temporal.last_reinforced_at >= before);
        }
    }

    /// Save -> load -> save produces identical bytes.
    #[test]
    fn snapshot_bytes_are_stable(
        size in 1usize..10,
        edges in edge_strategy(10)
    ) {
        let graph = random_graph(size, &edges, &[]);
        let bytes = snapshot_to_bytes(&graph).expect("serialize");
        let restored = snapshot_from_bytes(&bytes).expect("deserialize");
        prop_assert_eq!(snapshot_to_bytes(&restored).expect("serialize"), bytes);
    }
}
