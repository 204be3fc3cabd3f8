//! End-to-end scenarios: repository -> snapshot -> engines -> repository.

use chrono::{DateTime, Duration, Utc};
use engram_core::{
    ConsolidationEngine, Edge, EngramError, GraphSnapshot, MemoryRepository, Node, NodeId,
    NodeType, QueryOptimizer, ReasoningEngine, RedbRepository, RelationType, Repository,
    SearchFilters,
};
use std::collections::BTreeSet;

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn id(s: &str) -> NodeId {
    NodeId::new(s)
}

/// Hash table <- Consistent hashing <- Distributed cache, plus a failure
/// mode and a competing design.
fn knowledge_base() -> MemoryRepository {
    let mut repo = MemoryRepository::new();
    let nodes = [
        Node::new("hash", NodeType::Concept, "Hash table", epoch())
            .with_description("Key value lookup in constant time")
            .with_difficulty(0.2),
        Node::new("chash", NodeType::Algorithm, "Consistent hashing", epoch())
            .with_description("Hash ring that limits key movement")
            .with_difficulty(0.5),
        Node::new("cache", NodeType::System, "Distributed cache", epoch())
            .with_description("Key value cache spread over a hash ring")
            .with_difficulty(0.8),
        Node::new("hotkey", NodeType::FailureMode, "Hot key", epoch())
            .with_description("One key overloads a single shard"),
        Node::new("rendezvous", NodeType::Algorithm, "Rendezvous hashing", epoch())
            .with_description("Highest random weight hashing"),
    ];
    for node in nodes {
        repo.insert_node(node);
    }

    let edges = [
        ("e1", "cache", "chash", RelationType::DependsOn),
        ("e2", "chash", "hash", RelationType::DependsOn),
        ("e3", "cache", "hotkey", RelationType::FailsOn),
        ("e4", "chash", "rendezvous", RelationType::CompetesWith),
        ("e5", "cache", "hash", RelationType::Uses),
    ];
    for (edge_id, from, to, relation) in edges {
        repo.insert_edge(Edge::new(edge_id, from, to, relation, epoch()))
            .expect("edge");
    }
    repo
}

#[test]
fn linear_prerequisites_yield_full_curriculum() {
    // C depends_on B, B depends_on A
    let graph = GraphSnapshot::build(
        vec![
            Node::new("A", NodeType::Concept, "A", epoch()),
            Node::new("B", NodeType::Concept, "B", epoch()),
            Node::new("C", NodeType::Concept, "C", epoch()),
        ],
        vec![
            Edge::new("cb", "C", "B", RelationType::DependsOn, epoch()),
            Edge::new("ba", "B", "A", RelationType::DependsOn, epoch()),
        ],
    )
    .expect("build");

    let curriculum = ReasoningEngine::new(&graph).generate_curriculum(&BTreeSet::new(), &id("C"));
    assert_eq!(curriculum.ids(), vec![id("A"), id("B"), id("C")]);
}

#[test]
fn single_failure_edge_is_single_contradiction() {
    let graph = GraphSnapshot::build(
        vec![
            Node::new("X", NodeType::System, "X", epoch()),
            Node::new("Y", NodeType::FailureMode, "Y", epoch()),
            Node::new("Z", NodeType::Tool, "Z", epoch()),
        ],
        vec![
            Edge::new("xy", "X", "Y", RelationType::FailsOn, epoch()),
            Edge::new("xz", "X", "Z", RelationType::Uses, epoch()),
        ],
    )
    .expect("build");

    let contradictions = ReasoningEngine::new(&graph).detect_contradictions();
    assert_eq!(contradictions.len(), 1);
    let c = &contradictions[0];
    assert_eq!((&c.node_a, &c.node_b, c.relation), (&id("X"), &id("Y"), RelationType::FailsOn));
}

#[test]
fn knowledge_base_reasoning_and_search() {
    let repo = knowledge_base();
    let graph = GraphSnapshot::load(&repo, 2).expect("load");
    let engine = ReasoningEngine::new(&graph);

    let explanation = engine.explain_concept(&id("cache"));
    assert_eq!(explanation.name, "Distributed cache");
    assert_eq!(explanation.outgoing[&RelationType::FailsOn][0].name, "Hot key");

    let path = engine.find_path(&id("cache"), &id("rendezvous"), 5);
    assert_eq!(path.names, vec!["Distributed cache", "Consistent hashing", "Rendezvous hashing"]);

    let deps = engine.compute_dependencies(&id("cache"), 10);
    let dep_ids: Vec<_> = deps.iter().map(|d| (d.id.as_str(), d.depth)).collect();
    assert_eq!(dep_ids, vec![("chash", 1), ("hash", 2)]);

    let known: BTreeSet<NodeId> = [id("hash")].into_iter().collect();
    let curriculum = engine.generate_curriculum(&known, &id("cache"));
    assert_eq!(curriculum.ids(), vec![id("chash"), id("cache")]);
    assert_eq!(curriculum.estimated_time(), "4 hours");

    let mut optimizer = QueryOptimizer::new();
    optimizer.build(&graph);
    let hits = optimizer.search("key value hash", 3);
    assert_eq!(hits[0].id, id("cache"));
    let algorithms = optimizer.search_with_filters(
        "hashing",
        &SearchFilters {
            node_types: vec![NodeType::Algorithm],
            ..SearchFilters::default()
        },
    );
    assert_eq!(algorithms.len(), 2);
    assert!(optimizer.might_exist(&id("rendezvous")));
}

#[test]
fn consolidation_writes_back_through_redb() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut repo = RedbRepository::open(dir.path().join("engram.redb")).expect("open");
    let source = knowledge_base();
    let data = engram_core::SnapshotData::from(&GraphSnapshot::load_all(&source).expect("load"));
    repo.replace_all(&data).expect("replace");

    let engine = ConsolidationEngine::new();
    let later = epoch() + Duration::days(100);

    let report = engine.consolidate(&mut repo, later).expect("consolidate");
    assert_eq!(report.examined, 5);
    assert_eq!(report.updated, 5);

    let decayed = repo.get_node(&id("hash")).expect("get").expect("node");
    assert!((decayed.cognitive_state.strength - 0.5 * (-1.0f64).exp()).abs() < 1e-9);

    let reinforced = engine.reinforce_node(&mut repo, &id("hash"), later).expect("reinforce");
    assert_eq!(reinforced.cognitive_state.activation, 1.0);
    assert_eq!(reinforced.temporal.last_reinforced_at, later);

    let status = engine.status(GraphSnapshot::load_all(&repo).expect("load").nodes());
    assert_eq!(status.total_nodes, 5);
    assert_eq!(status.weak_concepts, 5);

    assert!(matches!(
        engine.reinforce_node(&mut repo, &id("ghost"), later),
        Err(EngramError::NodeNotFound(_))
    ));
}
