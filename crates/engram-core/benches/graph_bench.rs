//! # Graph Benchmarks
//!
//! Performance benchmarks for engram-core snapshot, reasoning and search.
//!
//! Run with: `cargo bench -p engram-core`

use chrono::{DateTime, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use engram_core::{
    Edge, GraphSnapshot, Node, NodeId, NodeType, QueryOptimizer, ReasoningEngine, RelationType,
};
use std::collections::BTreeSet;
use std::hint::black_box;

fn node_id(i: usize) -> NodeId {
    NodeId::new(format!("n{:06}", i))
}

fn nodes(size: usize) -> Vec<Node> {
    (0..size)
        .map(|i| {
            Node::new(
                node_id(i),
                NodeType::Concept,
                format!("Concept {}", i),
                DateTime::<Utc>::UNIX_EPOCH,
            )
            .with_description(format!("topic{} builds on topic{}", i, i / 2))
            .with_difficulty((i % 10) as f64 / 10.0)
        })
        .collect()
}

/// Each node depends on its predecessor.
fn create_chain(size: usize) -> GraphSnapshot {
    let edges = (1..size).map(|i| {
        Edge::new(
            format!("e{}", i),
            node_id(i),
            node_id(i - 1),
            RelationType::DependsOn,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    });
    GraphSnapshot::build(nodes(size), edges).expect("build")
}

/// Node `i` requires `i / 2`: a binary prerequisite tree rooted at node 0.
fn create_tree(size: usize) -> GraphSnapshot {
    let edges = (1..size).map(|i| {
        Edge::new(
            format!("e{}", i),
            node_id(i),
            node_id(i / 2),
            RelationType::Requires,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    });
    GraphSnapshot::build(nodes(size), edges).expect("build")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_snapshot_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_build");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_chain(size)));
        });
    }

    group.finish();
}

fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");

    for size in [100, 500, 1000].iter() {
        let graph = create_chain(*size);
        let engine = ReasoningEngine::new(&graph);
        let from = node_id(*size - 1);
        let to = node_id(0);

        group.bench_with_input(BenchmarkId::new("depth_100", size), &(from, to), |b, (from, to)| {
            b.iter(|| black_box(engine.find_path(from, to, 100)));
        });
    }

    group.finish();
}

fn bench_curriculum(c: &mut Criterion) {
    let mut group = c.benchmark_group("curriculum");

    for size in [100, 1000, 5000].iter() {
        let graph = create_tree(*size);
        let engine = ReasoningEngine::new(&graph);
        let target = node_id(*size - 1);
        let known = BTreeSet::new();

        group.bench_with_input(BenchmarkId::from_parameter(size), &target, |b, target| {
            b.iter(|| black_box(engine.generate_curriculum(&known, target)));
        });
    }

    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");

    for size in [100, 1000, 10000].iter() {
        let graph = create_tree(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, graph| {
            b.iter(|| {
                let mut optimizer = QueryOptimizer::new();
                optimizer.build(graph);
                black_box(optimizer)
            });
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for size in [100, 1000, 10000].iter() {
        let graph = create_tree(*size);
        let mut optimizer = QueryOptimizer::new();
        optimizer.build(&graph);

        group.bench_with_input(BenchmarkId::from_parameter(size), &optimizer, |b, optimizer| {
            b.iter(|| black_box(optimizer.search("concept builds topic1", 10)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_snapshot_build,
    bench_find_path,
    bench_curriculum,
    bench_index_build,
    bench_search,
);
criterion_main!(benches);
