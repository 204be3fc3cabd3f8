//! # engram-core
//!
//! Reasoning, indexing and consolidation core of the Engram knowledge graph.
//!
//! Every algorithm runs over one in-memory [`GraphSnapshot`], loaded from a
//! [`Repository`]:
//! - [`ReasoningEngine`]: explanation, comparison, shortest paths,
//!   prerequisite closure, contradictions, curricula
//! - [`QueryOptimizer`]: inverted index, type indices, Bloom filter
//! - [`ConsolidationEngine`]: strength decay and reinforcement, the only
//!   component that writes back
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - Deterministic: `BTreeMap` ordering, adjacency lists visited in supply order
//! - Snapshots are validated once at construction; lookups of missing ids
//!   degrade to placeholder results instead of failing
//! - I/O happens only behind the `Repository` trait

// =============================================================================
// MODULES
// =============================================================================

pub mod consolidation;
pub mod formats;
pub mod graph;
pub mod optimizer;
pub mod primitives;
pub mod reasoning;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    CognitiveState, Edge, EdgeDynamics, EdgeId, EdgeTemporal, EdgeWeight, EngramError, Level,
    Metadata, Node, NodeId, NodeTemporal, NodeType, NodeUpdate, RelationType, clamp_unit,
};

// =============================================================================
// RE-EXPORTS: Snapshot & Storage
// =============================================================================

pub use graph::{GraphSnapshot, SnapshotData};
pub use storage::{EdgeSelector, MemoryRepository, Page, RedbRepository, Repository};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use consolidation::{
    ConsolidationConfig, ConsolidationEngine, ConsolidationReport, ConsolidationStatus,
    DecayOutcome,
};
pub use optimizer::{
    BloomFilter, Coverage, OptimizerConfig, OptimizerStats, QueryOptimizer, SearchFilters,
    SearchHit,
};
pub use reasoning::{
    CognitiveDelta, Comparison, ConceptRef, Contradiction, Curriculum, CurriculumStep, Dependency,
    Explanation, LevelDelta, PathResult, ReasoningEngine, RelatedConcept,
};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{
    PersistenceHeader, snapshot_data_from_bytes, snapshot_from_bytes, snapshot_to_bytes,
};
