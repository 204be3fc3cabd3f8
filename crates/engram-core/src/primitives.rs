//! # Primitives
//!
//! Hardcoded constants for the Engram core.
//!
//! These are the defaults of the decay/reinforcement model, the tokenizer,
//! the Bloom filter and the traversal bounds. Anything a deployment may want
//! to tune is mirrored in a serde-deserializable config struct
//! (`ConsolidationConfig`, `OptimizerConfig`) whose defaults are these values.

// =============================================================================
// CONSOLIDATION
// =============================================================================

/// Decay rate (per day) used when a node carries none.
pub const DEFAULT_DECAY_RATE: f64 = 0.01;

/// Minimum strength change for a decay result to be written back.
pub const DECAY_WRITE_THRESHOLD: f64 = 0.01;

/// Strength added by one reinforcement.
pub const REINFORCE_STRENGTH_STEP: f64 = 0.1;

/// Confidence added by one reinforcement.
pub const REINFORCE_CONFIDENCE_STEP: f64 = 0.05;

/// Nodes below this strength count as "weak concepts".
pub const WEAK_STRENGTH_THRESHOLD: f64 = 0.4;

/// Nodes below this confidence count as "low confidence".
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Milliseconds in one day, the unit of `Δt` for decay.
pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

// =============================================================================
// TRAVERSAL
// =============================================================================

/// Maximum traversal depth for graph queries.
///
/// Every `max_depth` argument is clamped to this value.
pub const MAX_TRAVERSAL_DEPTH: usize = 100;

/// Default hop limit for `find_path`.
pub const DEFAULT_PATH_DEPTH: usize = 5;

/// Default hop limit for `compute_dependencies`.
pub const DEFAULT_DEPENDENCY_DEPTH: usize = 10;

/// Name shown for a node id that the snapshot does not hold.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Estimated study time per curriculum step.
pub const HOURS_PER_CONCEPT: usize = 2;

// =============================================================================
// INDEXING
// =============================================================================

/// Tokens of this length or shorter are dropped by the tokenizer.
pub const MAX_DISCARDED_TOKEN_LEN: usize = 2;

/// Bloom filter bits allocated per node.
pub const BLOOM_BITS_PER_NODE: usize = 10;

/// Lower bound on the Bloom filter size in bits.
pub const BLOOM_MIN_BITS: usize = 1000;

/// Default number of Bloom filter hash functions.
pub const BLOOM_DEFAULT_HASHES: u32 = 4;

/// Default result count for `search`.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

// =============================================================================
// STORAGE & FORMAT
// =============================================================================

/// Page size used when a snapshot is loaded from a repository.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Magic bytes for the Engram snapshot file header.
pub const MAGIC_BYTES: &[u8; 4] = b"ENGR";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;
