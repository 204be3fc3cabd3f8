//! # Core Type Definitions
//!
//! This module contains all core types for the Engram knowledge graph:
//! - Identifiers (`NodeId`, `EdgeId`)
//! - Closed vocabularies (`NodeType`, `RelationType`)
//! - Entities (`Node`, `Edge`) and their nested records
//! - Partial node mutations (`NodeUpdate`)
//! - Error types (`EngramError`)
//!
//! ## Numeric Guarantees
//!
//! Every probability-like field lives in `[0, 1]`. Values read from outside
//! are brought into range with [`clamp_unit`]; nothing in this crate writes
//! an out-of-range value back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable identifier of a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Stable identifier of an edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Create an edge id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// CLOSED VOCABULARIES
// =============================================================================

/// The kind of knowledge a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Concept,
    Algorithm,
    System,
    Api,
    Paper,
    Tool,
    FailureMode,
    Optimization,
    Abstraction,
}

impl NodeType {
    /// Every node type, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Concept,
        Self::Algorithm,
        Self::System,
        Self::Api,
        Self::Paper,
        Self::Tool,
        Self::FailureMode,
        Self::Optimization,
        Self::Abstraction,
    ];

    /// The snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Algorithm => "algorithm",
            Self::System => "system",
            Self::Api => "api",
            Self::Paper => "paper",
            Self::Tool => "tool",
            Self::FailureMode => "failure_mode",
            Self::Optimization => "optimization",
            Self::Abstraction => "abstraction",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = EngramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EngramError::InvalidInput(format!("unknown node type '{}'", s)))
    }
}

/// The kind of a directed relationship between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    DependsOn,
    Requires,
    Implements,
    Generalizes,
    Specializes,
    Uses,
    Extends,
    Optimizes,
    Replaces,
    Composes,
    PartOf,
    Enables,
    Causes,
    Prevents,
    FailsOn,
    CompetesWith,
    RelatedTo,
    DerivedFrom,
    EvaluatedBy,
}

impl RelationType {
    /// Every relation kind, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::DependsOn,
        Self::Requires,
        Self::Implements,
        Self::Generalizes,
        Self::Specializes,
        Self::Uses,
        Self::Extends,
        Self::Optimizes,
        Self::Replaces,
        Self::Composes,
        Self::PartOf,
        Self::Enables,
        Self::Causes,
        Self::Prevents,
        Self::FailsOn,
        Self::CompetesWith,
        Self::RelatedTo,
        Self::DerivedFrom,
        Self::EvaluatedBy,
    ];

    /// The snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DependsOn => "depends_on",
            Self::Requires => "requires",
            Self::Implements => "implements",
            Self::Generalizes => "generalizes",
            Self::Specializes => "specializes",
            Self::Uses => "uses",
            Self::Extends => "extends",
            Self::Optimizes => "optimizes",
            Self::Replaces => "replaces",
            Self::Composes => "composes",
            Self::PartOf => "part_of",
            Self::Enables => "enables",
            Self::Causes => "causes",
            Self::Prevents => "prevents",
            Self::FailsOn => "fails_on",
            Self::CompetesWith => "competes_with",
            Self::RelatedTo => "related_to",
            Self::DerivedFrom => "derived_from",
            Self::EvaluatedBy => "evaluated_by",
        }
    }

    /// Inhibitory relations mark a contradiction between their endpoints.
    #[must_use]
    pub const fn is_inhibitory(self) -> bool {
        matches!(self, Self::FailsOn | Self::CompetesWith)
    }

    /// Prerequisite relations: `a depends_on b` means `b` must be known first.
    #[must_use]
    pub const fn is_prerequisite(self) -> bool {
        matches!(self, Self::DependsOn | Self::Requires)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = EngramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| EngramError::InvalidInput(format!("unknown relation '{}'", s)))
    }
}

// =============================================================================
// NUMERIC HELPERS
// =============================================================================

/// Clamp a value into `[0, 1]`. Non-finite input becomes 0.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

// =============================================================================
// NODE
// =============================================================================

/// Position of a node on the abstraction/difficulty/volatility axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Level {
    pub abstraction: f64,
    pub difficulty: f64,
    pub volatility: f64,
}

impl Default for Level {
    fn default() -> Self {
        Self {
            abstraction: 0.5,
            difficulty: 0.5,
            volatility: 0.5,
        }
    }
}

/// Memory state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveState {
    /// Memory durability.
    pub strength: f64,
    /// Recency of use.
    pub activation: f64,
    /// Certainty.
    pub confidence: f64,
    /// Exponential decay rate per day. Zero means "use the default rate".
    pub decay_rate: f64,
}

impl Default for CognitiveState {
    fn default() -> Self {
        Self {
            strength: 0.5,
            activation: 0.0,
            confidence: 0.5,
            decay_rate: crate::primitives::DEFAULT_DECAY_RATE,
        }
    }
}

/// Lifecycle timestamps of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTemporal {
    pub introduced_at: DateTime<Utc>,
    pub last_reinforced_at: DateTime<Utc>,
    pub peak_relevance_at: DateTime<Utc>,
    /// When decay was last written back. Decay is measured from the later
    /// of this and `last_reinforced_at`.
    #[serde(default)]
    pub last_decayed_at: Option<DateTime<Utc>>,
}

impl NodeTemporal {
    /// All three timestamps set to `at`, never decayed.
    #[must_use]
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            introduced_at: at,
            last_reinforced_at: at,
            peak_relevance_at: at,
            last_decayed_at: None,
        }
    }
}

/// Free-form descriptive metadata. Never read by the algorithms.
pub type Metadata = BTreeMap<String, String>;

/// A vertex of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub cognitive_state: CognitiveState,
    pub temporal: NodeTemporal,
    #[serde(default)]
    pub real_world: Metadata,
    #[serde(default)]
    pub grounding: Metadata,
    #[serde(default)]
    pub failure_surface: Metadata,
}

impl Node {
    /// Create a node with default level and cognitive state, introduced at `at`.
    #[must_use]
    pub fn new(
        id: impl Into<NodeId>,
        node_type: NodeType,
        name: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            description: String::new(),
            level: Level::default(),
            cognitive_state: CognitiveState::default(),
            temporal: NodeTemporal::at(at),
            real_world: Metadata::new(),
            grounding: Metadata::new(),
            failure_surface: Metadata::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the difficulty on the level axis.
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: f64) -> Self {
        self.level.difficulty = difficulty;
        self
    }

    /// Replace the whole cognitive state.
    #[must_use]
    pub fn with_cognitive_state(mut self, state: CognitiveState) -> Self {
        self.cognitive_state = state;
        self
    }

    /// Bring every probability-like field into `[0, 1]` and the decay rate to `>= 0`.
    ///
    /// Returns `true` if anything changed.
    pub fn clamp_fields(&mut self) -> bool {
        let before = (self.level, self.cognitive_state);

        self.level.abstraction = clamp_unit(self.level.abstraction);
        self.level.difficulty = clamp_unit(self.level.difficulty);
        self.level.volatility = clamp_unit(self.level.volatility);

        let state = &mut self.cognitive_state;
        state.strength = clamp_unit(state.strength);
        state.activation = clamp_unit(state.activation);
        state.confidence = clamp_unit(state.confidence);
        if !state.decay_rate.is_finite() || state.decay_rate < 0.0 {
            state.decay_rate = 0.0;
        }

        before != (self.level, self.cognitive_state)
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// Weight dynamics of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeWeight {
    pub strength: f64,
    pub decay_rate: f64,
    pub reinforcement_rate: f64,
}

impl Default for EdgeWeight {
    fn default() -> Self {
        Self {
            strength: 0.5,
            decay_rate: crate::primitives::DEFAULT_DECAY_RATE,
            reinforcement_rate: 0.1,
        }
    }
}

/// Behavioural flags of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDynamics {
    pub inhibitory: bool,
    pub directional: bool,
}

impl EdgeDynamics {
    /// Flags implied by a relation kind.
    #[must_use]
    pub const fn for_relation(relation: RelationType) -> Self {
        Self {
            inhibitory: relation.is_inhibitory(),
            directional: true,
        }
    }
}

/// Lifecycle timestamps of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTemporal {
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub relation: RelationType,
    #[serde(default)]
    pub weight: EdgeWeight,
    pub dynamics: EdgeDynamics,
    pub confidence: f64,
    pub temporal: EdgeTemporal,
}

impl Edge {
    /// Create an edge with default weight, dynamics derived from the relation.
    #[must_use]
    pub fn new(
        id: impl Into<EdgeId>,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        relation: RelationType,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            from_node: from.into(),
            to_node: to.into(),
            relation,
            weight: EdgeWeight::default(),
            dynamics: EdgeDynamics::for_relation(relation),
            confidence: 0.5,
            temporal: EdgeTemporal {
                created_at: at,
                last_used_at: at,
            },
        }
    }

    /// Bring confidence and weight strength into `[0, 1]`. Returns `true` on change.
    pub fn clamp_fields(&mut self) -> bool {
        let before = (self.confidence, self.weight);
        self.confidence = clamp_unit(self.confidence);
        self.weight.strength = clamp_unit(self.weight.strength);
        self.weight.reinforcement_rate = clamp_unit(self.weight.reinforcement_rate);
        if !self.weight.decay_rate.is_finite() || self.weight.decay_rate < 0.0 {
            self.weight.decay_rate = 0.0;
        }
        before != (self.confidence, self.weight)
    }
}

// =============================================================================
// NODE UPDATE
// =============================================================================

/// A partial set of node fields written back by consolidation.
///
/// `None` leaves the stored field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub strength: Option<f64>,
    pub confidence: Option<f64>,
    pub activation: Option<f64>,
    pub last_reinforced_at: Option<DateTime<Utc>>,
    pub peak_relevance_at: Option<DateTime<Utc>>,
    pub last_decayed_at: Option<DateTime<Utc>>,
}

impl NodeUpdate {
    /// Check whether the update carries no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the update in place.
    ///
    /// Numeric fields are clamped to `[0, 1]`; `last_reinforced_at` and
    /// `last_decayed_at` never move backwards.
    pub fn apply_to(&self, node: &mut Node) {
        let state = &mut node.cognitive_state;
        if let Some(strength) = self.strength {
            state.strength = clamp_unit(strength);
        }
        if let Some(confidence) = self.confidence {
            state.confidence = clamp_unit(confidence);
        }
        if let Some(activation) = self.activation {
            state.activation = clamp_unit(activation);
        }
        if let Some(at) = self.last_reinforced_at {
            node.temporal.last_reinforced_at = node.temporal.last_reinforced_at.max(at);
        }
        if let Some(at) = self.peak_relevance_at {
            node.temporal.peak_relevance_at = at;
        }
        if let Some(at) = self.last_decayed_at {
            let previous = node.temporal.last_decayed_at;
            node.temporal.last_decayed_at = Some(previous.map_or(at, |p| p.max(at)));
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Engram system.
///
/// Missing entities during lookups are NOT errors; they degrade to
/// placeholder results. Only broken snapshots, bad input at the boundary,
/// and storage failures surface here.
#[derive(Debug, Error)]
pub enum EngramError {
    /// An edge references a node that is not part of the snapshot.
    #[error("Integrity violation: edge {edge} references missing node {missing}")]
    IntegrityViolation { edge: EdgeId, missing: NodeId },

    /// The same node id appears twice in one snapshot.
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// The same edge id appears twice in one snapshot.
    #[error("Duplicate edge: {0}")]
    DuplicateEdge(EdgeId),

    /// A write targeted a node that the repository does not hold.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Input rejected at the boundary (unknown enum names, bad arguments).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The configuration could not be read or parsed.
    #[error("Config error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================
