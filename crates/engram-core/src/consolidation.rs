//! # Consolidation Engine
//!
//! The decay/reinforcement memory model, and the only producer of node
//! mutations.
//!
//! `decay` and `reinforce` are pure: they compute a [`NodeUpdate`] from a
//! node and a clock reading. `consolidate`, `decay_node` and
//! `reinforce_node` push those updates through a [`Repository`], which is
//! expected to serialize writes per node id. Concurrent decay and
//! reinforcement of one node is last-writer-wins.

use crate::primitives::{
    DECAY_WRITE_THRESHOLD, DEFAULT_DECAY_RATE, DEFAULT_PAGE_SIZE, LOW_CONFIDENCE_THRESHOLD,
    MILLIS_PER_DAY, REINFORCE_CONFIDENCE_STEP, REINFORCE_STRENGTH_STEP, WEAK_STRENGTH_THRESHOLD,
};
use crate::storage::Repository;
use crate::{EngramError, Node, NodeId, NodeUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tunable knobs of the memory model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Per-day rate used for nodes whose own rate is zero, negative or not finite.
    pub default_decay_rate: f64,
    /// Decay results closer than this to the current strength are not written.
    pub decay_write_threshold: f64,
    pub reinforce_strength_step: f64,
    pub reinforce_confidence_step: f64,
    pub weak_strength_threshold: f64,
    pub low_confidence_threshold: f64,
    /// Nodes per `list_nodes` call during a consolidation pass.
    pub page_size: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            default_decay_rate: DEFAULT_DECAY_RATE,
            decay_write_threshold: DECAY_WRITE_THRESHOLD,
            reinforce_strength_step: REINFORCE_STRENGTH_STEP,
            reinforce_confidence_step: REINFORCE_CONFIDENCE_STEP,
            weak_strength_threshold: WEAK_STRENGTH_THRESHOLD,
            low_confidence_threshold: LOW_CONFIDENCE_THRESHOLD,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// What decay computed for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayOutcome {
    pub id: NodeId,
    /// Days since last reinforcement, never negative.
    pub elapsed_days: f64,
    pub previous_strength: f64,
    pub new_strength: f64,
    /// Present only when the change exceeds the write threshold.
    pub update: Option<NodeUpdate>,
}

impl DecayOutcome {
    /// Check whether this outcome should be written back.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.update.is_some()
    }
}

/// Aggregate memory diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationStatus {
    pub total_nodes: usize,
    pub weak_concepts: usize,
    pub low_confidence: usize,
    /// 0.0 for an empty node set.
    pub average_strength: f64,
    /// 0.0 for an empty node set.
    pub average_confidence: f64,
}

/// Result of one full decay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub examined: usize,
    pub updated: usize,
    pub skipped: usize,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Decay and reinforcement over nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolidationEngine {
    config: ConsolidationConfig,
}

impl ConsolidationEngine {
    /// Create an engine with default knobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: ConsolidationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    fn effective_rate(&self, rate: f64) -> f64 {
        if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            self.config.default_decay_rate
        }
    }

    /// Exponential decay of strength since the last reinforcement or the
    /// last written decay, whichever is later.
    ///
    /// A baseline in the future counts as zero elapsed time.
    pub fn decay(&self, node: &Node, now: DateTime<Utc>) -> DecayOutcome {
        let temporal = &node.temporal;
        let baseline = temporal
            .last_decayed_at
            .map_or(temporal.last_reinforced_at, |at| at.max(temporal.last_reinforced_at));
        let elapsed_ms = now.signed_duration_since(baseline).num_milliseconds();
        let elapsed_days = (elapsed_ms as f64 / MILLIS_PER_DAY).max(0.0);

        let rate = self.effective_rate(node.cognitive_state.decay_rate);
        let previous_strength = node.cognitive_state.strength;
        let new_strength = previous_strength * (-rate * elapsed_days).exp();

        let update = ((new_strength - previous_strength).abs() > self.config.decay_write_threshold)
            .then(|| NodeUpdate {
                strength: Some(new_strength),
                last_decayed_at: Some(now),
                ..NodeUpdate::default()
            });

        DecayOutcome {
            id: node.id.clone(),
            elapsed_days,
            previous_strength,
            new_strength,
            update,
        }
    }

    /// Boost a node after use. Every field is capped at 1.
    pub fn reinforce(&self, node: &Node, now: DateTime<Utc>) -> NodeUpdate {
        let state = &node.cognitive_state;
        NodeUpdate {
            strength: Some((state.strength + self.config.reinforce_strength_step).min(1.0)),
            confidence: Some((state.confidence + self.config.reinforce_confidence_step).min(1.0)),
            activation: Some(1.0),
            last_reinforced_at: Some(node.temporal.last_reinforced_at.max(now)),
            peak_relevance_at: Some(now),
            last_decayed_at: None,
        }
    }

    /// Weak and low-confidence counts plus mean strength and confidence.
    pub fn status<'n>(&self, nodes: impl IntoIterator<Item = &'n Node>) -> ConsolidationStatus {
        let mut status = ConsolidationStatus::default();
        let mut strength_sum = 0.0;
        let mut confidence_sum = 0.0;

        for node in nodes {
            let state = &node.cognitive_state;
            status.total_nodes += 1;
            if state.strength < self.config.weak_strength_threshold {
                status.weak_concepts += 1;
            }
            if state.confidence < self.config.low_confidence_threshold {
                status.low_confidence += 1;
            }
            strength_sum += state.strength;
            confidence_sum += state.confidence;
        }

        if status.total_nodes > 0 {
            let n = status.total_nodes as f64;
            status.average_strength = strength_sum / n;
            status.average_confidence = confidence_sum / n;
        }
        status
    }

    /// Decay every node in the repository and write back the applied results.
    pub fn consolidate(
        &self,
        repository: &mut impl Repository,
        now: DateTime<Utc>,
    ) -> Result<ConsolidationReport, EngramError> {
        let limit = self.config.page_size.max(1);
        let mut pending = Vec::new();
        let mut report = ConsolidationReport::default();
        let mut page = 1;

        loop {
            let batch = repository.list_nodes(page, limit)?;
            for node in &batch.items {
                report.examined += 1;
                match self.decay(node, now).update {
                    Some(update) => pending.push((node.id.clone(), update)),
                    None => report.skipped += 1,
                }
            }
            if !batch.has_more {
                break;
            }
            page += 1;
        }

        for (id, update) in &pending {
            repository.update_node(id, update)?;
            report.updated += 1;
        }

        tracing::info!(
            examined = report.examined,
            updated = report.updated,
            skipped = report.skipped,
            "consolidation pass complete"
        );
        Ok(report)
    }

    /// Decay one stored node, writing back only an applied result.
    pub fn decay_node(
        &self,
        repository: &mut impl Repository,
        id: &NodeId,
        now: DateTime<Utc>,
    ) -> Result<DecayOutcome, EngramError> {
        let node = repository
            .get_node(id)?
            .ok_or_else(|| EngramError::NodeNotFound(id.clone()))?;
        let outcome = self.decay(&node, now);
        if let Some(update) = &outcome.update {
            repository.update_node(id, update)?;
        }
        Ok(outcome)
    }

    /// Reinforce one stored node and return its new state.
    pub fn reinforce_node(
        &self,
        repository: &mut impl Repository,
        id: &NodeId,
        now: DateTime<Utc>,
    ) -> Result<Node, EngramError> {
        let node = repository
            .get_node(id)?
            .ok_or_else(|| EngramError::NodeNotFound(id.clone()))?;
        let update = self.reinforce(&node, now);
        tracing::debug!(node = %id, "reinforcing");
        repository.update_node(id, &update)
    }
}

// =============================================================================
// TESTS
// =============================================================================
