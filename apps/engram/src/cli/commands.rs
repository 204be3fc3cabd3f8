//! # CLI Command Implementations
//!
//! Every command opens the redb store, and read commands load a full
//! snapshot from it before running the engines.

use crate::config::EngramConfig;
use chrono::Utc;
use engram_core::formats::MAX_PERSISTENCE_PAYLOAD_SIZE;
use engram_core::{
    ConsolidationEngine, EngramError, GraphSnapshot, NodeId, NodeType, QueryOptimizer,
    ReasoningEngine, RedbRepository, RelationType, SearchFilters, SnapshotData,
    primitives::MAGIC_BYTES, snapshot_data_from_bytes, snapshot_to_bytes,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// =============================================================================
// CONTEXT
// =============================================================================

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub config: EngramConfig,
    pub json_mode: bool,
    pub verbose: bool,
}

impl Context {
    /// Open (or create) the configured database.
    pub fn open(&self) -> Result<RedbRepository, EngramError> {
        RedbRepository::open(&self.database)
    }

    /// Open the configured database, failing if it has not been created.
    pub fn open_existing(&self) -> Result<RedbRepository, EngramError> {
        if !self.database.is_file() {
            return Err(EngramError::IoError(format!(
                "Database not found: {}. Run `engram init` first.",
                self.database.display()
            )));
        }
        self.open()
    }

    /// Load the whole graph from an existing database.
    pub fn snapshot(&self) -> Result<GraphSnapshot, EngramError> {
        let repo = self.open_existing()?;
        GraphSnapshot::load(&repo, self.config.storage.page_size)
    }

    fn reasoning_snapshot(&self) -> Result<GraphSnapshot, EngramError> {
        let snapshot = self.snapshot()?;
        if self.verbose {
            tracing::info!(
                nodes = snapshot.node_count(),
                edges = snapshot.edge_count(),
                database = %self.database.display(),
                "graph loaded"
            );
        }
        Ok(snapshot)
    }
}

/// Pretty-print any result as JSON.
fn print_json<T: Serialize>(value: &T) -> Result<(), EngramError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| EngramError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate an input path: it must exist, be a regular file, and not exceed
/// the snapshot payload limit.
fn validate_input_file(path: &Path) -> Result<PathBuf, EngramError> {
    let canonical = path.canonicalize().map_err(|e| {
        EngramError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(EngramError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| EngramError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_PERSISTENCE_PAYLOAD_SIZE as u64 {
        return Err(EngramError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    Ok(canonical)
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, EngramError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        EngramError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(EngramError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| EngramError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Decode graph file contents. `auto` picks ENGR when the magic bytes match.
pub fn parse_graph_file(bytes: &[u8], format: &str) -> Result<SnapshotData, EngramError> {
    let format = match format {
        "auto" if bytes.starts_with(MAGIC_BYTES) => "engr",
        "auto" => "json",
        other => other,
    };

    match format {
        "engr" => snapshot_data_from_bytes(bytes),
        "json" => serde_json::from_slice(bytes)
            .map_err(|e| EngramError::InvalidInput(format!("Invalid graph JSON: {}", e))),
        other => Err(EngramError::InvalidInput(format!(
            "Unknown format: {}. Use: auto, engr, json",
            other
        ))),
    }
}

// =============================================================================
// STORE COMMANDS
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), EngramError> {
    if ctx.database.exists() {
        if !force {
            return Err(EngramError::InvalidInput(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| EngramError::IoError(format!("Remove database: {}", e)))?;
    }

    let _repo = ctx.open()?;
    tracing::info!(database = %ctx.database.display(), "database initialized");
    println!("Initialized new database at {:?}", ctx.database);
    Ok(())
}

/// Replace the database contents with a graph file.
pub fn cmd_import(ctx: &Context, input: &Path, format: &str) -> Result<(), EngramError> {
    let validated = validate_input_file(input)?;
    let bytes = std::fs::read(&validated)
        .map_err(|e| EngramError::IoError(format!("Read file: {}", e)))?;
    let data = parse_graph_file(&bytes, format)?;

    let mut repo = ctx.open()?;
    repo.replace_all(&data)?;

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "imported_nodes": data.nodes.len(),
            "imported_edges": data.edges.len(),
        }));
    }
    println!(
        "Imported graph: {} nodes, {} edges",
        data.nodes.len(),
        data.edges.len()
    );
    Ok(())
}

/// Export the database to a graph file.
pub fn cmd_export(ctx: &Context, output: &Path, format: &str) -> Result<(), EngramError> {
    let validated = validate_output_path(output)?;
    let snapshot = ctx.snapshot()?;

    let data = match format {
        "engr" => snapshot_to_bytes(&snapshot)?,
        "json" => serde_json::to_vec_pretty(&SnapshotData::from(&snapshot))
            .map_err(|e| EngramError::SerializationError(e.to_string()))?,
        other => {
            return Err(EngramError::InvalidInput(format!(
                "Unknown format: {}. Use: engr, json",
                other
            )));
        }
    };

    std::fs::write(&validated, &data)
        .map_err(|e| EngramError::IoError(format!("Write file: {}", e)))?;
    println!("Exported {} bytes to {:?}", data.len(), validated);
    Ok(())
}

/// Show graph size and memory diagnostics.
pub fn cmd_status(ctx: &Context) -> Result<(), EngramError> {
    let snapshot = ctx.snapshot()?;
    let engine = ConsolidationEngine::with_config(ctx.config.consolidation);
    let status = engine.status(snapshot.nodes());
    let contradictions = ReasoningEngine::new(&snapshot).detect_contradictions().len();

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "node_count": snapshot.node_count(),
            "edge_count": snapshot.edge_count(),
            "contradictions": contradictions,
            "memory": status,
        }));
    }

    println!("Engram Graph Status");
    println!("===================");
    println!("Database: {:?}", ctx.database);
    println!();
    println!("Nodes:          {}", snapshot.node_count());
    println!("Edges:          {}", snapshot.edge_count());
    println!("Contradictions: {}", contradictions);
    println!();
    println!("Weak concepts:  {}", status.weak_concepts);
    println!("Low confidence: {}", status.low_confidence);
    println!("Avg strength:   {:.3}", status.average_strength);
    println!("Avg confidence: {:.3}", status.average_confidence);
    Ok(())
}

// =============================================================================
// REASONING COMMANDS
// =============================================================================

/// Explain a concept.
pub fn cmd_explain(ctx: &Context, id: &str) -> Result<(), EngramError> {
    let snapshot = ctx.reasoning_snapshot()?;
    let explanation = ReasoningEngine::new(&snapshot).explain_concept(&NodeId::new(id));

    if ctx.json_mode {
        return print_json(&explanation);
    }

    let Some(node) = &explanation.node else {
        println!("Node {} not found", id);
        return Ok(());
    };

    println!("{} ({}, {})", explanation.name, node.id, node.node_type);
    if !node.description.is_empty() {
        println!("  {}", node.description);
    }
    println!(
        "  difficulty {:.2}, strength {:.2}, confidence {:.2}",
        node.level.difficulty, node.cognitive_state.strength, node.cognitive_state.confidence
    );
    for (relation, related) in &explanation.outgoing {
        for r in related {
            println!("  -{}-> {} ({})", relation, r.name, r.id);
        }
    }
    for (relation, related) in &explanation.incoming {
        for r in related {
            println!("  <-{}- {} ({})", relation, r.name, r.id);
        }
    }
    Ok(())
}

/// Compare two concepts.
pub fn cmd_compare(ctx: &Context, a: &str, b: &str) -> Result<(), EngramError> {
    let snapshot = ctx.reasoning_snapshot()?;
    let comparison =
        ReasoningEngine::new(&snapshot).compare_concepts(&NodeId::new(a), &NodeId::new(b));

    if ctx.json_mode {
        return print_json(&comparison);
    }

    println!("{} vs {}", comparison.a.name, comparison.b.name);
    match (comparison.level, comparison.cognitive, comparison.relation_overlap) {
        (Some(level), Some(cognitive), Some(overlap)) => {
            println!("  abstraction  {:+.3}", level.abstraction);
            println!("  difficulty   {:+.3}", level.difficulty);
            println!("  volatility   {:+.3}", level.volatility);
            println!("  strength     {:+.3}", cognitive.strength);
            println!("  activation   {:+.3}", cognitive.activation);
            println!("  confidence   {:+.3}", cognitive.confidence);
            println!("  relation overlap {:.3}", overlap);
            let shared: Vec<_> = comparison
                .shared_relations
                .iter()
                .map(|r| r.as_str())
                .collect();
            println!("  shared relations: {}", shared.join(", "));
        }
        _ => println!("  (cannot compare: a node is missing)"),
    }
    Ok(())
}

/// Find the shortest path between two concepts.
pub fn cmd_path(
    ctx: &Context,
    from: &str,
    to: &str,
    depth: Option<usize>,
) -> Result<(), EngramError> {
    let depth = depth.unwrap_or(ctx.config.query.path_depth);
    let snapshot = ctx.reasoning_snapshot()?;
    let path =
        ReasoningEngine::new(&snapshot).find_path(&NodeId::new(from), &NodeId::new(to), depth);

    if ctx.json_mode {
        return print_json(&path);
    }

    if path.is_empty() {
        println!("No path found from {} to {} within {} hops", from, to, depth);
    } else {
        println!("Path ({} hops):", path.hops());
        println!("  {}", path.names.join(" -> "));
    }
    Ok(())
}

/// List everything a concept depends on.
pub fn cmd_deps(ctx: &Context, id: &str, depth: Option<usize>) -> Result<(), EngramError> {
    let depth = depth.unwrap_or(ctx.config.query.dependency_depth);
    let snapshot = ctx.reasoning_snapshot()?;
    let deps = ReasoningEngine::new(&snapshot).compute_dependencies(&NodeId::new(id), depth);

    if ctx.json_mode {
        return print_json(&deps);
    }

    println!("{} depends on {} concepts:", id, deps.len());
    for dep in &deps {
        println!("  [{}] {} ({})", dep.depth, snapshot.name_of(&dep.id), dep.id);
    }
    Ok(())
}

/// List inhibitory relations.
pub fn cmd_contradictions(ctx: &Context) -> Result<(), EngramError> {
    let snapshot = ctx.reasoning_snapshot()?;
    let contradictions = ReasoningEngine::new(&snapshot).detect_contradictions();

    if ctx.json_mode {
        return print_json(&contradictions);
    }

    println!("{} contradictions", contradictions.len());
    for c in &contradictions {
        println!(
            "  {} -{}-> {}",
            snapshot.name_of(&c.node_a),
            c.relation,
            snapshot.name_of(&c.node_b)
        );
    }
    Ok(())
}

/// Generate a learning path.
pub fn cmd_curriculum(ctx: &Context, target: &str, known: &[String]) -> Result<(), EngramError> {
    let snapshot = ctx.reasoning_snapshot()?;
    let known: BTreeSet<NodeId> = known
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(NodeId::new)
        .collect();
    let curriculum =
        ReasoningEngine::new(&snapshot).generate_curriculum(&known, &NodeId::new(target));

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "curriculum": curriculum,
            "estimated_time": curriculum.estimated_time(),
        }));
    }

    if curriculum.is_empty() {
        println!("Nothing left to learn for {}", target);
        return Ok(());
    }

    println!(
        "Learning path to {} ({} steps, {}):",
        snapshot.name_of(&curriculum.target),
        curriculum.steps.len(),
        curriculum.estimated_time()
    );
    for (i, step) in curriculum.steps.iter().enumerate() {
        println!("  {}. {} (difficulty {:.2})", i + 1, step.name, step.difficulty);
    }
    if !curriculum.cyclic.is_empty() {
        let cyclic: Vec<_> = curriculum.cyclic.iter().map(NodeId::as_str).collect();
        println!("  warning: dependency cycle through {}", cyclic.join(", "));
    }
    Ok(())
}

// =============================================================================
// SEARCH COMMANDS
// =============================================================================

fn build_optimizer(ctx: &Context, snapshot: &GraphSnapshot) -> QueryOptimizer {
    let mut optimizer = QueryOptimizer::with_config(ctx.config.optimizer);
    optimizer.build(snapshot);
    optimizer
}

/// Parse comma-separated enum names, rejecting unknown ones.
pub fn parse_names<T>(names: &[String]) -> Result<Vec<T>, EngramError>
where
    T: std::str::FromStr<Err = EngramError>,
{
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::parse)
        .collect()
}

/// Ranked full-text search.
pub fn cmd_search(
    ctx: &Context,
    query: &str,
    limit: Option<usize>,
    node_types: &[String],
    edge_types: &[String],
) -> Result<(), EngramError> {
    let filters = SearchFilters {
        node_types: parse_names::<NodeType>(node_types)?,
        edge_types: parse_names::<RelationType>(edge_types)?,
        max_results: Some(limit.unwrap_or(ctx.config.query.search_limit)),
    };

    let snapshot = ctx.snapshot()?;
    let optimizer = build_optimizer(ctx, &snapshot);
    let hits = optimizer.search_with_filters(query, &filters);

    if ctx.json_mode {
        return print_json(&hits);
    }

    if hits.is_empty() {
        println!("No results for {:?}", query);
        return Ok(());
    }
    for hit in &hits {
        println!("  {:.3}  {} ({})", hit.score, snapshot.name_of(&hit.id), hit.id);
    }
    Ok(())
}

/// Report which query terms the graph knows about.
pub fn cmd_coverage(ctx: &Context, query: &str) -> Result<(), EngramError> {
    let snapshot = ctx.snapshot()?;
    let coverage = build_optimizer(ctx, &snapshot).coverage(query);

    if ctx.json_mode {
        return print_json(&coverage);
    }

    println!("Coverage: {:.0}%", coverage.score * 100.0);
    println!("  covered: {}", coverage.covered.join(", "));
    println!("  missing: {}", coverage.missing.join(", "));
    Ok(())
}

/// Show index statistics.
pub fn cmd_stats(ctx: &Context) -> Result<(), EngramError> {
    let snapshot = ctx.snapshot()?;
    let stats = build_optimizer(ctx, &snapshot).stats();

    if ctx.json_mode {
        return print_json(&stats);
    }

    println!("Index Statistics");
    println!("================");
    println!("Full-text terms:   {}", stats.full_text_terms);
    println!("Node types:        {}", stats.node_types);
    println!("Edge types:        {}", stats.edge_types);
    println!("Bloom filter bits: {}", stats.bloom_filter_size);
    println!("Estimated memory:  {} bytes", stats.estimated_memory_bytes);
    Ok(())
}

// =============================================================================
// CONSOLIDATION COMMANDS
// =============================================================================

/// Apply time decay to one node or the whole store.
pub fn cmd_decay(ctx: &Context, node: Option<&str>) -> Result<(), EngramError> {
    let engine = ConsolidationEngine::with_config(ctx.config.consolidation);
    let mut repo = ctx.open_existing()?;
    let now = Utc::now();

    match node {
        Some(id) => {
            let outcome = engine.decay_node(&mut repo, &NodeId::new(id), now)?;
            if ctx.json_mode {
                return print_json(&outcome);
            }
            println!(
                "{}: strength {:.3} -> {:.3} after {:.1} days{}",
                outcome.id,
                outcome.previous_strength,
                outcome.new_strength,
                outcome.elapsed_days,
                if outcome.is_applied() { "" } else { " (not written)" }
            );
        }
        None => {
            let report = engine.consolidate(&mut repo, now)?;
            if ctx.json_mode {
                return print_json(&report);
            }
            println!(
                "Examined {} nodes: {} updated, {} unchanged",
                report.examined, report.updated, report.skipped
            );
        }
    }
    Ok(())
}

/// Reinforce a concept after use.
pub fn cmd_reinforce(ctx: &Context, id: &str) -> Result<(), EngramError> {
    let engine = ConsolidationEngine::with_config(ctx.config.consolidation);
    let mut repo = ctx.open_existing()?;
    let node = engine.reinforce_node(&mut repo, &NodeId::new(id), Utc::now())?;

    if ctx.json_mode {
        return print_json(&node);
    }

    let state = node.cognitive_state;
    println!(
        "{}: strength {:.2}, confidence {:.2}, activation {:.2}",
        node.name, state.strength, state.confidence, state.activation
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_format_detects_json() {
        let data = parse_graph_file(br#"{"nodes": [], "edges": []}"#, "auto").expect("parse");
        assert!(data.nodes.is_empty());
    }

    #[test]
    fn unknown_relation_in_json_is_invalid_input() {
        let json = br#"{"edges": [{"id": "e", "from_node": "a", "to_node": "b",
            "relation": "hates", "dynamics": {"inhibitory": false, "directional": true},
            "confidence": 0.5,
            "temporal": {"created_at": "2026-01-01T00:00:00Z",
                         "last_used_at": "2026-01-01T00:00:00Z"}}]}"#;
        assert!(matches!(
            parse_graph_file(json, "json"),
            Err(EngramError::InvalidInput(_))
        ));
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(matches!(
            parse_graph_file(b"", "yaml"),
            Err(EngramError::InvalidInput(_))
        ));
    }

    #[test]
    fn parse_names_rejects_unknown() {
        let ok: Vec<NodeType> =
            parse_names(&["concept".to_string(), " tool ".to_string(), String::new()])
                .expect("parse");
        assert_eq!(ok, vec![NodeType::Concept, NodeType::Tool]);
        assert!(parse_names::<RelationType>(&["likes".to_string()]).is_err());
    }

    #[test]
    fn output_path_without_parent_uses_cwd() {
        let path = validate_output_path(Path::new("out.engr")).expect("validate");
        assert!(path.ends_with("out.engr"));
    }
}
