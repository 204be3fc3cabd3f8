//! # Engram CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Create an empty database
//! - `import` / `export` - Move graphs in and out (ENGR binary or JSON)
//! - `status` - Counts and memory diagnostics
//! - `explain`, `compare`, `path`, `deps`, `contradictions`, `curriculum` - Reasoning
//! - `search`, `coverage`, `stats` - Indexed search
//! - `decay`, `reinforce` - Consolidation

mod commands;

use crate::config::EngramConfig;
use clap::{Parser, Subcommand};
use engram_core::EngramError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Engram - knowledge graph reasoning and memory consolidation
#[derive(Parser, Debug)]
#[command(name = "engram")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the redb database (overrides storage.database)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to engram.toml (overrides ENGRAM_CONFIG)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Replace the database contents with a graph file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Input format (auto, engr, json)
        #[arg(short = 't', long, default_value = "auto")]
        format: String,
    },

    /// Export the database to a graph file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (engr, json)
        #[arg(short = 't', long, default_value = "engr")]
        format: String,
    },

    /// Show graph size and memory diagnostics
    Status,

    /// Explain a concept through its direct relations
    Explain {
        /// Node id
        id: String,
    },

    /// Compare two concepts
    Compare {
        /// First node id
        a: String,
        /// Second node id
        b: String,
    },

    /// Find the shortest path between two concepts
    Path {
        /// Start node id
        from: String,
        /// End node id
        to: String,
        /// Maximum hops (default: query.path_depth)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// List everything a concept depends on
    Deps {
        /// Node id
        id: String,
        /// Maximum hops (default: query.dependency_depth)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// List inhibitory relations (fails_on, competes_with)
    Contradictions,

    /// Generate a learning path toward a target concept
    Curriculum {
        /// Target node id
        target: String,
        /// Already known node ids (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        known: Vec<String>,
    },

    /// Ranked full-text search
    Search {
        /// Query text
        query: String,
        /// Maximum results (default: query.search_limit)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Keep only these node types (comma-separated)
        #[arg(short = 't', long, value_delimiter = ',')]
        node_types: Vec<String>,
        /// Relation kinds to pass along with the filter (comma-separated)
        #[arg(short = 'r', long, value_delimiter = ',')]
        edge_types: Vec<String>,
    },

    /// Report which query terms the graph knows about
    Coverage {
        /// Query text
        query: String,
    },

    /// Show index statistics
    Stats,

    /// Apply time decay (all nodes unless --node is given)
    Decay {
        /// Decay a single node
        #[arg(short, long)]
        node: Option<String>,
    },

    /// Reinforce a concept after use
    Reinforce {
        /// Node id
        id: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), EngramError> {
    let config = EngramConfig::load(cli.config.as_deref())?;
    let database = cli
        .database
        .unwrap_or_else(|| config.storage.database.clone());

    let ctx = Context {
        database,
        config,
        json_mode: cli.json_mode,
        verbose: cli.verbose,
    };
    tracing::debug!(database = %ctx.database.display(), "resolved database");

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Import { input, format }) => cmd_import(&ctx, &input, &format),
        Some(Commands::Export { output, format }) => cmd_export(&ctx, &output, &format),
        Some(Commands::Status) => cmd_status(&ctx),
        Some(Commands::Explain { id }) => cmd_explain(&ctx, &id),
        Some(Commands::Compare { a, b }) => cmd_compare(&ctx, &a, &b),
        Some(Commands::Path { from, to, depth }) => cmd_path(&ctx, &from, &to, depth),
        Some(Commands::Deps { id, depth }) => cmd_deps(&ctx, &id, depth),
        Some(Commands::Contradictions) => cmd_contradictions(&ctx),
        Some(Commands::Curriculum { target, known }) => cmd_curriculum(&ctx, &target, &known),
        Some(Commands::Search {
            query,
            limit,
            node_types,
            edge_types,
        }) => cmd_search(&ctx, &query, limit, &node_types, &edge_types),
        Some(Commands::Coverage { query }) => cmd_coverage(&ctx, &query),
        Some(Commands::Stats) => cmd_stats(&ctx),
        Some(Commands::Decay { node }) => cmd_decay(&ctx, node.as_deref()),
        Some(Commands::Reinforce { id }) => cmd_reinforce(&ctx, &id),
        None => {
            // No subcommand - show status by default
            cmd_status(&ctx)
        }
    }
}
