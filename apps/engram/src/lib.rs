//! # Engram
//!
//! Command-line front end of the Engram knowledge graph. The binary in
//! `main.rs` only sets up logging and hands off to [`cli::execute`].

pub mod cli;
pub mod config;
