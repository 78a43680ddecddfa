//! # depgraph-timeline - Dependency graph history as an animated timeline
//!
//! Walks the commit history of a documentation project, rebuilds the dependency graph
//! the project's build tool emits at every commit, and assembles the distinct graphs into
//! one self-contained HTML page that plays them back in a loop, annotated with the
//! contributors known at each point.
//!
//! ## Overview
//!
//! Graph descriptions (Graphviz DOT) are canonicalized before comparison, so builds that
//! differ only in whitespace, node order or attribute order collapse into one snapshot.
//! Contributors come from a separate history source (the GitHub GraphQL API or the local
//! git log) and are folded into a cumulative ledger that only grows.
//!
//! ## Architecture
//!
//! ```text
//! commits ──► HistoryWalker ──► BuildDriver ──► raw DOT
//!                  │                               │
//!                  │                        canonicalize()
//!                  ▼                               │
//!          ContributorLedger ◄─ history source     ▼
//!                  │                        dedup against last
//!                  └────────► Snapshot ◄──── accepted snapshot
//!                                 │
//!                        TimelineAssembler ──► timeline.html
//! ```
//!
//! ## Modules
//!
//! - [`graph`]: DOT lexer, parser, writer and canonicalizer
//! - [`contributors`]: contributor identities, history sources and the ledger
//! - [`history`]: per-commit accept/skip decisions
//! - [`timeline`]: HTML timeline assembly
//! - [`build`]: build drivers and the explicit build environment
//! - [`git`]: chronological commit listing with git2
//! - [`pipeline`]: end-to-end orchestration
//! - [`capture`]: headless-browser SVG capture
//! - [`convert`]: SVG to PNG frame conversion
//! - [`config`]: configuration with environment variable overrides
//! - [`error`]: error types and result aliases
//! - [`paths`]: platform config and cache locations
//!
//! ## Usage Example
//!
//! ```no_run
//! use depgraph_timeline::config::Config;
//! use depgraph_timeline::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new()?;
//!     let summary = Pipeline::new(config).run().await?;
//!     println!("{} snapshots", summary.snapshots);
//!     Ok(())
//! }
//! ```

/// Build drivers that regenerate the graph for a commit
pub mod build;

/// Headless-browser capture of rendered SVG
pub mod capture;

/// Configuration management with environment variable overrides
pub mod config;

/// Contributor identities, history sources and the cumulative ledger
pub mod contributors;

/// Batch SVG to PNG conversion
pub mod convert;

/// Error types and utilities
pub mod error;

/// Git repository walking and commit extraction
pub mod git;

/// Graph description model, parser and canonical form
pub mod graph;

/// Per-commit snapshot extraction and deduplication
pub mod history;

/// Platform-specific config and cache locations
pub mod paths;

/// End-to-end orchestration
pub mod pipeline;

/// Timeline HTML assembly
pub mod timeline;

/// Core data types shared across modules
pub mod types;
