//! Git repository operations for the history walk
//!
//! Provides the chronological commit sequence (optionally restricted to commits touching
//! a set of paths) and a local author history for the contributor ledger.

/// Git repository walking and commit extraction
pub mod walker;

pub use walker::{GitWalker, co_authors};
