//! Build drivers: regenerate the graph artifact for a historical commit
//!
//! A driver checks a commit out into the working tree, runs the documentation build and
//! returns the graph description embedded in the generated output. Drivers mutate the
//! working tree, so commits are built strictly one after another.

/// Driver that checks out with git2 and runs an external command
pub mod command;
/// Explicit environment for the build process
pub mod environment;

pub use command::CommandBuildDriver;
pub use environment::BuildEnvironment;

use crate::error::{BuildError, TimelineResult};
use crate::types::Commit;
use regex::Regex;

/// Produces the raw graph description for one commit
pub trait BuildDriver {
    /// Build `commit` and return the embedded graph text
    fn build(&mut self, commit: &Commit) -> Result<String, BuildError>;

    /// Put the working tree back the way it was before the first build
    fn restore(&mut self) -> TimelineResult<()> {
        Ok(())
    }
}

/// Pull the single embedded graph out of generated output.
///
/// `pattern`'s first capture group is the graph text (the whole match when the pattern has
/// no groups). Zero or several matches are an error.
pub fn extract_graph(output: &str, pattern: &Regex) -> Result<String, BuildError> {
    let matches: Vec<regex::Captures> = pattern.captures_iter(output).collect();
    if matches.len() != 1 {
        return Err(BuildError::GraphMarkers {
            found: matches.len(),
        });
    }

    let caps = &matches[0];
    let text = caps
        .get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str())
        .unwrap_or_default();
    Ok(text.to_string())
}
