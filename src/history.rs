//! Per-commit snapshot extraction
//!
//! Every commit either yields a new [`Snapshot`] or is skipped with a reason. Build and
//! parse failures are expected during a long walk (old revisions often no longer build),
//! so they never end the walk; they are collected in the [`WalkReport`] instead.

use crate::build::BuildDriver;
use crate::contributors::ContributorLedger;
use crate::error::{BuildError, ParseError};
use crate::graph::canonicalize;
use crate::types::{Commit, Snapshot};

/// Why a commit did not produce a snapshot
#[derive(Debug)]
pub enum SkipReason {
    /// The build driver could not produce a graph
    Build(BuildError),
    /// The produced graph text did not parse
    Parse(ParseError),
    /// Canonically identical to the last accepted snapshot
    Unchanged,
}

/// Result of visiting one commit
#[derive(Debug)]
pub enum CommitOutcome {
    Accepted(Snapshot),
    Skipped(SkipReason),
}

/// Everything a walk produced, in commit order
#[derive(Debug, Default)]
pub struct WalkReport {
    /// Accepted snapshots, oldest first
    pub snapshots: Vec<Snapshot>,
    /// Skipped commits with their reasons
    pub skipped: Vec<(String, SkipReason)>,
}

impl WalkReport {
    /// Fold per-commit outcomes into a report, keeping commit order
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (String, CommitOutcome)>,
    {
        let mut report = Self::default();
        for (commit, outcome) in outcomes {
            match outcome {
                CommitOutcome::Accepted(snapshot) => report.snapshots.push(snapshot),
                CommitOutcome::Skipped(reason) => report.skipped.push((commit, reason)),
            }
        }
        report
    }

    /// Commits skipped because the graph did not change
    pub fn unchanged(&self) -> usize {
        self.skipped
            .iter()
            .filter(|(_, reason)| matches!(reason, SkipReason::Unchanged))
            .count()
    }

    /// Commits skipped because of a build or parse failure
    pub fn failed(&self) -> usize {
        self.skipped.len() - self.unchanged()
    }
}

/// Decides, commit by commit, whether the graph changed since the last accepted snapshot
pub struct HistoryWalker<'a> {
    ledger: &'a ContributorLedger,
    /// Canonical text of the last accepted snapshot
    baseline: Option<String>,
}

impl<'a> HistoryWalker<'a> {
    pub fn new(ledger: &'a ContributorLedger) -> Self {
        Self {
            ledger,
            baseline: None,
        }
    }

    /// Classify one commit given what its build produced.
    ///
    /// Only accepted snapshots move the baseline; skipped commits leave it untouched.
    pub fn visit(&mut self, commit: &Commit, raw: Result<String, BuildError>) -> CommitOutcome {
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Skipping {}: build failed: {}", commit.short_id(), e);
                return CommitOutcome::Skipped(SkipReason::Build(e));
            }
        };

        let canonical = match canonicalize(&raw) {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::warn!("Skipping {}: graph did not parse: {}", commit.short_id(), e);
                return CommitOutcome::Skipped(SkipReason::Parse(e));
            }
        };

        if self.baseline.as_deref() == Some(canonical.as_str()) {
            tracing::debug!("{}: graph unchanged", commit.short_id());
            return CommitOutcome::Skipped(SkipReason::Unchanged);
        }

        let (contributor_count, contributors) = match self.ledger.snapshot(&commit.id) {
            Some(known) => (known.count(), known.verified()),
            None => {
                tracing::debug!("{}: no contributor record", commit.short_id());
                (0, Vec::new())
            }
        };

        tracing::info!(
            "Accepted {} ({}), {} contributors",
            commit.short_id(),
            commit.timestamp.format("%Y-%m-%d"),
            contributor_count
        );

        self.baseline = Some(canonical.clone());
        CommitOutcome::Accepted(Snapshot {
            commit: commit.id.clone(),
            timestamp: commit.timestamp,
            graph: canonical,
            contributor_count,
            contributors,
        })
    }

    /// Build every commit in order and collect the outcomes.
    ///
    /// Commits are built strictly one at a time: the driver owns the working tree.
    pub fn walk<D>(&mut self, commits: &[Commit], driver: &mut D) -> WalkReport
    where
        D: BuildDriver + ?Sized,
    {
        let total = commits.len();
        let outcomes = commits.iter().enumerate().map(|(i, commit)| {
            tracing::info!("[{}/{}] Building {}", i + 1, total, commit.short_id());
            let raw = driver.build(commit);
            (commit.id.clone(), self.visit(commit, raw))
        });
        let report = WalkReport::from_outcomes(outcomes);

        tracing::info!(
            "Walked {} commits: {} snapshots, {} unchanged, {} failed",
            total,
            report.snapshots.len(),
            report.unchanged(),
            report.failed()
        );
        report
    }
}
