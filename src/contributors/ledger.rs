//! Cumulative, append-only contributor ledger

use super::identity::{ContributorIdentity, VerifiedContributor};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// A commit together with every identity credited on it (author and co-authors)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoredCommit {
    pub id: String,
    pub committed_at: DateTime<Utc>,
    pub authors: Vec<ContributorIdentity>,
}

/// All contributors seen at or before one commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSnapshot<'a> {
    pub commit: &'a str,
    pub committed_at: DateTime<Utc>,
    /// Distinct identities in first-seen order
    pub contributors: &'a [ContributorIdentity],
}

impl LedgerSnapshot<'_> {
    pub fn count(&self) -> usize {
        self.contributors.len()
    }

    /// Only the contributors with a verified platform account
    pub fn verified(&self) -> Vec<VerifiedContributor> {
        self.contributors
            .iter()
            .filter_map(ContributorIdentity::as_verified)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    commit: String,
    committed_at: DateTime<Utc>,
    /// Length of the contributor list after this commit
    count: usize,
}

/// Running set of contributors, snapshotted after every recorded commit.
///
/// The contributor list only ever grows, so a snapshot is a prefix of it.
#[derive(Debug, Clone, Default)]
pub struct ContributorLedger {
    seen: HashSet<String>,
    contributors: Vec<ContributorIdentity>,
    entries: Vec<Entry>,
    by_commit: HashMap<String, usize>,
}

impl ContributorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from commits in chronological order
    pub fn from_history(commits: &[AuthoredCommit]) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for commit in commits {
            ledger.record(commit)?;
        }
        tracing::info!(
            "Contributor ledger: {} commits, {} contributors",
            ledger.entries.len(),
            ledger.contributors.len()
        );
        Ok(ledger)
    }

    /// Add a commit's identities and snapshot the running set.
    ///
    /// Fails when `commit` is older than the previously recorded commit.
    pub fn record(&mut self, commit: &AuthoredCommit) -> Result<LedgerSnapshot<'_>, LedgerError> {
        if let Some(previous) = self.entries.last()
            && commit.committed_at < previous.committed_at
        {
            return Err(LedgerError::OrderingViolation {
                commit: commit.id.clone(),
                found: commit.committed_at.to_rfc3339(),
                previous: previous.commit.clone(),
                previous_at: previous.committed_at.to_rfc3339(),
            });
        }

        for identity in &commit.authors {
            if self.seen.insert(identity.key().to_string()) {
                tracing::debug!(
                    "New contributor {} at {}",
                    identity.display_name(),
                    crate::types::short_id(&commit.id)
                );
                self.contributors.push(identity.clone());
            }
        }

        self.by_commit
            .insert(commit.id.clone(), self.entries.len());
        self.entries.push(Entry {
            commit: commit.id.clone(),
            committed_at: commit.committed_at,
            count: self.contributors.len(),
        });

        // The entry was pushed just above
        let index = self.entries.len() - 1;
        Ok(self.snapshot_at(index))
    }

    /// Snapshot recorded for `commit`, if the ledger has seen it
    pub fn snapshot(&self, commit: &str) -> Option<LedgerSnapshot<'_>> {
        self.by_commit
            .get(commit)
            .map(|&index| self.snapshot_at(index))
    }

    /// Snapshot of the most recent commit
    pub fn latest(&self) -> Option<LedgerSnapshot<'_>> {
        (!self.entries.is_empty()).then(|| self.snapshot_at(self.entries.len() - 1))
    }

    /// All snapshots in chronological order
    pub fn snapshots(&self) -> impl Iterator<Item = LedgerSnapshot<'_>> {
        (0..self.entries.len()).map(|index| self.snapshot_at(index))
    }

    /// Every distinct contributor seen so far, in first-seen order
    pub fn contributors(&self) -> &[ContributorIdentity] {
        &self.contributors
    }

    /// Number of recorded commits
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn snapshot_at(&self, index: usize) -> LedgerSnapshot<'_> {
        let entry = &self.entries[index];
        LedgerSnapshot {
            commit: &entry.commit,
            committed_at: entry.committed_at,
            contributors: &self.contributors[..entry.count],
        }
    }
}
