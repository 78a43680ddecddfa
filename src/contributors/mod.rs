//! Contributor identities, history sources and the cumulative ledger
//!
//! A history source yields every commit of a branch oldest-first with the identities
//! credited on it. The ledger folds that stream into a monotonically growing set of
//! contributors, snapshotted per commit.

/// GitHub GraphQL history source
pub mod github;
/// Contributor identity types
pub mod identity;
/// Cumulative contributor ledger
pub mod ledger;
/// History source trait and the local git implementation
pub mod source;

pub use github::{GITHUB_GRAPHQL_URL, GitHubHistorySource};
pub use identity::{ContributorIdentity, VerifiedContributor};
pub use ledger::{AuthoredCommit, ContributorLedger, LedgerSnapshot};
pub use source::{ContributorHistorySource, GitHistorySource, RepositoryRef};
