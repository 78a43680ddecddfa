use crate::contributors::{AuthoredCommit, ContributorIdentity};
use crate::error::{GitError, TimelineResult};
use crate::types::Commit;
use chrono::{DateTime, TimeZone, Utc};
use git2::{Oid, Repository, Sort};
use globset::GlobMatcher;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static CO_AUTHOR_TRAILER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\s*co-authored-by:\s*(.+?)\s*<([^>]+)>\s*$").expect("valid regex")
});

/// Git repository walker producing the chronological commit sequence
pub struct GitWalker {
    repo: Repository,
}

impl GitWalker {
    /// Discover and open a git repository from any path within it
    pub fn discover<P: AsRef<Path>>(path: P) -> TimelineResult<Self> {
        let path = path.as_ref();

        let repo = Repository::discover(path)
            .map_err(|e| GitError::RepoNotFound(format!("{}: {}", path.display(), e.message())))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::OpenFailed("bare repositories have no working tree".to_string()))?;

        tracing::info!("Opened git repository at: {}", workdir.display());

        Ok(Self { repo })
    }

    /// Commits oldest-first, starting at `since` and touching a path matched by `path_filters`.
    ///
    /// An empty filter list accepts every commit. A commit touches a path when its diff
    /// against the first parent (or the empty tree for a root commit) adds, removes or
    /// modifies it.
    pub fn chronological_commits(
        &self,
        branch: Option<&str>,
        since: Option<DateTime<Utc>>,
        path_filters: &[GlobMatcher],
    ) -> TimelineResult<Vec<Commit>> {
        let mut commits = Vec::new();

        for oid in self.oldest_first(branch)? {
            let commit = self.find_commit(oid)?;
            let timestamp = commit_time(&commit);

            if let Some(since) = since
                && timestamp < since
            {
                continue;
            }

            if !self.touches_paths(&commit, path_filters)? {
                continue;
            }

            let author = commit.author();
            commits.push(Commit {
                id: commit.id().to_string(),
                timestamp,
                author_name: author.name().unwrap_or("Unknown").to_string(),
                author_email: author.email().unwrap_or("").to_string(),
            });
        }

        sort_chronologically(&mut commits, |c| c.timestamp);
        tracing::info!("Selected {} commits for the walk", commits.len());
        Ok(commits)
    }

    /// Every commit oldest-first with its author and `Co-authored-by` trailers
    pub fn authored_commits(&self, branch: Option<&str>) -> TimelineResult<Vec<AuthoredCommit>> {
        let mut commits = Vec::new();

        for oid in self.oldest_first(branch)? {
            let commit = self.find_commit(oid)?;
            let author = commit.author();
            let mut authors = vec![ContributorIdentity::unverified(
                author.name().unwrap_or("Unknown"),
                author.email().unwrap_or(""),
            )];
            authors.extend(co_authors(commit.message().unwrap_or("")));

            commits.push(AuthoredCommit {
                id: commit.id().to_string(),
                committed_at: commit_time(&commit),
                authors,
            });
        }

        sort_chronologically(&mut commits, |c| c.committed_at);
        Ok(commits)
    }

    fn oldest_first(&self, branch: Option<&str>) -> TimelineResult<Vec<Oid>> {
        let iter_failed = |e: git2::Error| GitError::IterFailed(e.message().to_string());

        let mut revwalk = self.repo.revwalk().map_err(iter_failed)?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)
            .map_err(iter_failed)?;

        if let Some(branch_name) = branch {
            let reference = self
                .repo
                .find_branch(branch_name, git2::BranchType::Local)
                .map_err(|_| GitError::BranchNotFound(branch_name.to_string()))?;
            let oid = reference
                .get()
                .target()
                .ok_or_else(|| GitError::BranchNotFound(format!("{} has no target", branch_name)))?;
            revwalk.push(oid).map_err(iter_failed)?;
        } else {
            revwalk.push_head().map_err(iter_failed)?;
        }

        let oids = revwalk
            .collect::<Result<Vec<_>, _>>()
            .map_err(iter_failed)?;
        Ok(oids)
    }

    fn find_commit(&self, oid: Oid) -> TimelineResult<git2::Commit<'_>> {
        Ok(self
            .repo
            .find_commit(oid)
            .map_err(|e| GitError::IterFailed(e.message().to_string()))?)
    }

    fn touches_paths(&self, commit: &git2::Commit, matchers: &[GlobMatcher]) -> TimelineResult<bool> {
        if matchers.is_empty() {
            return Ok(true);
        }

        let diff_failed = |e: git2::Error| GitError::IterFailed(e.message().to_string());
        let tree = commit.tree().map_err(diff_failed)?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(
                commit
                    .parent(0)
                    .and_then(|p| p.tree())
                    .map_err(diff_failed)?,
            )
        } else {
            None
        };

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(diff_failed)?;

        let touched = diff.deltas().any(|delta| {
            [delta.old_file().path(), delta.new_file().path()]
                .into_iter()
                .flatten()
                .any(|path| matchers.iter().any(|m| m.is_match(path)))
        });
        Ok(touched)
    }
}

fn commit_time(commit: &git2::Commit) -> DateTime<Utc> {
    Utc.timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_default()
}

/// Stable sort, so commits sharing a timestamp keep their topological order
fn sort_chronologically<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| key(item));
}

/// Parse `Co-authored-by: Name <email>` trailers from a commit message
pub fn co_authors(message: &str) -> Vec<ContributorIdentity> {
    CO_AUTHOR_TRAILER
        .captures_iter(message)
        .map(|caps| ContributorIdentity::unverified(&caps[1], &caps[2]))
        .collect()
}
