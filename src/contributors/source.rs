use super::ledger::AuthoredCommit;
use crate::error::TimelineResult;
use crate::git::GitWalker;
use async_trait::async_trait;
use std::path::PathBuf;

/// Identity of a hosted repository and the branch whose history is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: branch.into(),
        }
    }

    /// Fully qualified branch reference (`refs/heads/<branch>` unless already qualified)
    pub fn qualified_branch(&self) -> String {
        if self.branch.starts_with("refs/") {
            self.branch.clone()
        } else {
            format!("refs/heads/{}", self.branch)
        }
    }
}

/// Source of per-commit author identities, oldest commit first
#[async_trait]
pub trait ContributorHistorySource: Send + Sync {
    async fn fetch_history(&self, repo: &RepositoryRef) -> TimelineResult<Vec<AuthoredCommit>>;
}

/// Author history read from the local repository; every identity is unverified
pub struct GitHistorySource {
    repo_path: PathBuf,
}

impl GitHistorySource {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }
}

#[async_trait]
impl ContributorHistorySource for GitHistorySource {
    async fn fetch_history(&self, repo: &RepositoryRef) -> TimelineResult<Vec<AuthoredCommit>> {
        let path = self.repo_path.clone();
        let branch = repo.branch.clone();
        tokio::task::spawn_blocking(move || {
            let walker = GitWalker::discover(&path)?;
            walker.authored_commits(Some(&branch))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to join git history task: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_branch() {
        assert_eq!(
            RepositoryRef::new("o", "r", "main").qualified_branch(),
            "refs/heads/main"
        );
        assert_eq!(
            RepositoryRef::new("o", "r", "refs/tags/v1").qualified_branch(),
            "refs/tags/v1"
        );
    }
}
