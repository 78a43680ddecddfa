//! End-to-end run: contributor history, commit walk, timeline artifact
//!
//! Fatal errors (API, ledger ordering, configuration) stop the run before the artifact is
//! written. The artifact is written only once everything else has succeeded, through a
//! temporary file renamed into place.

use crate::build::{BuildDriver, CommandBuildDriver};
use crate::config::Config;
use crate::contributors::{
    ContributorHistorySource, ContributorLedger, GitHistorySource, GitHubHistorySource,
    RepositoryRef,
};
use crate::error::{ConfigError, TimelineError, TimelineResult};
use crate::git::GitWalker;
use crate::history::{HistoryWalker, WalkReport};
use crate::timeline::TimelineAssembler;
use crate::types::Commit;
use std::path::{Path, PathBuf};

/// What a completed run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub commits: usize,
    pub snapshots: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub contributors: usize,
    pub output: PathBuf,
}

/// Fetch the full history from `source` and fold it into a ledger
pub async fn build_ledger(
    source: &dyn ContributorHistorySource,
    repo: &RepositoryRef,
) -> TimelineResult<ContributorLedger> {
    let history = source.fetch_history(repo).await?;
    Ok(ContributorLedger::from_history(&history)?)
}

/// Run the whole pipeline against an arbitrary source and driver.
///
/// The walk runs on the calling task; callers with a blocking driver should use
/// [`Pipeline::run`], which moves the walk onto a blocking thread.
pub async fn run_with<D>(
    source: &dyn ContributorHistorySource,
    repo: &RepositoryRef,
    commits: &[Commit],
    driver: &mut D,
    assembler: &TimelineAssembler,
    output: &Path,
) -> TimelineResult<PipelineSummary>
where
    D: BuildDriver + ?Sized,
{
    let ledger = build_ledger(source, repo).await?;
    let report = HistoryWalker::new(&ledger).walk(commits, driver);
    driver.restore()?;
    finish(
        assembler,
        &report,
        commits.len(),
        ledger.contributors().len(),
        output,
    )
}

fn finish(
    assembler: &TimelineAssembler,
    report: &WalkReport,
    commits: usize,
    contributors: usize,
    output: &Path,
) -> TimelineResult<PipelineSummary> {
    let html = assembler.assemble(&report.snapshots)?;
    write_atomically(output, &html)?;
    tracing::info!(
        "Wrote timeline with {} snapshots to {}",
        report.snapshots.len(),
        output.display()
    );

    Ok(PipelineSummary {
        commits,
        snapshots: report.snapshots.len(),
        unchanged: report.unchanged(),
        failed: report.failed(),
        contributors,
        output: output.to_path_buf(),
    })
}

fn write_atomically(path: &Path, contents: &str) -> TimelineResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Pipeline wired from configuration: git2 walk, command build driver and the
/// configured contributor source
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Repository identity used for the contributor history
    pub fn repository_ref(&self) -> TimelineResult<RepositoryRef> {
        let repo = &self.config.repository;
        if self.config.contributors.source == "github" {
            if repo.owner.is_empty() {
                return Err(ConfigError::MissingRequired("repository.owner".to_string()).into());
            }
            if repo.name.is_empty() {
                return Err(ConfigError::MissingRequired("repository.name".to_string()).into());
            }
        }
        Ok(RepositoryRef::new(&repo.owner, &repo.name, &repo.branch))
    }

    /// The configured contributor-history source
    pub fn history_source(&self) -> TimelineResult<Box<dyn ContributorHistorySource>> {
        let contributors = &self.config.contributors;
        match contributors.source.as_str() {
            "github" => Ok(Box::new(GitHubHistorySource::from_env(
                contributors.api_url.clone(),
                &contributors.token_env,
                contributors.page_size,
            )?)),
            "git" => Ok(Box::new(GitHistorySource::new(
                self.config.repository.path.clone(),
            ))),
            other => Err(ConfigError::InvalidValue {
                key: "contributors.source".to_string(),
                reason: format!("unknown source '{}'", other),
            }
            .into()),
        }
    }

    /// Fetch the contributor history and build the ledger
    pub async fn ledger(&self) -> TimelineResult<ContributorLedger> {
        let repo = self.repository_ref()?;
        let source = self.history_source()?;
        build_ledger(source.as_ref(), &repo).await
    }

    /// Commits to walk, oldest first, restricted by start date and source paths
    pub async fn list_commits(&self) -> TimelineResult<Vec<Commit>> {
        let repo = &self.config.repository;
        let path = repo.path.clone();
        let branch = repo.branch.clone();
        let since = repo.since_date()?;
        let matchers = repo.source_matchers()?;

        tokio::task::spawn_blocking(move || {
            let walker = GitWalker::discover(&path)?;
            walker.chronological_commits(Some(&branch), since, &matchers)
        })
        .await
        .map_err(|e| TimelineError::other(format!("Failed to join commit listing task: {}", e)))?
    }

    /// Run the full pipeline and write the timeline
    pub async fn run(&self) -> TimelineResult<PipelineSummary> {
        let ledger = self.ledger().await?;
        let commits = self.list_commits().await?;
        let commit_count = commits.len();
        let contributor_count = ledger.contributors().len();

        let workdir = self.config.repository.path.clone();
        let build = self.config.build.clone();
        let report = tokio::task::spawn_blocking(move || -> TimelineResult<WalkReport> {
            let mut driver = CommandBuildDriver::new(&workdir, &build)?;
            let report = HistoryWalker::new(&ledger).walk(&commits, &mut driver);
            driver.restore()?;
            Ok(report)
        })
        .await
        .map_err(|e| TimelineError::other(format!("Failed to join history walk: {}", e)))??;

        let assembler = TimelineAssembler::from(&self.config.timeline);
        finish(
            &assembler,
            &report,
            commit_count,
            contributor_count,
            &self.config.timeline.output,
        )
    }
}
