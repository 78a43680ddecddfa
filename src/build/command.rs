use super::{BuildDriver, extract_graph};
use crate::config::BuildConfig;
use crate::error::{BuildError, ConfigError, GitError, TimelineResult};
use crate::types::Commit;
use git2::{Oid, Repository, build::CheckoutBuilder};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Longest stderr excerpt kept in a [`BuildError::CommandFailed`]
const STDERR_TAIL: usize = 4000;

/// What HEAD pointed at before the walk started
#[derive(Debug, Clone)]
enum OriginalHead {
    Branch(String),
    Detached(Oid),
}

/// Build driver that checks commits out with git2 and runs an external build command
pub struct CommandBuildDriver {
    repo: Repository,
    workdir: PathBuf,
    program: String,
    args: Vec<String>,
    output_file: PathBuf,
    graph_pattern: Regex,
    clean_ignored: bool,
    /// Resolved once at construction; the child gets exactly these variables
    environment: Vec<(String, String)>,
    original_head: Option<OriginalHead>,
}

impl CommandBuildDriver {
    /// Discover the repository containing `path` and resolve the build environment against
    /// the current process environment. The build runs at the repository root.
    pub fn new(path: &Path, config: &BuildConfig) -> TimelineResult<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| GitError::RepoNotFound(format!("{}: {}", path.display(), e.message())))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::OpenFailed("bare repositories have no working tree".to_string()))?
            .to_path_buf();
        let graph_pattern = Regex::new(&config.graph_pattern).map_err(|e| ConfigError::InvalidValue {
            key: "build.graph_pattern".to_string(),
            reason: e.to_string(),
        })?;

        let original_head = match repo.head() {
            Ok(head) if head.is_branch() => head.name().map(|n| OriginalHead::Branch(n.to_string())),
            Ok(head) => head.target().map(OriginalHead::Detached),
            Err(_) => None,
        };

        let environment = config.environment.resolve(std::env::vars());
        tracing::debug!(
            "Build environment has {} variables (inherit={}, removed={:?})",
            environment.len(),
            config.environment.inherit,
            config.environment.remove
        );

        Ok(Self {
            repo,
            workdir,
            program: config.program.clone(),
            args: config.args.clone(),
            output_file: config.output_file.clone(),
            graph_pattern,
            clean_ignored: config.clean_ignored,
            environment,
            original_head,
        })
    }

    fn output_path(&self) -> PathBuf {
        self.workdir.join(&self.output_file)
    }

    fn checkout(&self, commit_id: &str) -> Result<(), BuildError> {
        let checkout_failed = |e: git2::Error| BuildError::CheckoutFailed {
            commit: commit_id.to_string(),
            reason: e.message().to_string(),
        };

        let oid = Oid::from_str(commit_id).map_err(checkout_failed)?;
        let commit = self.repo.find_commit(oid).map_err(checkout_failed)?;

        let mut checkout = CheckoutBuilder::new();
        checkout
            .force()
            .remove_untracked(true)
            .remove_ignored(self.clean_ignored);
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(checkout_failed)?;
        self.repo.set_head_detached(oid).map_err(checkout_failed)?;
        Ok(())
    }

    fn run_build(&self) -> Result<(), BuildError> {
        tracing::debug!("Running {} {:?} in {}", self.program, self.args, self.workdir.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.workdir)
            .env_clear()
            .envs(self.environment.iter().map(|(k, v)| (k, v)))
            .output()
            .map_err(|e| BuildError::SpawnFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!("Build stdout:\n{}", String::from_utf8_lossy(&output.stdout));

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::CommandFailed {
                status: output.status.to_string(),
                stderr: tail(&stderr, STDERR_TAIL).trim().to_string(),
            });
        }
        Ok(())
    }

    fn read_output(&self) -> Result<String, BuildError> {
        let path = self.output_path();
        if !path.exists() {
            return Err(BuildError::OutputMissing(path));
        }
        fs::read_to_string(&path).map_err(|e| BuildError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

impl BuildDriver for CommandBuildDriver {
    fn build(&mut self, commit: &Commit) -> Result<String, BuildError> {
        self.checkout(&commit.id)?;

        // Ignored build output survives the checkout; a failed build must not reuse it
        let path = self.output_path();
        if path.exists()
            && let Err(e) = fs::remove_file(&path)
        {
            tracing::warn!("Could not remove stale output {}: {}", path.display(), e);
        }

        self.run_build()?;
        let output = self.read_output()?;
        extract_graph(&output, &self.graph_pattern)
    }

    fn restore(&mut self) -> TimelineResult<()> {
        let restore_failed = |e: git2::Error| GitError::RestoreFailed(e.message().to_string());

        let Some(original) = self.original_head.clone() else {
            return Ok(());
        };
        let target = match &original {
            OriginalHead::Branch(name) => self
                .repo
                .refname_to_id(name)
                .map_err(restore_failed)?,
            OriginalHead::Detached(oid) => *oid,
        };

        let commit = self.repo.find_commit(target).map_err(restore_failed)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(restore_failed)?;

        match original {
            OriginalHead::Branch(name) => {
                self.repo.set_head(&name).map_err(restore_failed)?;
                tracing::info!("Restored working tree to {}", name);
            }
            OriginalHead::Detached(oid) => {
                self.repo.set_head_detached(oid).map_err(restore_failed)?;
                tracing::info!("Restored working tree to {}", oid);
            }
        }
        Ok(())
    }
}

/// Last `max` bytes of `text`, cut on a char boundary
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail() {
        assert_eq!(tail("short", 10), "short");
        assert_eq!(tail("0123456789", 3), "789");
        // 'é' is two bytes; never split it
        assert_eq!(tail("aé", 1), "");
        assert_eq!(tail("aé", 2), "é");
    }
}
