#![cfg(unix)]

use depgraph_timeline::build::{BuildDriver, BuildEnvironment, CommandBuildDriver};
use depgraph_timeline::config::BuildConfig;
use depgraph_timeline::contributors::{GitHistorySource, RepositoryRef};
use depgraph_timeline::error::BuildError;
use depgraph_timeline::git::GitWalker;
use depgraph_timeline::pipeline::run_with;
use depgraph_timeline::timeline::TimelineAssembler;
use git2::{Oid, Repository, Signature, Time};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn commit_file(repo: &Repository, path: &str, content: &str, time: i64, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    let full = workdir.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(&full, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("Ada", "ada@example.com", &Time::new(time, 0)).unwrap();
    let parents: Vec<git2::Commit> = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| vec![repo.find_commit(oid).unwrap()])
        .unwrap_or_default();
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

fn page(graph: &str) -> String {
    format!(
        "<html><script>d3.select('#graph').graphviz().renderDot(`{}`);</script></html>",
        graph
    )
}

/// Three commits; the second only reformats the graph
fn blueprint_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(
        &repo,
        "blueprint/graph.html",
        &page("digraph { b; a; a -> b; }"),
        1_730_000_000,
        "add graph",
    );
    commit_file(
        &repo,
        "blueprint/graph.html",
        &page("digraph {\n  a;\n  b;\n  a -> b\n}"),
        1_730_000_100,
        "reformat",
    );
    commit_file(
        &repo,
        "blueprint/graph.html",
        &page("digraph { a; b; c; a -> b; b -> c; }"),
        1_730_000_200,
        "add c",
    );
    (dir, repo)
}

/// Build that copies the tracked page to an untracked output location
fn copy_build() -> BuildConfig {
    BuildConfig {
        program: "/bin/sh".to_string(),
        args: vec![
            "-c".to_string(),
            "mkdir -p web && cp blueprint/graph.html web/out.html".to_string(),
        ],
        output_file: PathBuf::from("web/out.html"),
        ..BuildConfig::default()
    }
}

fn commits(dir: &Path) -> Vec<depgraph_timeline::types::Commit> {
    GitWalker::discover(dir)
        .unwrap()
        .chronological_commits(None, None, &[])
        .unwrap()
}

#[test]
fn test_builds_each_commit_and_restores_branch() {
    let (dir, repo) = blueprint_repo();
    let branch = repo.head().unwrap().name().unwrap().to_string();
    let commits = commits(dir.path());
    assert_eq!(commits.len(), 3);

    let mut driver = CommandBuildDriver::new(dir.path(), &copy_build()).unwrap();
    let first = driver.build(&commits[0]).unwrap();
    assert_eq!(first, "digraph { b; a; a -> b; }");
    assert!(repo.head_detached().unwrap());

    let last = driver.build(&commits[2]).unwrap();
    assert_eq!(last, "digraph { a; b; c; a -> b; b -> c; }");

    driver.restore().unwrap();
    let head = repo.head().unwrap();
    assert_eq!(head.name(), Some(branch.as_str()));
    assert_eq!(head.target().unwrap().to_string(), commits[2].id);
}

#[test]
fn test_driver_opens_repository_from_subdirectory() {
    let (dir, repo) = blueprint_repo();
    let subdir = dir.path().join("blueprint");
    let commits = GitWalker::discover(&subdir)
        .unwrap()
        .chronological_commits(None, None, &[])
        .unwrap();

    // Paths in the build config stay relative to the repository root
    let mut driver = CommandBuildDriver::new(&subdir, &copy_build()).unwrap();
    assert_eq!(
        driver.build(&commits[0]).unwrap(),
        "digraph { b; a; a -> b; }"
    );
    assert!(dir.path().join("web/out.html").exists());

    driver.restore().unwrap();
    assert!(!repo.head_detached().unwrap());
}

#[test]
fn test_failed_command_reports_stderr() {
    let (dir, _repo) = blueprint_repo();
    let commits = commits(dir.path());
    let config = BuildConfig {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), "echo 'undefined control sequence' >&2; exit 3".to_string()],
        ..BuildConfig::default()
    };

    let mut driver = CommandBuildDriver::new(dir.path(), &config).unwrap();
    match driver.build(&commits[0]) {
        Err(BuildError::CommandFailed { stderr, .. }) => {
            assert_eq!(stderr, "undefined control sequence")
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
    driver.restore().unwrap();
}

#[test]
fn test_missing_output_is_a_build_error() {
    let (dir, _repo) = blueprint_repo();
    let commits = commits(dir.path());
    let config = BuildConfig {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), "exit 0".to_string()],
        ..BuildConfig::default()
    };

    let mut driver = CommandBuildDriver::new(dir.path(), &config).unwrap();
    assert!(matches!(
        driver.build(&commits[0]),
        Err(BuildError::OutputMissing(_))
    ));
}

#[test]
fn test_stale_output_is_not_reused() {
    let (dir, _repo) = blueprint_repo();
    let commits = commits(dir.path());
    // Ignored output survives checkouts
    fs::create_dir_all(dir.path().join(".git/info")).unwrap();
    fs::write(dir.path().join(".git/info/exclude"), "web/\n").unwrap();

    let mut driver = CommandBuildDriver::new(dir.path(), &copy_build()).unwrap();
    driver.build(&commits[0]).unwrap();
    assert!(dir.path().join("web/out.html").exists());

    let failing = BuildConfig {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), "exit 0".to_string()],
        output_file: PathBuf::from("web/out.html"),
        ..BuildConfig::default()
    };
    let mut driver = CommandBuildDriver::new(dir.path(), &failing).unwrap();
    assert!(driver.build(&commits[1]).is_err());
}

#[test]
fn test_build_sees_only_the_configured_environment() {
    let (dir, _repo) = blueprint_repo();
    let commits = commits(dir.path());

    let mut set = BTreeMap::new();
    set.insert("NODE_NAME".to_string(), "zeta".to_string());
    let config = BuildConfig {
        program: "/bin/sh".to_string(),
        // Builtins only: PATH is not passed through
        args: vec![
            "-c".to_string(),
            "printf 'renderDot(`digraph { %s; %s }`)' \"$NODE_NAME\" \"${HOME:-none}\" > out.html"
                .to_string(),
        ],
        output_file: PathBuf::from("out.html"),
        environment: BuildEnvironment {
            inherit: false,
            remove: Vec::new(),
            set,
        },
        ..BuildConfig::default()
    };

    let mut driver = CommandBuildDriver::new(dir.path(), &config).unwrap();
    assert_eq!(driver.build(&commits[0]).unwrap(), "digraph { zeta; none }");
}

#[tokio::test]
async fn test_end_to_end_against_local_repository() {
    let (dir, repo) = blueprint_repo();
    let branch = repo.head().unwrap().shorthand().unwrap().to_string();
    let commits = commits(dir.path());
    let output = dir.path().join("timeline.html");

    let source = GitHistorySource::new(dir.path());
    let mut driver = CommandBuildDriver::new(dir.path(), &copy_build()).unwrap();
    let assembler = TimelineAssembler {
        title: "Local".to_string(),
        transition_ms: 800,
        hold_ms: 200,
    };

    let summary = run_with(
        &source,
        &RepositoryRef::new("local", "blueprint", branch),
        &commits,
        &mut driver,
        &assembler,
        &output,
    )
    .await
    .unwrap();

    assert_eq!(summary.commits, 3);
    assert_eq!(summary.snapshots, 2);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.contributors, 1);

    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains(&commits[0].id));
    assert!(!html.contains(&commits[1].id));
    assert!(html.contains(&commits[2].id));
    assert!(!repo.head_detached().unwrap());
}
