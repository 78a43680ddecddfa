use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use depgraph_timeline::build::BuildDriver;
use depgraph_timeline::contributors::{
    AuthoredCommit, ContributorHistorySource, ContributorIdentity, RepositoryRef,
};
use depgraph_timeline::error::{ApiError, BuildError, LedgerError, TimelineError, TimelineResult};
use depgraph_timeline::graph::canonicalize;
use depgraph_timeline::pipeline::run_with;
use depgraph_timeline::timeline::TimelineAssembler;
use depgraph_timeline::types::Commit;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

/// History source returning a fixed commit list
struct StaticHistory(Vec<AuthoredCommit>);

#[async_trait]
impl ContributorHistorySource for StaticHistory {
    async fn fetch_history(&self, _repo: &RepositoryRef) -> TimelineResult<Vec<AuthoredCommit>> {
        Ok(self.0.clone())
    }
}

/// History source that always fails like an unauthorized API call
struct FailingHistory;

#[async_trait]
impl ContributorHistorySource for FailingHistory {
    async fn fetch_history(&self, _repo: &RepositoryRef) -> TimelineResult<Vec<AuthoredCommit>> {
        Err(ApiError::Status {
            status: 401,
            body: "Bad credentials".to_string(),
        }
        .into())
    }
}

/// Build driver returning canned graph text per commit (`None` fails the build)
struct ScriptedDriver {
    graphs: HashMap<String, Option<String>>,
    built: Vec<String>,
    restored: bool,
}

impl ScriptedDriver {
    fn new(script: &[(&str, Option<&str>)]) -> Self {
        Self {
            graphs: script
                .iter()
                .map(|(id, graph)| (id.to_string(), graph.map(str::to_string)))
                .collect(),
            built: Vec::new(),
            restored: false,
        }
    }
}

impl BuildDriver for ScriptedDriver {
    fn build(&mut self, commit: &Commit) -> Result<String, BuildError> {
        self.built.push(commit.id.clone());
        match self.graphs.get(&commit.id) {
            Some(Some(graph)) => Ok(graph.clone()),
            _ => Err(BuildError::CommandFailed {
                status: "exit status: 2".to_string(),
                stderr: "! LaTeX Error".to_string(),
            }),
        }
    }

    fn restore(&mut self) -> TimelineResult<()> {
        self.restored = true;
        Ok(())
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, hour, 0, 0).unwrap()
}

fn commit(id: &str, hour: u32) -> Commit {
    Commit {
        id: id.to_string(),
        timestamp: at(hour),
        author_name: "Ada".to_string(),
        author_email: "ada@example.com".to_string(),
    }
}

fn authored(id: &str, hour: u32, authors: Vec<ContributorIdentity>) -> AuthoredCommit {
    AuthoredCommit {
        id: id.to_string(),
        committed_at: at(hour),
        authors,
    }
}

fn ada() -> ContributorIdentity {
    ContributorIdentity::verified(
        "ada",
        "https://avatars.githubusercontent.com/u/1",
        "https://github.com/ada",
    )
}

fn bob() -> ContributorIdentity {
    ContributorIdentity::unverified("Bob", "bob@example.com")
}

fn repo() -> RepositoryRef {
    RepositoryRef::new("octo", "blueprint", "main")
}

fn assembler() -> TimelineAssembler {
    TimelineAssembler {
        title: "Test".to_string(),
        transition_ms: 1000,
        hold_ms: 500,
    }
}

fn embedded_data(path: &Path) -> serde_json::Value {
    let html = std::fs::read_to_string(path).unwrap();
    let start_tag = "<script type=\"application/json\" id=\"timeline-data\">";
    let start = html.find(start_tag).expect("data block") + start_tag.len();
    let end = start + html[start..].find("</script>").expect("closing tag");
    serde_json::from_str(&html[start..end]).unwrap()
}

#[tokio::test]
async fn test_end_to_end_example() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("timeline.html");

    let commits = vec![commit("c1", 1), commit("c2", 2), commit("c3", 3)];
    let history = StaticHistory(vec![
        authored("c1", 1, vec![ada()]),
        authored("c2", 2, vec![ada()]),
        authored("c3", 3, vec![bob()]),
    ]);
    let mut driver = ScriptedDriver::new(&[
        ("c1", Some("digraph{b;a;a->b}")),
        ("c2", Some("digraph {\n  b;\n  a;\n  a -> b\n}")),
        ("c3", Some("digraph{a;b;c;a->b;b->c}")),
    ]);

    let summary = run_with(&history, &repo(), &commits, &mut driver, &assembler(), &output)
        .await
        .unwrap();

    assert_eq!(summary.commits, 3);
    assert_eq!(summary.snapshots, 2);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.contributors, 2);
    assert!(driver.restored);

    let data = embedded_data(&output);
    let snapshots = data["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 2);

    assert_eq!(snapshots[0]["commit"], "c1");
    assert_eq!(snapshots[0]["contributor_count"], 1);
    assert_eq!(snapshots[0]["contributors"][0]["login"], "ada");

    assert_eq!(snapshots[1]["commit"], "c3");
    assert_eq!(snapshots[1]["contributor_count"], 2);
    let contributors = snapshots[1]["contributors"].as_array().unwrap();
    assert_eq!(contributors.len(), 1);
    assert_eq!(contributors[0]["login"], "ada");
    assert_eq!(
        snapshots[1]["dot"],
        canonicalize("digraph{a;b;c;a->b;b->c}").unwrap()
    );
}

#[tokio::test]
async fn test_runs_collapse_to_first_commit() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("timeline.html");

    let commits = vec![commit("c1", 1), commit("c2", 2), commit("c3", 3)];
    let history = StaticHistory(vec![
        authored("c1", 1, vec![ada()]),
        authored("c2", 2, vec![ada()]),
        authored("c3", 3, vec![ada()]),
    ]);
    let mut driver = ScriptedDriver::new(&[
        ("c1", Some("digraph { x [color=red, shape=box]; }")),
        ("c2", Some("digraph { x [shape=box color=red] }")),
        ("c3", Some("digraph { x; y; }")),
    ]);

    run_with(&history, &repo(), &commits, &mut driver, &assembler(), &output)
        .await
        .unwrap();

    let data = embedded_data(&output);
    let snapshots = data["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0]["commit"], "c1");
    assert_eq!(snapshots[0]["date"], "2025-10-01T01:00:00Z");
    assert_eq!(snapshots[1]["commit"], "c3");
}

#[tokio::test]
async fn test_build_failure_in_the_middle_is_skipped() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("timeline.html");

    let commits = vec![commit("c1", 1), commit("c2", 2), commit("c3", 3)];
    let history = StaticHistory(vec![
        authored("c1", 1, vec![ada()]),
        authored("c2", 2, vec![ada()]),
        authored("c3", 3, vec![ada()]),
    ]);
    let mut driver = ScriptedDriver::new(&[
        ("c1", Some("digraph { a; }")),
        ("c2", None),
        ("c3", Some("digraph { a; b; }")),
    ]);

    let summary = run_with(&history, &repo(), &commits, &mut driver, &assembler(), &output)
        .await
        .unwrap();

    assert_eq!(driver.built, vec!["c1", "c2", "c3"]);
    assert_eq!(summary.snapshots, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_empty_commit_list_writes_empty_timeline() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("site/timeline.html");

    let history = StaticHistory(Vec::new());
    let mut driver = ScriptedDriver::new(&[]);

    let summary = run_with(&history, &repo(), &[], &mut driver, &assembler(), &output)
        .await
        .unwrap();

    assert_eq!(summary.snapshots, 0);
    assert_eq!(embedded_data(&output)["snapshots"], serde_json::json!([]));
}

#[tokio::test]
async fn test_api_failure_aborts_before_walking() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("timeline.html");

    let commits = vec![commit("c1", 1)];
    let mut driver = ScriptedDriver::new(&[("c1", Some("digraph { a; }"))]);

    let err = run_with(&FailingHistory, &repo(), &commits, &mut driver, &assembler(), &output)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TimelineError::Api(ApiError::Status { status: 401, .. })
    ));
    assert!(driver.built.is_empty());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_out_of_order_history_is_fatal() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("timeline.html");

    let history = StaticHistory(vec![
        authored("c2", 2, vec![ada()]),
        authored("c1", 1, vec![bob()]),
    ]);
    let commits = vec![commit("c1", 1), commit("c2", 2)];
    let mut driver = ScriptedDriver::new(&[("c1", Some("digraph { a; }"))]);

    let err = run_with(&history, &repo(), &commits, &mut driver, &assembler(), &output)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TimelineError::Ledger(LedgerError::OrderingViolation { ref commit, .. }) if commit == "c1"
    ));
    assert!(driver.built.is_empty());
    assert!(!output.exists());
}
