//! Contributor history from the GitHub GraphQL API
//!
//! Commit authors come back pre-resolved: an author linked to a GitHub account carries its
//! login, avatar and profile URL; anything else is a bare git identity.

use super::identity::ContributorIdentity;
use super::ledger::AuthoredCommit;
use super::source::{ContributorHistorySource, RepositoryRef};
use crate::error::{ApiError, TimelineResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

/// Default GraphQL endpoint
pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

const HISTORY_QUERY: &str = r#"
query($owner: String!, $name: String!, $branch: String!, $cursor: String, $pageSize: Int!) {
  repository(owner: $owner, name: $name) {
    ref(qualifiedName: $branch) {
      target {
        ... on Commit {
          history(first: $pageSize, after: $cursor) {
            pageInfo {
              hasNextPage
              endCursor
            }
            nodes {
              oid
              committedDate
              authors(first: 10) {
                nodes {
                  name
                  email
                  user {
                    login
                    avatarUrl
                    url
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    #[serde(rename = "ref")]
    git_ref: Option<RefNode>,
}

#[derive(Debug, Deserialize)]
struct RefNode {
    target: TargetNode,
}

#[derive(Debug, Deserialize)]
struct TargetNode {
    /// Absent when the ref does not point at a commit
    history: Option<HistoryPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryPage {
    page_info: PageInfo,
    nodes: Vec<CommitNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitNode {
    oid: String,
    committed_date: DateTime<Utc>,
    authors: AuthorConnection,
}

#[derive(Debug, Deserialize)]
struct AuthorConnection {
    nodes: Vec<AuthorNode>,
}

#[derive(Debug, Deserialize)]
struct AuthorNode {
    name: Option<String>,
    email: Option<String>,
    user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserNode {
    login: String,
    avatar_url: String,
    url: String,
}

impl AuthorNode {
    fn into_identity(self) -> ContributorIdentity {
        match self.user {
            Some(user) => ContributorIdentity::verified(user.login, user.avatar_url, user.url),
            None => ContributorIdentity::unverified(
                self.name.unwrap_or_else(|| "Unknown".to_string()),
                self.email.unwrap_or_default(),
            ),
        }
    }
}

/// Client for the paginated commit history query
pub struct GitHubHistorySource {
    client: reqwest::Client,
    api_url: String,
    token: String,
    page_size: usize,
}

impl GitHubHistorySource {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>, page_size: usize) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            token: token.into(),
            page_size,
        })
    }

    /// Read the API token from the environment variable `token_env`
    pub fn from_env(api_url: impl Into<String>, token_env: &str, page_size: usize) -> Result<Self, ApiError> {
        let token = std::env::var(token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::MissingToken(token_env.to_string()))?;
        Self::new(api_url, token, page_size)
    }

    async fn fetch_page(&self, repo: &RepositoryRef, cursor: Option<&str>) -> Result<HistoryPage, ApiError> {
        let body = json!({
            "query": HISTORY_QUERY,
            "variables": {
                "owner": repo.owner,
                "name": repo.name,
                "branch": repo.qualified_branch(),
                "cursor": cursor,
                "pageSize": self.page_size,
            }
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        if status != reqwest::StatusCode::OK {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_history_page(&text, repo)
    }
}

#[async_trait]
impl ContributorHistorySource for GitHubHistorySource {
    async fn fetch_history(&self, repo: &RepositoryRef) -> TimelineResult<Vec<AuthoredCommit>> {
        tracing::info!(
            "Fetching commit history for {}/{} on '{}' via GraphQL...",
            repo.owner,
            repo.name,
            repo.branch
        );

        let mut nodes = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.fetch_page(repo, cursor.as_deref()).await?;
            nodes.extend(page.nodes);
            tracing::info!("Fetched {} commits so far...", nodes.len());

            if !page.page_info.has_next_page {
                break;
            }
            cursor = Some(page.page_info.end_cursor.ok_or_else(|| {
                ApiError::Malformed("hasNextPage is true but endCursor is missing".to_string())
            })?);
        }

        Ok(into_chronological(nodes))
    }
}

/// Decode one response body into a history page
pub(crate) fn parse_history_page(text: &str, repo: &RepositoryRef) -> Result<HistoryPage, ApiError> {
    let response: GraphQlResponse =
        serde_json::from_str(text).map_err(|e| ApiError::Malformed(e.to_string()))?;

    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let messages: Vec<String> = errors
            .iter()
            .map(|e| {
                e.get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string())
            })
            .collect();
        return Err(ApiError::GraphQl(messages.join("; ")));
    }

    let not_found = || {
        ApiError::RepositoryNotFound(format!("{}/{}@{}", repo.owner, repo.name, repo.branch))
    };

    response
        .data
        .and_then(|d| d.repository)
        .and_then(|r| r.git_ref)
        .ok_or_else(not_found)?
        .target
        .history
        .ok_or_else(not_found)
}

/// GitHub lists history newest first; the ledger wants oldest first
fn into_chronological(nodes: Vec<CommitNode>) -> Vec<AuthoredCommit> {
    let mut commits: Vec<AuthoredCommit> = nodes
        .into_iter()
        .rev()
        .map(|node| AuthoredCommit {
            id: node.oid,
            committed_at: node.committed_date,
            authors: node
                .authors
                .nodes
                .into_iter()
                .map(AuthorNode::into_identity)
                .collect(),
        })
        .collect();
    // Stable, so topological order survives among equal timestamps
    commits.sort_by_key(|c| c.committed_at);
    commits
}
