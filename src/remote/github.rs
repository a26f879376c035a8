//! GitHub Issues source backed by the GraphQL v4 API.
//!
//! # Security Note - Logging
//!
//! The access token is held in a [`SecretBox`] and only exposed while the
//! `Authorization` header is built. The header value is marked sensitive and
//! wrapped in [`RedactedHeader`], so neither `Debug` output nor reqwest's own
//! logging prints it.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use reqwest::header;
use secrecy::{ExposeSecret, SecretBox};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::{PageSize, RepoId};
use crate::error::{MirrorError, Result};
use crate::types::{CommentPage, IssuePage};

use super::error::{FetchStage, truncate_body};
use super::{IssueFilter, IssueSource};

const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Fixed per-request timeout. There is no timeout on the run as a whole.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("issue-mirror/", env!("CARGO_PKG_VERSION"));

const ISSUES_QUERY: &str = r#"
query($owner: String!, $name: String!, $count: Int!, $cursor: String, $since: DateTime, $states: [IssueState!]) {
  repository(owner: $owner, name: $name) {
    issues(first: $count, after: $cursor, filterBy: {since: $since, states: $states}, orderBy: {field: CREATED_AT, direction: ASC}) {
      nodes {
        number
        title
        body
        author { login }
        createdAt
        state
        closedAt
        milestone { title }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#;

const COMMENTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!, $count: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      comments(first: $count, after: $cursor) {
        nodes {
          author { login }
          body
          createdAt
        }
        pageInfo { hasNextPage endCursor }
      }
    }
  }
}
"#;

/// Wrapper for sensitive header values that redacts the value when formatted.
struct RedactedHeader {
    value: String,
}

impl RedactedHeader {
    fn bearer(token: &str) -> Self {
        Self {
            value: format!("bearer {}", token),
        }
    }

    fn as_header_value(&self) -> Result<header::HeaderValue> {
        let mut value = header::HeaderValue::from_str(&self.value).map_err(|_| {
            MirrorError::Auth("GitHub token contains invalid header characters".to_string())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Display for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactedHeader")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Response shapes of the two queries.
mod wire {
    use serde::Deserialize;

    use crate::remote::error::GraphQlError;
    use crate::types::{Comment, GHOST_AUTHOR, Issue, IssueState, Page, PageInfo};

    #[derive(Debug, Deserialize)]
    pub struct GraphQlResponse<T> {
        pub data: Option<T>,
        #[serde(default)]
        pub errors: Option<Vec<GraphQlError>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct IssuesData {
        pub repository: Option<IssuesRepository>,
    }

    #[derive(Debug, Deserialize)]
    pub struct IssuesRepository {
        pub issues: Connection<IssueNode>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CommentsData {
        pub repository: Option<CommentsRepository>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CommentsRepository {
        pub issue: Option<CommentsIssue>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CommentsIssue {
        pub comments: Connection<CommentNode>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Connection<T> {
        #[serde(default = "Vec::new")]
        pub nodes: Vec<Option<T>>,
        pub page_info: PageInfoNode,
    }

    impl<T> Connection<T> {
        /// Convert into a domain page, skipping `null` nodes.
        pub fn into_page<U>(self, convert: impl Fn(T) -> U) -> Page<U> {
            Page::new(
                self.nodes.into_iter().flatten().map(convert).collect(),
                PageInfo {
                    has_next_page: self.page_info.has_next_page,
                    end_cursor: self.page_info.end_cursor,
                },
            )
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PageInfoNode {
        pub has_next_page: bool,
        pub end_cursor: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Actor {
        pub login: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct MilestoneNode {
        pub title: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IssueNode {
        pub number: u64,
        pub title: String,
        #[serde(default)]
        pub body: String,
        pub author: Option<Actor>,
        pub created_at: String,
        pub state: IssueState,
        pub closed_at: Option<String>,
        pub milestone: Option<MilestoneNode>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CommentNode {
        pub author: Option<Actor>,
        #[serde(default)]
        pub body: String,
        pub created_at: String,
    }

    fn author_name(author: Option<Actor>) -> String {
        author
            .map(|a| a.login)
            .unwrap_or_else(|| GHOST_AUTHOR.to_string())
    }

    impl From<IssueNode> for Issue {
        fn from(node: IssueNode) -> Self {
            Issue {
                number: node.number,
                title: node.title,
                body: node.body,
                author: author_name(node.author),
                created_at: node.created_at,
                state: node.state,
                closed_at: node.closed_at,
                milestone: node.milestone.map(|m| m.title),
            }
        }
    }

    impl From<CommentNode> for Comment {
        fn from(node: CommentNode) -> Self {
            Comment {
                author: author_name(node.author),
                body: node.body,
                created_at: node.created_at,
            }
        }
    }
}

/// GitHub GraphQL issue source for one repository.
pub struct GitHubSource {
    client: Client,
    token: SecretBox<String>,
    repo: RepoId,
    endpoint: String,
}

impl GitHubSource {
    /// Create a source for `repo` authenticated with `token`.
    ///
    /// Configures the HTTP client with a 30s timeout per request.
    pub fn new(repo: RepoId, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(MirrorError::Auth(
                "GitHub token not configured. Set the GITHUB_TOKEN environment variable or githubToken in the settings file".to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            token: SecretBox::new(Box::new(token.to_string())),
            repo,
            endpoint: GITHUB_GRAPHQL_URL.to_string(),
        })
    }

    /// Point the source at a different GraphQL endpoint (GitHub Enterprise).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Execute one GraphQL query. No retries.
    async fn execute<T>(
        &self,
        stage: FetchStage,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let auth_header = RedactedHeader::bearer(self.token.expose_secret());
        tracing::debug!(endpoint = %self.endpoint, %stage, "GraphQL request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, auth_header.as_header_value()?)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| stage.error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(stage.error(format!("HTTP {}: {}", status, truncate_body(&body, 200))));
        }

        let result: wire::GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| stage.error(format!("invalid response body: {}", e)))?;

        into_data(stage, result)
    }
}

/// Unwrap the `data` of a GraphQL response, surfacing its `errors` array.
fn into_data<T>(stage: FetchStage, response: wire::GraphQlResponse<T>) -> Result<T> {
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        return Err(MirrorError::GraphQl { stage, errors });
    }

    response
        .data
        .ok_or_else(|| stage.error("no data in GitHub response"))
}

fn issues_page(stage: FetchStage, data: wire::IssuesData) -> Result<IssuePage> {
    let repository = data
        .repository
        .ok_or_else(|| stage.error("repository not found"))?;
    Ok(repository.issues.into_page(Into::into))
}

fn comments_page(stage: FetchStage, data: wire::CommentsData) -> Result<CommentPage> {
    let issue = data
        .repository
        .ok_or_else(|| stage.error("repository not found"))?
        .issue
        .ok_or_else(|| stage.error("issue not found"))?;
    Ok(issue.comments.into_page(Into::into))
}

impl IssueSource for GitHubSource {
    async fn fetch_issue_page(
        &self,
        filter: &IssueFilter,
        cursor: Option<&str>,
    ) -> Result<IssuePage> {
        let stage = FetchStage::IssuePage;
        let states: Vec<&str> = filter.states.iter().map(|s| s.graphql_name()).collect();
        let variables = json!({
            "owner": self.repo.owner,
            "name": self.repo.name,
            "count": filter.page_size.get(),
            "cursor": cursor,
            "since": filter.since.to_string(),
            "states": states,
        });

        let data: wire::IssuesData = self.execute(stage, ISSUES_QUERY, variables).await?;
        issues_page(stage, data)
    }

    async fn fetch_comment_page(
        &self,
        number: u64,
        page_size: PageSize,
        cursor: Option<&str>,
    ) -> Result<CommentPage> {
        let stage = FetchStage::CommentPage { issue: number };
        let variables = json!({
            "owner": self.repo.owner,
            "name": self.repo.name,
            "number": number,
            "count": page_size.get(),
            "cursor": cursor,
        });

        let data: wire::CommentsData = self.execute(stage, COMMENTS_QUERY, variables).await?;
        comments_page(stage, data)
    }
}
