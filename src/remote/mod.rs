//! Remote issue sources.
//!
//! The sync engine only talks to the [`IssueSource`] trait. [`github`]
//! provides the GitHub GraphQL implementation used by the command line.

pub mod error;
pub mod github;

use jiff::Timestamp;

use crate::config::PageSize;
use crate::error::Result;
use crate::types::{CommentPage, IssuePage, IssueState};

pub use github::GitHubSource;

/// Filter applied to every issue-page query of a run.
#[derive(Debug, Clone)]
pub struct IssueFilter {
    /// States to include.
    pub states: Vec<IssueState>,
    /// Only issues modified at or after this instant. Always sent in UTC.
    pub since: Timestamp,
    /// Records per page, also used for comment pages.
    pub page_size: PageSize,
}

/// A paginated query interface over a repository's issues and comments.
///
/// Implementations perform exactly one remote round trip per call and never
/// retry; failures are reported with their [`error::FetchStage`].
pub trait IssueSource: Send + Sync {
    /// Fetch one page of issues matching `filter`, starting after `cursor`
    /// (`None` requests the first page).
    fn fetch_issue_page(
        &self,
        filter: &IssueFilter,
        cursor: Option<&str>,
    ) -> impl std::future::Future<Output = Result<IssuePage>> + Send;

    /// Fetch one page of comments for issue `number`, starting after `cursor`.
    fn fetch_comment_page(
        &self,
        number: u64,
        page_size: PageSize,
        cursor: Option<&str>,
    ) -> impl std::future::Future<Output = Result<CommentPage>> + Send;
}
