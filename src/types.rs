use serde::{Deserialize, Serialize};
use std::fmt;

/// Extension used for rendered documents and cross-reference targets.
pub const DEFAULT_EXTENSION: &str = "md";

/// Directory under the output root holding milestone-grouped links.
pub const MILESTONES_DIR: &str = "milestones";

/// Display name used when the remote reports no author (deleted account).
pub const GHOST_AUTHOR: &str = "ghost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    /// Lower-cased name, used as the state directory under the output root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }

    /// Name of the state in the GraphQL `IssueState` enum.
    pub fn graphql_name(&self) -> &'static str {
        match self {
            IssueState::Open => "OPEN",
            IssueState::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// A single issue as reported by the remote source, without its comments.
///
/// Timestamps are kept as the RFC 3339 strings the remote returned; they are
/// parsed at render time in the caller-selected time zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_at: String,
    pub state: IssueState,
    pub closed_at: Option<String>,
    pub milestone: Option<String>,
}

impl Issue {
    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }

    /// Closing timestamp, present only for closed issues.
    pub fn closing_timestamp(&self) -> Option<&str> {
        if self.is_closed() {
            self.closed_at.as_deref()
        } else {
            None
        }
    }

    /// Milestone title, if set to something other than whitespace.
    pub fn milestone_title(&self) -> Option<&str> {
        self.milestone
            .as_deref()
            .filter(|title| !title.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: String,
}

/// Continuation state returned alongside every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One page of records plus the cursor needed to request the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page_info: PageInfo) -> Self {
        Self { items, page_info }
    }

    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, PageInfo::default())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub type IssuePage = Page<Issue>;
pub type CommentPage = Page<Comment>;

/// File name holding the canonical copy of a record.
pub fn record_filename(number: u64, extension: &str) -> String {
    format!("{}.{}", number, extension)
}
