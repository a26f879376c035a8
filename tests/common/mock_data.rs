//! In-memory issue source that records every query it receives.

use std::collections::HashMap;

use issue_mirror::{
    Comment, CommentPage, FetchStage, Issue, IssueFilter, IssuePage, IssueSource, IssueState,
    Page, PageInfo, PageSize, Result,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    IssuePage {
        cursor: Option<String>,
    },
    CommentPage {
        issue: u64,
        cursor: Option<String>,
    },
}

#[derive(Default)]
pub struct MockSource {
    issue_pages: Vec<Vec<Issue>>,
    comment_pages: HashMap<u64, Vec<Vec<Comment>>>,
    failing_comments: Option<u64>,
    calls: Mutex<Vec<Call>>,
    filters: Mutex<Vec<IssueFilter>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these issue pages in order.
    pub fn with_issue_pages(mut self, pages: Vec<Vec<Issue>>) -> Self {
        self.issue_pages = pages;
        self
    }

    /// Serve these comment pages for issue `number`. Issues without an entry
    /// get a single empty page.
    pub fn with_comment_pages(mut self, number: u64, pages: Vec<Vec<Comment>>) -> Self {
        self.comment_pages.insert(number, pages);
        self
    }

    /// Fail every comment request for issue `number`.
    pub fn failing_comments_for(mut self, number: u64) -> Self {
        self.failing_comments = Some(number);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn issue_page_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::IssuePage { .. }))
            .count()
    }

    pub fn comment_page_calls(&self, number: u64) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::CommentPage { issue, .. } if *issue == number))
            .count()
    }

    pub fn filters(&self) -> Vec<IssueFilter> {
        self.filters.lock().clone()
    }
}

fn page_index(prefix: &str, cursor: Option<&str>) -> usize {
    cursor
        .and_then(|c| c.strip_prefix(prefix))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn serve<T: Clone>(pages: &[Vec<T>], index: usize, prefix: &str) -> Page<T> {
    let items = pages.get(index).cloned().unwrap_or_default();
    let has_next_page = index + 1 < pages.len();
    Page::new(
        items,
        PageInfo {
            has_next_page,
            end_cursor: Some(format!("{}{}", prefix, index + 1)),
        },
    )
}

impl IssueSource for MockSource {
    async fn fetch_issue_page(
        &self,
        filter: &IssueFilter,
        cursor: Option<&str>,
    ) -> Result<IssuePage> {
        self.calls.lock().push(Call::IssuePage {
            cursor: cursor.map(str::to_string),
        });
        self.filters.lock().push(filter.clone());

        Ok(serve(
            &self.issue_pages,
            page_index("issues-", cursor),
            "issues-",
        ))
    }

    async fn fetch_comment_page(
        &self,
        number: u64,
        _page_size: PageSize,
        cursor: Option<&str>,
    ) -> Result<CommentPage> {
        self.calls.lock().push(Call::CommentPage {
            issue: number,
            cursor: cursor.map(str::to_string),
        });

        if self.failing_comments == Some(number) {
            return Err(FetchStage::CommentPage { issue: number }.error("connection reset"));
        }

        let pages = self.comment_pages.get(&number).cloned().unwrap_or_default();
        Ok(serve(&pages, page_index("comments-", cursor), "comments-"))
    }
}

pub fn issue(number: u64, state: IssueState) -> Issue {
    Issue {
        number,
        title: format!("Issue number {}", number),
        body: format!("Body of issue {}", number),
        author: "octocat".to_string(),
        created_at: "2024-01-01T12:00:00Z".to_string(),
        state,
        closed_at: match state {
            IssueState::Open => None,
            IssueState::Closed => Some("2024-02-01T12:00:00Z".to_string()),
        },
        milestone: None,
    }
}

pub fn issue_with_body(number: u64, body: &str) -> Issue {
    Issue {
        body: body.to_string(),
        ..issue(number, IssueState::Open)
    }
}

pub fn issue_with_milestone(number: u64, state: IssueState, milestone: &str) -> Issue {
    Issue {
        milestone: Some(milestone.to_string()),
        ..issue(number, state)
    }
}

pub fn comment(author: &str, body: &str) -> Comment {
    Comment {
        author: author.to_string(),
        body: body.to_string(),
        created_at: "2024-01-02T08:30:00Z".to_string(),
    }
}
