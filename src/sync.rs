//! Pagination driver.
//!
//! A run pulls issue pages in order, drains every comment page of each issue
//! before rendering it, and hands the document to the [`Reconciler`]. The
//! work is strictly sequential: one request in flight, records written in
//! the order the source yields them.

use std::future::Future;
use std::path::PathBuf;
use std::pin::pin;

use futures::{Stream, TryStreamExt};

use crate::config::{PageSize, SyncOptions};
use crate::error::{MirrorError, Result};
use crate::reconcile::{Reconciler, SyncSession};
use crate::remote::error::FetchStage;
use crate::remote::{IssueFilter, IssueSource};
use crate::render::render_issue;
use crate::snapshot::SnapshotIndex;
use crate::types::{Comment, Page, PageInfo};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The first issue page was empty: nothing changed since the last sync.
    Quiescent,
    /// At least one record was fetched and written.
    Completed(SyncSession),
}

impl SyncOutcome {
    pub fn is_quiescent(&self) -> bool {
        matches!(self, SyncOutcome::Quiescent)
    }

    pub fn count(&self) -> usize {
        match self {
            SyncOutcome::Quiescent => 0,
            SyncOutcome::Completed(session) => session.count(),
        }
    }

    /// Canonical paths written, in write order.
    pub fn written(&self) -> &[PathBuf] {
        match self {
            SyncOutcome::Quiescent => &[],
            SyncOutcome::Completed(session) => session.written(),
        }
    }
}

/// Cursor for the page after `info`, or `None` once the listing is done.
fn next_cursor(stage: FetchStage, info: &PageInfo) -> Result<Option<String>> {
    if !info.has_next_page {
        return Ok(None);
    }
    match &info.end_cursor {
        Some(cursor) if !cursor.is_empty() => Ok(Some(cursor.clone())),
        _ => Err(stage.error("page reports more results but carries no end cursor")),
    }
}

/// Pull-based stream over the pages of one listing.
///
/// `fetch` is called with `None` for the first page and with the previous
/// page's end cursor afterwards; the stream ends after the first page that
/// reports no successor.
pub fn paginate<T, F, Fut>(stage: FetchStage, fetch: F) -> impl Stream<Item = Result<Page<T>>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    futures::stream::try_unfold(
        (fetch, Some(None::<String>)),
        move |(mut fetch, state)| async move {
            let Some(cursor) = state else {
                return Ok::<_, MirrorError>(None);
            };
            let page = fetch(cursor).await?;
            let next = next_cursor(stage, &page.page_info)?;
            Ok(Some((page, (fetch, next.map(Some)))))
        },
    )
}

/// Fetch every comment of issue `number`, in the order the source returns them.
pub async fn collect_comments<S: IssueSource>(
    source: &S,
    number: u64,
    page_size: PageSize,
) -> Result<Vec<Comment>> {
    let stage = FetchStage::CommentPage { issue: number };
    let mut pages = pin!(paginate(stage, move |cursor: Option<String>| async move {
        source
            .fetch_comment_page(number, page_size, cursor.as_deref())
            .await
    }));

    let mut comments = Vec::new();
    let mut page_count = 0usize;
    while let Some(page) = pages.try_next().await? {
        page_count += 1;
        comments.extend(page.items);
    }

    if page_count > 1 {
        tracing::debug!(
            "Fetched {} comment(s) for issue #{} over {} pages",
            comments.len(),
            number,
            page_count
        );
    }
    Ok(comments)
}

/// One mirroring run against a source.
pub struct SyncEngine<'a, S> {
    source: &'a S,
    options: &'a SyncOptions,
}

impl<'a, S: IssueSource> SyncEngine<'a, S> {
    pub fn new(source: &'a S, options: &'a SyncOptions) -> Self {
        Self { source, options }
    }

    /// Run the sync to completion.
    ///
    /// Options are validated before any network or filesystem access. Any
    /// failure aborts the run; files already written stay on disk and are
    /// corrected by the next run's reconciliation.
    pub async fn run(&self) -> Result<SyncOutcome> {
        let page_size = self.options.validate()?;
        let filter = IssueFilter {
            states: self.options.states(),
            since: self.options.since,
            page_size,
        };

        tracing::info!(
            "Getting new and updated issues since {} into {}",
            filter.since,
            self.options.output_root.display()
        );

        let mut index = SnapshotIndex::build(&self.options.output_root)?;
        let reconciler = Reconciler::new(self.options);
        let mut session = SyncSession::new();

        let source = self.source;
        let filter_ref = &filter;
        let mut pages = pin!(paginate(
            FetchStage::IssuePage,
            move |cursor: Option<String>| async move {
                source.fetch_issue_page(filter_ref, cursor.as_deref()).await
            }
        ));

        let mut first_page = true;
        while let Some(page) = pages.try_next().await? {
            if first_page && page.is_empty() {
                tracing::info!("No new or updated issues found");
                return Ok(SyncOutcome::Quiescent);
            }
            first_page = false;

            for issue in &page.items {
                let comments = collect_comments(self.source, issue.number, page_size).await?;
                let document = render_issue(
                    issue,
                    &comments,
                    issue.closing_timestamp(),
                    &self.options.time_zone,
                    &self.options.extension,
                )?;
                reconciler.reconcile(&mut index, &mut session, issue, &document)?;
            }
        }

        tracing::info!(
            "Downloaded {} issue(s) including comments",
            session.count()
        );
        Ok(SyncOutcome::Completed(session))
    }
}
