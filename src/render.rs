//! Document rendering.
//!
//! Turns one issue and its full comment list into the text stored on disk:
//!
//! ```text
//! {title}
//! ---
//!
//! Created by {author} on {created}:
//!
//! {body}
//!
//! ---
//!
//! {author} commented on {created}:
//!
//! {comment body}
//!
//! ---
//! Closed on {closed}
//! ```
//!
//! Every `#N` in a body becomes a relative link to `N.{ext}`.

use std::borrow::Cow;
use std::sync::LazyLock;

use jiff::Timestamp;
use jiff::tz::TimeZone;
use regex::{Captures, Regex};

use crate::error::{MirrorError, Result};
use crate::types::{Comment, Issue};

static ISSUE_REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("issue reference regex should be valid"));

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z %Z";

/// Render the document for `issue`.
///
/// `closed_at` is appended as a footer when present. Timestamps are shown in
/// `tz`. The only failure is a timestamp the remote sent in a form that is
/// not RFC 3339.
pub fn render_issue(
    issue: &Issue,
    comments: &[Comment],
    closed_at: Option<&str>,
    tz: &TimeZone,
    extension: &str,
) -> Result<String> {
    let mut doc = format!(
        "{}\n---\n\nCreated by {} on {}:\n\n{}\n\n---\n",
        issue.title,
        issue.author,
        format_timestamp(&issue.created_at, tz)?,
        link_issue_references(&issue.body, extension),
    );

    for comment in comments {
        doc.push_str(&format!(
            "\n{} commented on {}:\n\n{}\n\n---\n",
            comment.author,
            format_timestamp(&comment.created_at, tz)?,
            link_issue_references(&comment.body, extension),
        ));
    }

    if let Some(closed_at) = closed_at {
        doc.push_str(&format!("Closed on {}", format_timestamp(closed_at, tz)?));
    }

    Ok(doc)
}

/// Rewrite every `#N` into `[#N](N.{extension})`.
pub fn link_issue_references<'a>(text: &'a str, extension: &str) -> Cow<'a, str> {
    ISSUE_REFERENCE_RE.replace_all(text, |caps: &Captures| {
        let number = &caps[1];
        format!("[#{number}]({number}.{extension})")
    })
}

/// Format an RFC 3339 timestamp in `tz`, e.g. `2024-01-02 15:04:05 +0000 UTC`.
pub fn format_timestamp(value: &str, tz: &TimeZone) -> Result<String> {
    let ts: Timestamp = value
        .parse()
        .map_err(|e| MirrorError::MalformedTimestamp {
            value: value.to_string(),
            source: e,
        })?;
    Ok(ts.to_zoned(tz.clone()).strftime(TIMESTAMP_FORMAT).to_string())
}
