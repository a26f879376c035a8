//! Error shaping for remote sources.
//!
//! Every transport or API failure is tagged with the [`FetchStage`] it
//! happened in so the caller can tell an issue-list failure from a failure
//! while draining one issue's comments.

use std::fmt;

use serde::Deserialize;

use crate::error::MirrorError;

/// Which query was in flight when a remote failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    IssuePage,
    CommentPage { issue: u64 },
}

impl FetchStage {
    /// Build a fetch error for this stage.
    pub fn error(self, message: impl Into<String>) -> MirrorError {
        MirrorError::Fetch {
            stage: self,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::IssuePage => write!(f, "issue page"),
            FetchStage::CommentPage { issue } => write!(f, "comment page of issue #{}", issue),
        }
    }
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kind) = &self.kind {
            write!(f, "[{}] ", kind)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(path) = &self.path
            && !path.is_empty()
        {
            let joined = path
                .iter()
                .map(|segment| match segment {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(".");
            write!(f, " (at {})", joined)?;
        }
        Ok(())
    }
}

/// Shorten a response body for inclusion in an error message.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
