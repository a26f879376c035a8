//! Milestone grouping.
//!
//! The canonical copy of a record always lives under `{root}/{state}/`.
//! Grouping adds a relative symlink at
//! `{root}/milestones/{milestone}/{state}/{number}.{ext}` pointing back at
//! it, so the tree stays valid when the root is moved.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};
use crate::types::{IssueState, MILESTONES_DIR, record_filename};
use crate::utils::ensure_dir;

/// Result of a link request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    AlreadyPresent,
}

/// Make a milestone title usable as a single directory name.
///
/// Path separators (`/` and `\`) become `_`. A title made only of dots is
/// turned into underscores as well so it cannot name `.` or `..`.
pub fn sanitize_milestone(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        sanitized.replace('.', "_")
    } else {
        sanitized
    }
}

pub struct MilestonePartitioner<'a> {
    root: &'a Path,
    include_closed: bool,
    extension: &'a str,
}

impl<'a> MilestonePartitioner<'a> {
    pub fn new(root: &'a Path, include_closed: bool, extension: &'a str) -> Self {
        Self {
            root,
            include_closed,
            extension,
        }
    }

    /// Directory grouping every record of `milestone`.
    pub fn milestone_dir(&self, milestone: &str) -> PathBuf {
        self.root
            .join(MILESTONES_DIR)
            .join(sanitize_milestone(milestone))
    }

    /// Location of the link for record `number` in `state`.
    pub fn link_path(&self, milestone: &str, state: IssueState, number: u64) -> PathBuf {
        self.milestone_dir(milestone)
            .join(state.dir_name())
            .join(record_filename(number, self.extension))
    }

    /// Link target, relative to the link's own directory.
    pub fn link_target(&self, state: IssueState, number: u64) -> PathBuf {
        Path::new("..")
            .join("..")
            .join("..")
            .join(state.dir_name())
            .join(record_filename(number, self.extension))
    }

    /// Ensure `open/` (and `closed/` when closed issues are mirrored) exist
    /// under the milestone directory.
    pub fn prepare(&self, milestone: &str) -> Result<PathBuf> {
        let dir = self.milestone_dir(milestone);
        ensure_dir(&dir.join(IssueState::Open.dir_name()))?;
        if self.include_closed {
            ensure_dir(&dir.join(IssueState::Closed.dir_name()))?;
        }
        Ok(dir)
    }

    /// Link the canonical copy of `number` into its milestone group.
    ///
    /// An entry already present at the link location counts as done.
    pub fn link(&self, milestone: &str, state: IssueState, number: u64) -> Result<LinkOutcome> {
        self.prepare(milestone)?;

        let link = self.link_path(milestone, state, number);
        if let Some(parent) = link.parent() {
            ensure_dir(parent)?;
        }

        match create_symlink(&self.link_target(state, number), &link) {
            Ok(()) => {
                tracing::debug!("Linked {}", link.display());
                Ok(LinkOutcome::Created)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::warn!("Milestone link {} already exists", link.display());
                Ok(LinkOutcome::AlreadyPresent)
            }
            Err(e) => Err(MirrorError::Storage {
                operation: "link",
                item_type: "milestone entry",
                path: link,
                source: e,
            }),
        }
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
