//! Per-record reconciliation of the output tree.
//!
//! For each fetched record the reconciler removes every file the snapshot
//! holds for its identity, writes the fresh document to the canonical
//! `{root}/{state}/{number}.{ext}` location and, when grouping is on, links
//! it into its milestone directory.

use std::path::{Path, PathBuf};

use crate::config::SyncOptions;
use crate::error::Result;
use crate::milestone::MilestonePartitioner;
use crate::snapshot::SnapshotIndex;
use crate::types::{Issue, IssueState, record_filename};
use crate::utils::{delete_file, write_file_atomic};

/// What one run has written so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSession {
    written: Vec<PathBuf>,
}

impl SyncSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records processed.
    pub fn count(&self) -> usize {
        self.written.len()
    }

    /// Canonical paths written, in write order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn record(&mut self, path: PathBuf) {
        self.written.push(path);
    }
}

pub struct Reconciler<'a> {
    root: &'a Path,
    extension: &'a str,
    milestones: Option<MilestonePartitioner<'a>>,
}

impl<'a> Reconciler<'a> {
    pub fn new(options: &'a SyncOptions) -> Self {
        let milestones = options.group_by_milestone.then(|| {
            MilestonePartitioner::new(
                &options.output_root,
                options.include_closed,
                &options.extension,
            )
        });

        Self {
            root: &options.output_root,
            extension: &options.extension,
            milestones,
        }
    }

    /// Canonical location of record `number` in `state`.
    pub fn canonical_path(&self, state: IssueState, number: u64) -> PathBuf {
        self.root
            .join(state.dir_name())
            .join(record_filename(number, self.extension))
    }

    /// Replace whatever the tree holds for `issue` with `document`.
    ///
    /// Any failure to delete a stale copy is fatal, since leaving it would
    /// leave two copies of one record behind.
    pub fn reconcile(
        &self,
        index: &mut SnapshotIndex,
        session: &mut SyncSession,
        issue: &Issue,
        document: &str,
    ) -> Result<PathBuf> {
        for stale in index.take(issue.number, self.extension) {
            tracing::debug!("Removing {}", stale.display());
            delete_file(&stale)?;
        }

        let path = self.canonical_path(issue.state, issue.number);
        write_file_atomic(&path, document)?;
        tracing::debug!("Wrote {}", path.display());

        if let Some(partitioner) = &self.milestones
            && let Some(milestone) = issue.milestone_title()
        {
            partitioner.link(milestone, issue.state, issue.number)?;
        }

        session.record(path.clone());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirrorError;
    use std::fs;
    use tempfile::TempDir;

    fn options(root: &Path, milestones: bool) -> SyncOptions {
        SyncOptions {
            output_root: root.to_path_buf(),
            include_closed: true,
            group_by_milestone: milestones,
            ..SyncOptions::default()
        }
    }

    fn issue(number: u64, state: IssueState, milestone: Option<&str>) -> Issue {
        Issue {
            number,
            title: format!("Issue {}", number),
            body: String::new(),
            author: "octocat".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            state,
            closed_at: None,
            milestone: milestone.map(str::to_string),
        }
    }

    #[test]
    fn test_reconcile_cold_start_writes_canonical_copy() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("issues");
        let options = options(&root, false);
        let reconciler = Reconciler::new(&options);
        let mut index = SnapshotIndex::build(&root).unwrap();
        let mut session = SyncSession::new();

        let path = reconciler
            .reconcile(&mut index, &mut session, &issue(1, IssueState::Open, None), "doc")
            .unwrap();

        assert_eq!(path, root.join("open").join("1.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "doc");
        assert_eq!(session.count(), 1);
        assert_eq!(session.written(), &[path]);
    }

    #[test]
    fn test_reconcile_moves_record_between_states() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("open")).unwrap();
        fs::write(root.join("open").join("2.md"), "old").unwrap();

        let options = options(root, false);
        let reconciler = Reconciler::new(&options);
        let mut index = SnapshotIndex::build(root).unwrap();
        let mut session = SyncSession::new();

        reconciler
            .reconcile(&mut index, &mut session, &issue(2, IssueState::Closed, None), "new")
            .unwrap();

        assert!(!root.join("open").join("2.md").exists());
        assert_eq!(
            fs::read_to_string(root.join("closed").join("2.md")).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_reconcile_removes_duplicates_anywhere_in_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("open")).unwrap();
        fs::create_dir_all(root.join("archive").join("old")).unwrap();
        fs::write(root.join("open").join("3.md"), "a").unwrap();
        fs::write(root.join("archive").join("old").join("3.md"), "b").unwrap();
        fs::write(root.join("open").join("30.md"), "other").unwrap();

        let options = options(root, false);
        let reconciler = Reconciler::new(&options);
        let mut index = SnapshotIndex::build(root).unwrap();
        let mut session = SyncSession::new();

        reconciler
            .reconcile(&mut index, &mut session, &issue(3, IssueState::Open, None), "c")
            .unwrap();

        assert!(!root.join("archive").join("old").join("3.md").exists());
        assert_eq!(fs::read_to_string(root.join("open").join("3.md")).unwrap(), "c");
        assert!(root.join("open").join("30.md").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_reconcile_links_milestone() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let options = options(root, true);
        let reconciler = Reconciler::new(&options);
        let mut index = SnapshotIndex::build(root).unwrap();
        let mut session = SyncSession::new();

        reconciler
            .reconcile(
                &mut index,
                &mut session,
                &issue(4, IssueState::Open, Some("Release/1.0")),
                "doc",
            )
            .unwrap();

        let link = root.join("milestones/Release_1.0/open/4.md");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&link).unwrap(), "doc");
        assert_eq!(session.written(), &[root.join("open").join("4.md")]);
    }

    #[test]
    #[cfg(unix)]
    fn test_reconcile_drops_link_when_milestone_changes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let options = options(root, true);
        let reconciler = Reconciler::new(&options);

        let mut index = SnapshotIndex::build(root).unwrap();
        let mut session = SyncSession::new();
        reconciler
            .reconcile(&mut index, &mut session, &issue(5, IssueState::Open, Some("v1")), "a")
            .unwrap();

        let mut index = SnapshotIndex::build(root).unwrap();
        reconciler
            .reconcile(&mut index, &mut session, &issue(5, IssueState::Open, Some("v2")), "b")
            .unwrap();

        assert!(fs::symlink_metadata(root.join("milestones/v1/open/5.md")).is_err());
        assert_eq!(
            fs::read_to_string(root.join("milestones/v2/open/5.md")).unwrap(),
            "b"
        );
    }

    #[test]
    fn test_reconcile_ignores_milestone_when_grouping_disabled() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let options = options(root, false);
        let reconciler = Reconciler::new(&options);
        let mut index = SnapshotIndex::build(root).unwrap();
        let mut session = SyncSession::new();

        reconciler
            .reconcile(&mut index, &mut session, &issue(6, IssueState::Open, Some("v1")), "a")
            .unwrap();

        assert!(!root.join("milestones").exists());
    }

    #[test]
    fn test_reconcile_stops_when_stale_copy_cannot_be_removed() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        // A directory carrying the record's file name cannot be removed as a file.
        let blocker = root.join("archive").join("8.md");
        fs::create_dir_all(&blocker).unwrap();

        let options = options(root, false);
        let reconciler = Reconciler::new(&options);
        let mut index = SnapshotIndex::default();
        index.insert("8.md".to_string(), blocker.clone());
        let mut session = SyncSession::new();

        let result =
            reconciler.reconcile(&mut index, &mut session, &issue(8, IssueState::Open, None), "doc");

        match result {
            Err(MirrorError::Storage {
                operation, path, ..
            }) => {
                assert_eq!(operation, "delete");
                assert_eq!(path, blocker);
            }
            other => panic!("expected delete failure, got {:?}", other),
        }
        assert!(!root.join("open").join("8.md").exists());
        assert!(blocker.is_dir());
        assert_eq!(session.count(), 0);
    }
}
