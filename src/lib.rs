pub mod cli;
pub mod config;
pub mod error;
pub mod milestone;
pub mod reconcile;
pub mod remote;
pub mod render;
pub mod snapshot;
pub mod sync;
pub mod types;
pub mod utils;

pub use config::{PageSize, RepoId, Settings, SyncOptions};
pub use error::{MirrorError, Result};
pub use milestone::{LinkOutcome, MilestonePartitioner, sanitize_milestone};
pub use reconcile::{Reconciler, SyncSession};
pub use remote::error::FetchStage;
pub use remote::{GitHubSource, IssueFilter, IssueSource};
pub use render::render_issue;
pub use snapshot::SnapshotIndex;
pub use sync::{SyncEngine, SyncOutcome};
pub use types::{Comment, CommentPage, Issue, IssuePage, IssueState, Page, PageInfo};
