//! Run configuration for the mirror.
//!
//! Two layers live here:
//! - [`SyncOptions`], the validated inputs consumed by the sync engine
//! - [`Settings`], the YAML file persisted between runs (`.issue-mirror.yaml`)
//!   holding defaults for the command line and the last sync time

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};
use crate::types::{DEFAULT_EXTENSION, IssueState};

/// Default name of the settings file, looked up in the working directory.
pub const SETTINGS_FILE_NAME: &str = ".issue-mirror.yaml";

/// Default output root for rendered documents.
pub const DEFAULT_OUTPUT_DIR: &str = "./issues";

/// Default number of issues/comments requested per page.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Environment variable consulted for the access token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    /// Parse `owner/name`. Exactly two non-empty components are required.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(MirrorError::InvalidRepository(s.to_string()));
        }

        Ok(RepoId {
            owner: parts[0].trim().to_string(),
            name: parts[1].trim().to_string(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepoId {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        RepoId::parse(s)
    }
}

/// Number of records requested per page. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(u32);

impl PageSize {
    pub fn new(size: i64) -> Result<Self> {
        match u32::try_from(size) {
            Ok(n) if n > 0 => Ok(PageSize(n)),
            _ => Err(MirrorError::InvalidPageSize(size)),
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Inputs for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Root of the mirrored tree.
    pub output_root: PathBuf,
    /// Requested page size; validated when the run starts.
    pub page_size: i64,
    /// Mirror closed issues as well as open ones.
    pub include_closed: bool,
    /// Zone used when rendering timestamps.
    pub time_zone: TimeZone,
    /// Only records modified at or after this instant are fetched.
    pub since: Timestamp,
    /// Link documents under `milestones/<title>/<state>/`.
    pub group_by_milestone: bool,
    /// Extension for documents and cross-reference targets.
    pub extension: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            output_root: PathBuf::from(DEFAULT_OUTPUT_DIR),
            page_size: DEFAULT_PAGE_SIZE,
            include_closed: false,
            time_zone: TimeZone::system(),
            since: Timestamp::UNIX_EPOCH,
            group_by_milestone: false,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl SyncOptions {
    /// Validate everything that can be checked without touching the network
    /// or the filesystem.
    pub fn validate(&self) -> Result<PageSize> {
        if self.extension.is_empty() || self.extension.contains(std::path::is_separator) {
            return Err(MirrorError::Config(format!(
                "invalid document extension '{}'",
                self.extension
            )));
        }
        PageSize::new(self.page_size)
    }

    /// States requested from the remote source.
    pub fn states(&self) -> Vec<IssueState> {
        if self.include_closed {
            vec![IssueState::Open, IssueState::Closed]
        } else {
            vec![IssueState::Open]
        }
    }
}

/// Settings persisted between runs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,

    #[serde(default)]
    pub all: bool,

    #[serde(default)]
    pub utc: bool,

    #[serde(default)]
    pub milestones: bool,

    /// RFC 3339 time of the last successful sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_issue_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("repo", &self.repo)
            .field("output", &self.output)
            .field("count", &self.count)
            .field("all", &self.all)
            .field("utc", &self.utc)
            .field("milestones", &self.milestones)
            .field("last_issue_time", &self.last_issue_time)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Settings {
    /// Default location of the settings file.
    pub fn default_path() -> PathBuf {
        PathBuf::from(SETTINGS_FILE_NAME)
    }

    /// Load settings from file, or return defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(path).map_err(|e| MirrorError::Storage {
            operation: "read",
            item_type: "settings file",
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: Settings = serde_yaml_ng::from_str(&content)?;
        tracing::debug!("Using settings file: {}", path.display());
        Ok(settings)
    }

    /// Save settings to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        crate::utils::write_file_atomic(path, &content)
    }

    /// Parse the stored last sync time.
    ///
    /// A missing or unparseable value falls back to the Unix epoch, which
    /// mirrors everything.
    pub fn since(&self) -> Timestamp {
        let Some(raw) = self.last_issue_time.as_deref() else {
            return Timestamp::UNIX_EPOCH;
        };

        match raw.parse::<Timestamp>() {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(
                    "Unable to parse last sync time '{}' ({}), using default value of {}",
                    raw,
                    e,
                    Timestamp::UNIX_EPOCH
                );
                Timestamp::UNIX_EPOCH
            }
        }
    }

    /// Record `at` as the last successful sync, truncated to whole seconds.
    pub fn mark_synced(&mut self, at: Timestamp) {
        let at = Timestamp::from_second(at.as_second()).unwrap_or(at);
        self.last_issue_time = Some(at.to_string());
    }

    /// Get the GitHub token from the environment or the settings file.
    pub fn github_token(&self) -> Option<String> {
        if let Ok(token) = env::var(TOKEN_ENV_VAR)
            && !token.is_empty()
        {
            return Some(token);
        }

        self.github_token.clone().filter(|t| !t.is_empty())
    }

    /// Time zone selected by the `utc` flag.
    pub fn time_zone(&self) -> TimeZone {
        if self.utc {
            TimeZone::UTC
        } else {
            TimeZone::system()
        }
    }
}
