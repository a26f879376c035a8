//! Command-line surface.
//!
//! Flags override values from the settings file; the merged settings are
//! written back after a successful run together with the new sync time.

use std::path::{Path, PathBuf};

use clap::Parser;
use jiff::Timestamp;
use owo_colors::OwoColorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{
    DEFAULT_OUTPUT_DIR, DEFAULT_PAGE_SIZE, RepoId, Settings, SyncOptions, TOKEN_ENV_VAR,
};
use crate::error::{MirrorError, Result};
use crate::remote::GitHubSource;
use crate::sync::{SyncEngine, SyncOutcome};
use crate::types::DEFAULT_EXTENSION;

const AFTER_HELP: &str = "\
The GitHub token is read from the GITHUB_TOKEN environment variable, or from
githubToken in the settings file.

Mirror all open issues of octocat/hello-world into ./issues:
    GITHUB_TOKEN=mysecrettoken issue-mirror -r octocat/hello-world

After the first run the settings file (.issue-mirror.yaml) remembers the
flags and the time of the last sync, so later runs only fetch issues that
changed since then.";

#[derive(Parser, Debug, Default)]
#[command(name = "issue-mirror")]
#[command(about = "Mirror GitHub issues into a plain-text Markdown tree")]
#[command(version)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Repository to mirror (e.g. octocat/hello-world)
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Output folder for the mirrored issues [default: ./issues]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of issues/comments to fetch per request [default: 100]
    #[arg(short, long, allow_negative_numbers = true)]
    pub count: Option<i64>,

    /// Mirror closed issues as well as open ones
    #[arg(long)]
    pub all: bool,

    /// Show dates in UTC instead of the local time zone
    #[arg(long)]
    pub utc: bool,

    /// Also group issues by milestone under milestones/
    #[arg(long)]
    pub milestones: bool,

    /// Settings file [default: .issue-mirror.yaml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Overlay the flags that were given onto `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(repo) = &self.repo {
            settings.repo = Some(repo.clone());
        }
        if let Some(output) = &self.output {
            settings.output = Some(output.clone());
        }
        if let Some(count) = self.count {
            settings.count = Some(count);
        }
        settings.all |= self.all;
        settings.utc |= self.utc;
        settings.milestones |= self.milestones;
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Settings::default_path)
    }
}

/// Install the stderr log subscriber.
///
/// RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Build the engine inputs from merged settings.
pub fn sync_options(settings: &Settings) -> SyncOptions {
    SyncOptions {
        output_root: settings
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        page_size: settings.count.unwrap_or(DEFAULT_PAGE_SIZE),
        include_closed: settings.all,
        time_zone: settings.time_zone(),
        since: settings.since(),
        group_by_milestone: settings.milestones,
        extension: DEFAULT_EXTENSION.to_string(),
    }
}

/// Resolve the repository from merged settings.
pub fn repository(settings: &Settings) -> Result<RepoId> {
    let repo = settings.repo.as_deref().ok_or_else(|| {
        MirrorError::Config(
            "no repository given. Pass --repo owner/name or set repo in the settings file"
                .to_string(),
        )
    })?;
    RepoId::parse(repo)
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings_path = cli.settings_path();
    let mut settings = Settings::load(&settings_path)?;
    cli.apply_to(&mut settings);

    let repo = repository(&settings)?;
    let options = sync_options(&settings);
    options.validate()?;

    let token = settings.github_token().ok_or_else(|| {
        MirrorError::Auth(format!(
            "GitHub token not configured. Set the {} environment variable or githubToken in {}",
            TOKEN_ENV_VAR,
            settings_path.display()
        ))
    })?;
    let source = GitHubSource::new(repo.clone(), &token)?;

    let started = Timestamp::now();
    tracing::info!("Mirroring {} since {}", repo, options.since);
    let outcome = SyncEngine::new(&source, &options).run().await?;
    print_report(&outcome, &options);

    settings.mark_synced(started);
    save_settings(&settings, &settings_path)
}

fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    settings.save(path)?;
    tracing::debug!("Updated {}", path.display());
    Ok(())
}

fn print_report(outcome: &SyncOutcome, options: &SyncOptions) {
    match outcome {
        SyncOutcome::Quiescent => {
            println!("No new or updated issues since {}", options.since);
        }
        SyncOutcome::Completed(session) => {
            for path in session.written() {
                println!("{}", path.display().cyan());
            }
            println!("Mirrored {} issue(s)", session.count().green());
        }
    }
}
