#![allow(dead_code)]

pub mod mock_data;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Helper struct to run the issue-mirror binary in an isolated temp directory
pub struct MirrorTest {
    pub temp_dir: TempDir,
}

impl MirrorTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        MirrorTest { temp_dir }
    }

    /// Run with the token variable removed so no test can reach the network.
    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], vars: &[(&str, &str)]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_issue-mirror"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("GITHUB_TOKEN")
            .env_remove("RUST_LOG")
            .envs(vars.iter().copied())
            .output()
            .expect("Failed to execute issue-mirror")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn write_settings(&self, content: &str) {
        fs::write(self.temp_dir.path().join(".issue-mirror.yaml"), content)
            .expect("Failed to write settings file");
    }

    pub fn settings_exist(&self) -> bool {
        self.temp_dir.path().join(".issue-mirror.yaml").exists()
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// One entry of a captured output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    File(String),
    Link(PathBuf),
}

/// Capture every file and symlink under `root`, keyed by relative path.
pub fn tree_snapshot(root: &Path) -> BTreeMap<PathBuf, TreeEntry> {
    let mut entries = BTreeMap::new();
    if !root.exists() {
        return entries;
    }

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.expect("Failed to walk output tree");
        let relative = entry
            .path()
            .strip_prefix(root)
            .expect("entry outside root")
            .to_path_buf();

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path()).expect("Failed to read link");
            entries.insert(relative, TreeEntry::Link(target));
        } else if entry.file_type().is_file() {
            let content = fs::read_to_string(entry.path()).expect("Failed to read file");
            entries.insert(relative, TreeEntry::File(content));
        }
    }
    entries
}
