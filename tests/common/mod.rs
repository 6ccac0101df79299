//! Shared testing utilities for aw-compile tests.

use assert_cmd::Command;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Testing harness providing an isolated directory for spec files and output.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
    work_dir: PathBuf,
    original_cwd: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let work_dir = root.path().join("work");
        fs::create_dir_all(&work_dir).expect("Failed to create test work directory");
        let original_cwd = env::current_dir().expect("Failed to get current directory");
        Self { root, work_dir, original_cwd }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Write `content` to `name` inside the work directory.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.work_dir.join(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.work_dir.join(name)).expect("Failed to read test file")
    }

    /// Build a command for the compiled `aw-compile` binary, run in the work directory.
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("aw-compile").expect("Failed to locate aw-compile binary");
        cmd.current_dir(&self.work_dir).env_remove("RUST_LOG");
        cmd
    }

    /// Execute a closure after temporarily switching into the work directory.
    pub fn with_work_dir<F, R>(&self, action: F) -> R
    where
        F: FnOnce() -> R,
    {
        env::set_current_dir(&self.work_dir).expect("Failed to switch current dir");
        let result = action();
        env::set_current_dir(&self.original_cwd).expect("Failed to restore current dir");
        result
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.original_cwd);
    }
}

/// Workflow with a pull-request trigger and a handful of kinds.
#[allow(dead_code)]
pub const REVIEW_WORKFLOW: &str = r#"name: Review Helper
on:
  pull_request:
    types: [opened]
safe-outputs:
  add-reviewer:
    max: 1
    reviewers: [alice, bob]
  add-comment:
  create-issue:
    title-prefix: "[review] "
    labels: [automation]
"#;
