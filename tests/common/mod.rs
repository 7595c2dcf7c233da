//! Common test utilities for rdgai integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never read the
//! user's `~/.config/rdgai/config.kdl` or their API key.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated working and config directories.
///
/// Each `TestEnv` creates two temporary directories:
/// - `work_dir`: Holds the documents and spreadsheets a test works on
/// - `config_dir`: Stands in for the XDG config home
///
/// The `rdgai()` method returns a `Command` with the environment set
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the rdgai binary.
    pub fn rdgai(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rdgai"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.config_dir.path());
        cmd.env("HOME", self.config_dir.path());
        cmd.env_remove("RDGAI_CONFIG");
        cmd.env_remove("RDGAI_LOG");
        cmd.env_remove("OPENAI_API_KEY");
        cmd
    }

    /// Copy a document from `tests/data/` into the working directory.
    pub fn fixture(&self, name: &str) -> PathBuf {
        let source = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("data")
            .join(name);
        let target = self.work_dir.path().join(name);
        std::fs::copy(&source, &target).unwrap();
        target
    }

    /// A path inside the working directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.work_dir.path().join(name)
    }

    /// Read a file from the working directory.
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }

    /// Run a command that must succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.rdgai().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "rdgai {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
