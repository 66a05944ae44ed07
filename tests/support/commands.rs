//! Running the daemon binary.

use std::fs;
use std::path::PathBuf;
use std::process::Output;

use assert_cmd::Command;
use tempfile::TempDir;

/// An isolated HOME and config directory for invoking the binary.
pub struct Env {
    pub home: TempDir,
}

impl Env {
    pub fn new() -> Self {
        Self {
            home: TempDir::new().expect("failed to create temp home"),
        }
    }

    /// A command that sees only this environment's HOME and config dir.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("pass-secret-service")
            .expect("failed to find pass-secret-service binary");
        cmd.env("HOME", self.home.path());
        cmd.env("XDG_CONFIG_HOME", self.home.path().join(".config"));
        cmd.env_remove("PASSWORD_STORE_DIR");
        cmd.env_remove("PASS_SECRET_SERVICE_LOG");
        cmd
    }

    /// Write `contents` to a config file in HOME and return its path.
    pub fn config(&self, contents: &str) -> PathBuf {
        let path = self.home.path().join("config.toml");
        fs::write(&path, contents).expect("failed to write config");
        path
    }

    /// Run `--check` with extra arguments.
    pub fn check(&self, args: &[&str]) -> Output {
        self.cmd()
            .arg("--check")
            .args(args)
            .output()
            .expect("failed to run pass-secret-service --check")
    }
}
