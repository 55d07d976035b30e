//! Temporary repositories and the git calls that shape them

#![allow(dead_code)]

use assert_cmd::Command;
use git_dashboard::core::error::{DashboardError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A repository in a temporary directory. The TempDir must be kept alive
/// for the duration of the test to prevent cleanup.
pub struct TestRepo {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The binary, run inside this repository with an unused config path
    pub fn dashboard(&self) -> Command {
        let mut cmd = Command::cargo_bin("git-dashboard").expect("binary is built");
        cmd.current_dir(&self.path)
            .env("NO_COLOR", "1")
            .env_remove("EDITOR")
            .env_remove("VISUAL")
            .arg("--config")
            .arg(self.temp_dir.path().join("no-config.json"));
        cmd
    }

    /// Run git and return trimmed stdout, failing the test on non-zero exit
    pub fn git(&self, args: &[&str]) -> String {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .expect("git runs");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim_end().to_string()
    }

    /// Whether git exits successfully
    pub fn git_ok(&self, args: &[&str]) -> bool {
        std::process::Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

fn run_git(path: &Path, args: &[&str]) -> Result<()> {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(path)
        .output()?;
    if !output.status.success() {
        return Err(DashboardError::command_failed(
            format!("git {}", args.join(" ")),
            &String::from_utf8_lossy(&output.stderr),
            output.status.code().unwrap_or(-1),
        ));
    }
    Ok(())
}

/// A fresh repository on `main` with a local identity
pub fn setup_test_repo() -> Result<TestRepo> {
    let temp_dir = TempDir::new()?;
    let repo_path = temp_dir.path().join("repo");
    fs::create_dir(&repo_path)?;

    run_git(&repo_path, &["init", "--quiet", "--initial-branch=main"])?;
    run_git(&repo_path, &["config", "user.name", "Test User"])?;
    run_git(&repo_path, &["config", "user.email", "test@example.com"])?;
    run_git(&repo_path, &["config", "commit.gpgsign", "false"])?;

    Ok(TestRepo {
        temp_dir,
        path: repo_path,
    })
}

/// A repository whose history holds `initial.txt`
pub fn setup_test_repo_with_initial_commit() -> Result<TestRepo> {
    let repo = setup_test_repo()?;
    create_file(&repo.path, "initial.txt", "initial content\n")?;
    git_add(&repo.path, "initial.txt")?;
    git_commit(&repo.path, "Initial commit")?;
    Ok(repo)
}

pub fn create_file(repo_path: &Path, filename: &str, content: &str) -> Result<()> {
    fs::write(repo_path.join(filename), content)?;
    Ok(())
}

pub fn remove_file(repo_path: &Path, filename: &str) -> Result<()> {
    fs::remove_file(repo_path.join(filename))?;
    Ok(())
}

pub fn git_add(repo_path: &Path, filename: &str) -> Result<()> {
    run_git(repo_path, &["add", filename])
}

pub fn git_commit(repo_path: &Path, message: &str) -> Result<()> {
    run_git(repo_path, &["commit", "--quiet", "-m", message])
}

pub fn git_checkout_new(repo_path: &Path, branch: &str) -> Result<()> {
    run_git(repo_path, &["checkout", "--quiet", "-b", branch])
}

pub fn git_checkout(repo_path: &Path, branch: &str) -> Result<()> {
    run_git(repo_path, &["checkout", "--quiet", branch])
}

/// Write, stage and commit one file
pub fn commit_file(repo_path: &Path, filename: &str, content: &str, message: &str) -> Result<()> {
    create_file(repo_path, filename, content)?;
    git_add(repo_path, filename)?;
    git_commit(repo_path, message)
}

/// A bare repository registered as `origin`
pub fn add_bare_origin(repo: &TestRepo) -> Result<PathBuf> {
    let remote = repo.temp_dir.path().join("origin.git");
    run_git(
        repo.temp_dir.path(),
        &["init", "--quiet", "--bare", "origin.git"],
    )?;
    let remote_str = remote.to_string_lossy().into_owned();
    run_git(&repo.path, &["remote", "add", "origin", &remote_str])?;
    Ok(remote)
}
