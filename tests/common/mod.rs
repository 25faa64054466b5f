#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;
use tokio::process::Command;

/// Skip tests that need a real git binary when it is not installed
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub async fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create a temporary repository on branch `main` with a configured user
pub async fn create_temp_git_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();

    git(dir, &["init", "--quiet"]).await;
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]).await;
    git(dir, &["config", "user.email", "test@example.com"]).await;
    git(dir, &["config", "user.name", "Test User"]).await;
    git(dir, &["config", "commit.gpgsign", "false"]).await;

    temp_dir
}

pub async fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    std::fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", name]).await;
    git(dir, &["commit", "--quiet", "-m", message]).await;
}

/// Repository whose `feature` branch conflicts with `main` in `conflict.txt`
pub async fn create_conflicting_repo() -> TempDir {
    let repo = create_temp_git_repo().await;
    let dir = repo.path();

    commit_file(dir, "conflict.txt", "base\n", "Base").await;
    git(dir, &["checkout", "--quiet", "-b", "feature"]).await;
    commit_file(dir, "conflict.txt", "feature side\n", "Feature change").await;
    git(dir, &["checkout", "--quiet", "main"]).await;
    commit_file(dir, "conflict.txt", "main side\n", "Main change").await;

    repo
}
