use std::path::PathBuf;

use async_trait::async_trait;
use fleetline_fixengine::{CiScanner, Error, GitHub, Result, WorktreeProvider};
use fleetline_types::IssueGroup;
use tokio::process::Command;

/// Shells out to the system `git` binary for worktree lifecycle, mirroring
/// the project-hash helper's subprocess style.
pub struct GitWorktreeProvider {
    pub repo_root: PathBuf,
    pub worktree_dir: PathBuf,
}

async fn run(cmd: &mut Command) -> std::result::Result<String, String> {
    let output = cmd.output().await.map_err(|e| e.to_string())?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[async_trait]
impl WorktreeProvider for GitWorktreeProvider {
    async fn fetch_origin(&self) -> Result<()> {
        run(Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(["fetch", "origin"]))
        .await
        .map(|_| ())
        .map_err(Error::FetchOrigin)
    }

    async fn create(&self, branch: &str) -> Result<String> {
        let path = self.worktree_dir.join(branch.replace('/', "-"));
        run(Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(["worktree", "add"])
            .arg(&path)
            .args(["-b", branch]))
        .await
        .map_err(Error::Worktree)?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn remove(&self, path: &str) {
        if let Err(err) = run(Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(["worktree", "remove", path, "--force"]))
        .await
        {
            tracing::warn!(path, error = %err, "failed to remove worktree");
        }
    }
}

/// Shells out to the `gh` CLI for PR creation rather than talking to a
/// hosted forge through a bespoke HTTP client.
pub struct GhGitHub {
    pub repo_root: PathBuf,
}

#[async_trait]
impl GitHub for GhGitHub {
    async fn create_pr(&self, branch: &str, title: &str, body: &str) -> Result<String> {
        run(Command::new("gh")
            .arg("-C")
            .arg(&self.repo_root)
            .args(["pr", "create", "--head", branch, "--title", title, "--body", body]))
        .await
        .map_err(Error::GitHub)
    }
}

/// Runs a configured shell command and parses its stdout as a JSON array of
/// [`IssueGroup`]s. The concrete CI integration (GitHub Actions, CircleCI,
/// ...) lives behind that command, not in this crate.
pub struct CommandCiScanner {
    pub command: String,
    pub args: Vec<String>,
}

#[async_trait]
impl CiScanner for CommandCiScanner {
    async fn scan(&self) -> Result<Vec<IssueGroup>> {
        let stdout = run(Command::new(&self.command).args(&self.args))
            .await
            .map_err(Error::Scan)?;
        serde_json::from_str(&stdout).map_err(Error::from)
    }
}
