use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Resolve the runtime's data/workspace directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. `FLEETLINE_HOME` environment variable (with tilde expansion)
/// 3. System data directory (recommended default)
/// 4. `~/.fleetline` (fallback for systems without a standard data directory)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("FLEETLINE_HOME") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("fleetline"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".fleetline"));
    }

    Err(Error::Config(
        "could not determine workspace path: no HOME directory or system data directory found"
            .to_string(),
    ))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Hash a worktree/repository root to a stable identifier, used to key
/// per-worktree session groups (`GetSessionsForWorktree`) and tracker
/// entries. Canonicalizes first so symlinked paths hash identically.
///
/// If `project_root` is inside a git worktree, hashes the shared
/// `git-common-dir` instead of the working-copy path, so every worktree of
/// the same repository shares one identifier.
pub fn project_hash_from_root(project_root: &str) -> String {
    let path = Path::new(project_root);

    let hash_target = detect_git_common_dir(path).unwrap_or_else(|| normalize_path(path));

    let mut hasher = Sha256::new();
    hasher.update(hash_target.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Detect the git common directory for worktree support. Returns `Some` only
/// when this directory is a linked worktree (git-dir != git-common-dir).
fn detect_git_common_dir(path: &Path) -> Option<PathBuf> {
    use std::process::Command;

    let git_dir = Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .current_dir(path)
        .output()
        .ok()?;
    let git_common_dir = Command::new("git")
        .args(["rev-parse", "--git-common-dir"])
        .current_dir(path)
        .output()
        .ok()?;

    if !git_dir.status.success() || !git_common_dir.status.success() {
        return None;
    }

    let git_dir_normalized = normalize_path(Path::new(
        String::from_utf8_lossy(&git_dir.stdout).trim(),
    ));
    let git_common_dir_normalized = normalize_path(Path::new(
        String::from_utf8_lossy(&git_common_dir.stdout).trim(),
    ));

    if git_dir_normalized != git_common_dir_normalized {
        Some(git_common_dir_normalized)
    } else {
        None
    }
}

/// Normalize a path for comparison (resolve to absolute, canonicalize if possible).
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

pub fn paths_equal(path1: &Path, path2: &Path) -> bool {
    normalize_path(path1) == normalize_path(path2)
}

/// Discover the project/repository root based on priority:
/// 1. `explicit_project_root`
/// 2. `FLEETLINE_PROJECT_ROOT` environment variable
/// 3. Current working directory
pub fn discover_project_root(explicit_project_root: Option<&str>) -> Result<PathBuf> {
    if let Some(root) = explicit_project_root {
        return Ok(PathBuf::from(root));
    }

    if let Ok(env_root) = std::env::var("FLEETLINE_PROJECT_ROOT") {
        return Ok(PathBuf::from(env_root));
    }

    Ok(std::env::current_dir()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_non_git_directory() {
        let hash = project_hash_from_root("/tmp");
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn worktrees_of_one_repo_share_a_hash() {
        use std::fs;
        use std::process::Command;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let bare_repo = temp_dir.path().join("repo.git");
        let wt1 = temp_dir.path().join("wt1");
        let wt2 = temp_dir.path().join("wt2");

        let init = Command::new("git")
            .args(["init", "--bare"])
            .arg(&bare_repo)
            .output()
            .unwrap();
        if !init.status.success() {
            return;
        }

        let temp_clone = temp_dir.path().join("temp_clone");
        let clone = Command::new("git")
            .args(["clone"])
            .arg(&bare_repo)
            .arg(&temp_clone)
            .output()
            .unwrap();
        if !clone.status.success() {
            return;
        }

        fs::write(temp_clone.join("README.md"), "# Test").unwrap();
        Command::new("git")
            .args(["add", "."])
            .current_dir(&temp_clone)
            .output()
            .unwrap();
        Command::new("git")
            .args(["commit", "-m", "Initial commit"])
            .current_dir(&temp_clone)
            .output()
            .unwrap();
        Command::new("git")
            .args(["push", "origin", "HEAD"])
            .current_dir(&temp_clone)
            .output()
            .ok();

        let branch_output = Command::new("git")
            .args(["branch", "--show-current"])
            .current_dir(&temp_clone)
            .output()
            .unwrap();
        let branch = String::from_utf8_lossy(&branch_output.stdout)
            .trim()
            .to_string();
        if branch.is_empty() {
            return;
        }

        let wt1_result = Command::new("git")
            .args(["worktree", "add"])
            .arg(&wt1)
            .arg(&branch)
            .current_dir(&bare_repo)
            .output()
            .unwrap();
        if !wt1_result.status.success() {
            return;
        }

        let wt2_result = Command::new("git")
            .args(["worktree", "add", "-b", "feature"])
            .arg(&wt2)
            .arg(&branch)
            .current_dir(&bare_repo)
            .output()
            .unwrap();
        if !wt2_result.status.success() {
            return;
        }

        let hash1 = project_hash_from_root(wt1.to_str().unwrap());
        let hash2 = project_hash_from_root(wt2.to_str().unwrap());
        assert_eq!(hash1, hash2);
    }
}
