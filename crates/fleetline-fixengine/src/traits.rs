use async_trait::async_trait;

use crate::error::Result;

/// Git/worktree operations are an external collaborator: only the
/// interface is specified here, the real adapter shells out to `git`.
#[async_trait]
pub trait WorktreeProvider: Send + Sync {
    /// One sequential fetch of `origin` before any parallel work, because
    /// concurrent fetches on one bare repo race.
    async fn fetch_origin(&self) -> Result<()>;

    /// Creates an isolated worktree checked out to a fresh branch, returning
    /// its filesystem path.
    async fn create(&self, branch: &str) -> Result<String>;

    /// Best-effort teardown; failures here are not escalated to the group's
    /// outcome; a failed teardown only gets logged.
    async fn remove(&self, path: &str);
}

/// GitHub PR creation is an external collaborator; only its interface is
/// specified here.
#[async_trait]
pub trait GitHub: Send + Sync {
    async fn create_pr(&self, branch: &str, title: &str, body: &str) -> Result<String>;
}

/// CI-failure scanning that populates the tracker is an external
/// collaborator; only its interface is specified here.
#[async_trait]
pub trait CiScanner: Send + Sync {
    async fn scan(&self) -> Result<Vec<fleetline_types::IssueGroup>>;
}

/// Fakes used by the engine's own tests, so the bounded-pool, retry, cost
/// and lifecycle logic is fully exercised without a real git/GitHub
/// dependency (mirrors `fleetline_providers::Dialect`'s no-IO split).
pub mod fakes {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeWorktreeProvider {
        pub fetch_calls: AtomicUsize,
        pub created: Mutex<Vec<String>>,
        pub removed: Mutex<Vec<String>>,
        pub fail_fetch: bool,
    }

    #[async_trait]
    impl WorktreeProvider for FakeWorktreeProvider {
        async fn fetch_origin(&self) -> Result<()> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch {
                return Err(crate::error::Error::FetchOrigin("fake failure".to_string()));
            }
            Ok(())
        }

        async fn create(&self, branch: &str) -> Result<String> {
            let path = format!("/tmp/worktrees/{branch}");
            self.created.lock().unwrap().push(path.clone());
            Ok(path)
        }

        async fn remove(&self, path: &str) {
            self.removed.lock().unwrap().push(path.to_string());
        }
    }

    #[derive(Default)]
    pub struct FakeGitHub {
        pub created: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl GitHub for FakeGitHub {
        async fn create_pr(&self, branch: &str, title: &str, _body: &str) -> Result<String> {
            self.created
                .lock()
                .unwrap()
                .push((branch.to_string(), title.to_string()));
            Ok(format!("https://github.com/example/repo/pull/{branch}"))
        }
    }
}
