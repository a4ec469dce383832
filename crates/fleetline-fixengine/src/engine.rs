use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use fleetline_runtime::SessionManager;
use fleetline_types::{FixAttempt, IssueGroup, IssueStatus, SessionType, TurnUsage};

use crate::analysis::parse_trailing_analysis;
use crate::error::{Error, Result};
use crate::traits::{CiScanner, GitHub, WorktreeProvider};

/// Parameters the Engine needs beyond the `SessionManager` it drives.
pub struct EngineConfig {
    pub max_parallel: usize,
    pub budget_usd: f64,
    pub actionable_statuses: Vec<IssueStatus>,
    pub model: String,
    pub worktree_base: String,
}

/// The outcome of running one `IssueGroup` through a single Session.
/// `updated_group` carries the group with its new `FixAttempt` appended
/// (unchanged from the input if no attempt was recorded), so callers can
/// persist it back to their tracker without reconstructing it themselves.
#[derive(Debug, Clone)]
pub struct GroupOutcome {
    pub key: String,
    pub fix_applied: bool,
    pub pr_url: Option<String>,
    pub cost_usd: f64,
    pub error: Option<String>,
    pub updated_group: IssueGroup,
}

/// Everything produced by one `run` across every group.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<GroupOutcome>,
    pub total_cost_usd: f64,
}

/// Bounded-parallel worker pool over CI-remediation tasks.
pub struct FixAgentEngine {
    manager: Arc<SessionManager>,
    worktrees: Arc<dyn WorktreeProvider>,
    github: Arc<dyn GitHub>,
    config: EngineConfig,
}

impl FixAgentEngine {
    pub fn new(
        manager: Arc<SessionManager>,
        worktrees: Arc<dyn WorktreeProvider>,
        github: Arc<dyn GitHub>,
        config: EngineConfig,
    ) -> Self {
        Self {
            manager,
            worktrees,
            github,
            config,
        }
    }

    /// Runs every actionable group in `groups`, honoring `max_parallel` and
    /// the shared spend budget. A single sequential `FetchOrigin` runs
    /// before any parallel work; its failure marks every group failed and
    /// returns immediately.
    pub async fn run(&self, groups: Vec<IssueGroup>) -> RunSummary {
        if let Err(err) = self.worktrees.fetch_origin().await {
            tracing::error!(error = %err, "fetch_origin failed, failing all groups");
            return RunSummary {
                outcomes: groups
                    .iter()
                    .map(|g| GroupOutcome {
                        key: g.key.clone(),
                        fix_applied: false,
                        pr_url: None,
                        cost_usd: 0.0,
                        error: Some(err.to_string()),
                        updated_group: g.clone(),
                    })
                    .collect(),
                total_cost_usd: 0.0,
            };
        }

        let actionable: Vec<IssueGroup> = groups
            .into_iter()
            .filter(|g| g.status.is_actionable(&self.config.actionable_statuses))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel.max(1)));
        let mut handles = Vec::with_capacity(actionable.len());

        for group in actionable {
            let semaphore = Arc::clone(&semaphore);
            let manager = Arc::clone(&self.manager);
            let worktrees = Arc::clone(&self.worktrees);
            let github = Arc::clone(&self.github);
            let model = self.config.model.clone();
            let worktree_base = self.config.worktree_base.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                run_one_group(manager, worktrees, github, group, &model, &worktree_base).await
            }));
        }

        let mut summary = RunSummary::default();
        for handle in handles {
            match handle.await {
                Ok(outcome) => {
                    summary.total_cost_usd += outcome.cost_usd;
                    summary.outcomes.push(outcome);
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "fix-agent worker task panicked");
                }
            }
        }

        if summary.total_cost_usd > self.config.budget_usd {
            tracing::warn!(
                spent = summary.total_cost_usd,
                budget = self.config.budget_usd,
                "budget exceeded across this run"
            );
        }

        summary
    }
}

/// Per-group flow: create worktree -> run Session with the group's prompt
/// -> parse the trailing `<ANALYSIS>` block -> create a PR if a fix was
/// applied -> the caller updates the tracker.
async fn run_one_group(
    manager: Arc<SessionManager>,
    worktrees: Arc<dyn WorktreeProvider>,
    github: Arc<dyn GitHub>,
    mut group: IssueGroup,
    model: &str,
    worktree_base: &str,
) -> GroupOutcome {
    let branch = group.branch_name();
    let worktree_path = match worktrees.create(&branch).await {
        Ok(path) => path,
        Err(err) => {
            return GroupOutcome {
                key: group.key.clone(),
                fix_applied: false,
                pr_url: None,
                cost_usd: 0.0,
                error: Some(err.to_string()),
                updated_group: group,
            }
        }
    };

    let result = drive_session(&manager, &group, &worktree_path, model, worktree_base).await;
    worktrees.remove(&worktree_path).await;

    let (text, usage) = match result {
        Ok(pair) => pair,
        Err(err) => {
            return GroupOutcome {
                key: group.key.clone(),
                fix_applied: false,
                pr_url: None,
                cost_usd: 0.0,
                error: Some(err.to_string()),
                updated_group: group,
            }
        }
    };

    let cost_per_issue = if group.issue_ids.is_empty() {
        0.0
    } else {
        usage.cost_usd / group.issue_ids.len() as f64
    };

    let analysis = parse_trailing_analysis(&text).unwrap_or_default();

    let mut pr_url = None;
    if analysis.fix_applied {
        match github
            .create_pr(&branch, &format!("fix: {}", group.key), analysis.summary.as_deref().unwrap_or(""))
            .await
        {
            Ok(url) => pr_url = Some(url),
            Err(err) => {
                tracing::warn!(key = %group.key, error = %err, "PR creation failed");
            }
        }
    }

    let attempt_number = group.next_attempt_number();
    group.attempts.push(FixAttempt {
        attempt_number,
        branch: branch.clone(),
        fix_applied: analysis.fix_applied,
        pr_url: pr_url.clone(),
        cost_usd: cost_per_issue,
        summary: analysis.summary.clone(),
    });

    GroupOutcome {
        key: group.key.clone(),
        fix_applied: analysis.fix_applied,
        pr_url,
        cost_usd: usage.cost_usd,
        error: None,
        updated_group: group,
    }
}

async fn drive_session(
    manager: &Arc<SessionManager>,
    group: &IssueGroup,
    worktree_path: &str,
    model: &str,
    worktree_base: &str,
) -> Result<(String, TurnUsage)> {
    let prompt = fix_prompt(group);
    let id = manager
        .start_session(
            SessionType::Builder,
            worktree_path,
            prompt,
            fleetline_types::AgentDialect::ClaudeCode,
            model,
            worktree_base,
        )
        .await?;

    wait_for_completion(manager, &id).await?;

    let output = manager.get_session_output(&id).await;
    let text: String = output
        .iter()
        .filter(|l| l.kind == fleetline_types::OutputLineKind::Text)
        .map(|l| l.content.as_str())
        .collect();
    let record = manager
        .get_session_info(&id)
        .await
        .ok_or_else(|| Error::Session(fleetline_runtime::Error::Handler(format!("session {id} vanished"))))?;

    manager.complete_session(&id).await.ok();
    manager.delete_session(&id).await.ok();

    Ok((text, record.progress))
}

/// Polls session status until terminal; bounded so a hung agent can't wedge
/// a worker slot forever.
async fn wait_for_completion(manager: &Arc<SessionManager>, id: &str) -> Result<()> {
    const POLL_INTERVAL: Duration = Duration::from_millis(50);
    const MAX_POLLS: u32 = 72_000; // 1 hour at 50ms

    for _ in 0..MAX_POLLS {
        if let Some(record) = manager.get_session_info(id).await {
            if record.status.is_terminal() || record.status == fleetline_types::SessionStatus::Idle {
                return Ok(());
            }
        } else {
            return Err(Error::Session(fleetline_runtime::Error::Handler(format!(
                "session {id} vanished while waiting"
            ))));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Err(Error::TimeExceeded)
}

fn fix_prompt(group: &IssueGroup) -> String {
    format!(
        "Investigate and, if possible, fix the following CI issue group ({}): {}.\n\
         End your response with a trailing <ANALYSIS>...</ANALYSIS> block summarising \
         root cause, options considered, and whether a fix was applied.",
        group.category,
        group.issue_ids.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::fakes::{FakeGitHub, FakeWorktreeProvider};
    use fleetline_runtime::{JsonlSessionStore, ManagerConfig};
    use std::collections::HashMap;

    fn test_manager() -> Arc<SessionManager> {
        let config = ManagerConfig {
            agent_binaries: HashMap::from([("claude".to_string(), "true".to_string())]),
            output_buffer_capacity: 1000,
            stop_timeline: fleetline_core::config::StopTimeline {
                stdin_close_wait: Duration::from_millis(10),
                interrupt_wait: Duration::from_millis(10),
                kill_wait: Duration::from_millis(10),
            },
            fallback_grace: Duration::from_millis(10),
            correlation_timeout: Duration::from_secs(30),
            permission_handler: Arc::new(fleetline_runtime::DenyAllPermissions),
            mcp_handler: Arc::new(fleetline_runtime::McpRegistry::new()),
        };
        SessionManager::new(config, Arc::new(JsonlSessionStore::new("/tmp/fleetline-fixengine-test.jsonl")))
    }

    fn sample_group() -> IssueGroup {
        IssueGroup {
            key: "ts:TS7006:src/".to_string(),
            category: "ts".to_string(),
            issue_ids: vec!["i1".to_string(), "i2".to_string()],
            status: IssueStatus::New,
            attempts: vec![],
        }
    }

    #[tokio::test]
    async fn fetch_origin_failure_fails_every_group() {
        let engine = FixAgentEngine::new(
            test_manager(),
            Arc::new(FakeWorktreeProvider {
                fail_fetch: true,
                ..Default::default()
            }),
            Arc::new(FakeGitHub::default()),
            EngineConfig {
                max_parallel: 2,
                budget_usd: 10.0,
                actionable_statuses: vec![IssueStatus::New],
                model: "test-model".to_string(),
                worktree_base: "repo".to_string(),
            },
        );
        let summary = engine.run(vec![sample_group()]).await;
        assert_eq!(summary.outcomes.len(), 1);
        assert!(summary.outcomes[0].error.is_some());
    }

    #[tokio::test]
    async fn non_actionable_groups_are_skipped() {
        let engine = FixAgentEngine::new(
            test_manager(),
            Arc::new(FakeWorktreeProvider::default()),
            Arc::new(FakeGitHub::default()),
            EngineConfig {
                max_parallel: 2,
                budget_usd: 10.0,
                actionable_statuses: vec![IssueStatus::New],
                model: "test-model".to_string(),
                worktree_base: "repo".to_string(),
            },
        );
        let mut group = sample_group();
        group.status = IssueStatus::WontFix;
        let summary = engine.run(vec![group]).await;
        assert!(summary.outcomes.is_empty());
    }

    #[test]
    fn cost_split_is_even_across_issues() {
        let group = sample_group();
        let total_cost = 0.10;
        let per_issue = total_cost / group.issue_ids.len() as f64;
        assert_eq!(per_issue, 0.05);
    }

    #[test]
    fn branch_naming_is_idempotent_by_attempt_number() {
        let mut group = sample_group();
        assert_eq!(group.branch_name(), "fix/ts/ts-TS7006-src-v1");
        group.attempts.push(FixAttempt {
            attempt_number: 1,
            branch: group.branch_name(),
            fix_applied: false,
            pr_url: None,
            cost_usd: 0.0,
            summary: None,
        });
        assert_eq!(group.branch_name(), "fix/ts/ts-TS7006-src-v2");
    }
}
