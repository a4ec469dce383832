use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use owo_colors::OwoColorize;

use fleetline_core::config::Config;
use fleetline_fixengine::{default_tracker_path, EngineConfig, FixAgentEngine, Tracker};
use fleetline_runtime::{JsonlSessionStore, ManagerConfig, SessionManager};
use fleetline_types::IssueStatus;

use crate::adapters::{GhGitHub, GitWorktreeProvider};
use crate::args::{Cli, Commands};

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.workspace_path.as_deref()).context("loading configuration")?;
    let tracker_path = default_tracker_path(&config.workspace_path);

    match cli.command {
        Commands::Scan => scan(&config, &tracker_path).await,
        Commands::Fix {
            max_parallel,
            model,
            budget,
            skip_scan,
        } => fix(&config, &tracker_path, max_parallel, model, budget, skip_scan).await,
        Commands::Merge => merge(&config, &tracker_path).await,
        Commands::Status { json, verbose } => status(&tracker_path, json, verbose),
        Commands::Dismiss { id, reason } => dismiss(&tracker_path, &id, reason),
        Commands::Reopen { id } => reopen(&tracker_path, &id),
    }
}

async fn scan(config: &Config, tracker_path: &std::path::Path) -> Result<()> {
    use fleetline_fixengine::CiScanner;

    let Some(command_parts) = &config.ci_scan_command else {
        return Err(anyhow!(
            "no ci_scan_command configured; set it in fleetline.toml or FLEETLINE_CI_SCAN_COMMAND"
        ));
    };
    let (program, args) = command_parts
        .split_first()
        .ok_or_else(|| anyhow!("ci_scan_command is empty"))?;
    let scanner = crate::adapters::CommandCiScanner {
        command: program.clone(),
        args: args.to_vec(),
    };

    let found = scanner.scan().await.map_err(|e| anyhow!(e.to_string()))?;
    let mut tracker = Tracker::load(tracker_path).context("loading tracker")?;
    let found_count = found.len();
    for group in found {
        tracker.upsert(group);
    }
    tracker.save(tracker_path).context("saving tracker")?;
    println!("scanned: {found_count} issue groups recorded");
    Ok(())
}

async fn fix(
    config: &Config,
    tracker_path: &std::path::Path,
    max_parallel: Option<usize>,
    model: Option<String>,
    budget: Option<f64>,
    skip_scan: bool,
) -> Result<()> {
    if !skip_scan {
        if config.ci_scan_command.is_some() {
            scan(config, tracker_path).await?;
        } else {
            println!("skipping scan: no ci_scan_command configured");
        }
    }

    let tracker = Tracker::load(tracker_path).context("loading tracker")?;
    let groups = tracker.issues.clone();

    let repo_root = config.workspace_path.clone();
    let worktree_dir = repo_root.join(".fleetline-worktrees");
    std::fs::create_dir_all(&worktree_dir).ok();

    let manager_config = ManagerConfig::from(config);
    let store_path = config.workspace_path.join("sessions.jsonl");
    let manager = SessionManager::new(manager_config, Arc::new(JsonlSessionStore::new(store_path)));

    let engine = FixAgentEngine::new(
        manager,
        Arc::new(GitWorktreeProvider {
            repo_root: repo_root.clone(),
            worktree_dir,
        }),
        Arc::new(GhGitHub {
            repo_root: repo_root.clone(),
        }),
        EngineConfig {
            max_parallel: max_parallel.unwrap_or(config.max_parallel),
            budget_usd: budget.unwrap_or(config.budget_usd),
            actionable_statuses: config.actionable_statuses.clone(),
            model: model.unwrap_or_else(|| config.default_model.clone()),
            worktree_base: project_name(&repo_root),
        },
    );

    let summary = engine.run(groups).await;

    let mut tracker = Tracker::load(tracker_path)?;
    for outcome in &summary.outcomes {
        let mut group = outcome.updated_group.clone();
        let next_status = if outcome.error.is_some() {
            IssueStatus::New
        } else if outcome.fix_applied {
            IssueStatus::FixPending
        } else {
            IssueStatus::New
        };
        if let Ok(s) = group.status.transition(next_status) {
            group.status = s;
        }
        tracker.upsert(group);
        match &outcome.error {
            Some(err) => println!("{} {}: {err}", "failed".red(), outcome.key),
            None if outcome.fix_applied => {
                println!(
                    "{} {}: {}",
                    "fixed".green(),
                    outcome.key,
                    outcome.pr_url.as_deref().unwrap_or("(no PR)")
                );
            }
            None => println!("{} {}: no fix applied", "skipped".yellow(), outcome.key),
        }
    }
    tracker.save(tracker_path)?;

    println!("total cost: ${:.2}", summary.total_cost_usd);
    Ok(())
}

async fn merge(config: &Config, tracker_path: &std::path::Path) -> Result<()> {
    use tokio::process::Command;

    let mut tracker = Tracker::load(tracker_path).context("loading tracker")?;
    let mut merged = 0;
    for group in tracker.issues.iter_mut() {
        if group.status != IssueStatus::FixApproved {
            continue;
        }
        let Some(attempt) = group.attempts.last() else {
            continue;
        };
        let output = Command::new("gh")
            .arg("-C")
            .arg(&config.workspace_path)
            .args(["pr", "merge", &attempt.branch, "--merge"])
            .output()
            .await;
        match output {
            Ok(o) if o.status.success() => {
                if let Ok(s) = group.status.transition(IssueStatus::FixMerged) {
                    group.status = s;
                    merged += 1;
                }
            }
            Ok(o) => {
                println!(
                    "{} {}: {}",
                    "merge failed".red(),
                    group.key,
                    String::from_utf8_lossy(&o.stderr).trim()
                );
            }
            Err(err) => println!("{} {}: {err}", "merge failed".red(), group.key),
        }
    }
    tracker.save(tracker_path)?;
    println!("merged {merged} pull requests");
    Ok(())
}

fn status(tracker_path: &std::path::Path, json: bool, verbose: bool) -> Result<()> {
    let tracker = Tracker::load(tracker_path).context("loading tracker")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tracker)?);
        return Ok(());
    }

    println!(
        "{:<32} {:<14} {:<8} {}",
        "KEY".bold(),
        "STATUS".bold(),
        "ATTEMPTS".bold(),
        "LAST PR"
    );
    for group in &tracker.issues {
        let last_pr = group
            .attempts
            .last()
            .and_then(|a| a.pr_url.as_deref())
            .unwrap_or("-");
        println!(
            "{:<32} {:<14} {:<8} {}",
            group.key,
            format!("{:?}", group.status),
            group.attempts.len(),
            last_pr
        );
        if verbose {
            for attempt in &group.attempts {
                println!(
                    "    #{:<3} branch={:<40} fix_applied={:<5} cost=${:.2}",
                    attempt.attempt_number, attempt.branch, attempt.fix_applied, attempt.cost_usd
                );
            }
        }
    }
    Ok(())
}

fn dismiss(tracker_path: &std::path::Path, id: &str, reason: Option<String>) -> Result<()> {
    let mut tracker = Tracker::load(tracker_path).context("loading tracker")?;
    let group = tracker
        .find_mut(id)
        .ok_or_else(|| anyhow!("no issue group with key {id}"))?;
    group.status = group
        .status
        .transition(IssueStatus::WontFix)
        .map_err(|e| anyhow!(e.to_string()))?;
    tracker.save(tracker_path)?;
    match reason {
        Some(reason) => println!("dismissed {id}: {reason}"),
        None => println!("dismissed {id}"),
    }
    Ok(())
}

fn reopen(tracker_path: &std::path::Path, id: &str) -> Result<()> {
    let mut tracker = Tracker::load(tracker_path).context("loading tracker")?;
    let group = tracker
        .find_mut(id)
        .ok_or_else(|| anyhow!("no issue group with key {id}"))?;
    group.status = group
        .status
        .transition(IssueStatus::New)
        .map_err(|e| anyhow!(e.to_string()))?;
    tracker.save(tracker_path)?;
    println!("reopened {id}");
    Ok(())
}

fn project_name(repo_root: &PathBuf) -> String {
    repo_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fleetline".to_string())
}
