use crate::error::{Error, Result};
use crate::path::resolve_workspace_path;
use fleetline_types::dialect::AgentDialect;
use fleetline_types::issue::IssueStatus;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Layered runtime configuration: CLI flags > environment variables > config
/// file (`fleetline.toml` under the workspace path) > these defaults.
///
/// Mirrors `resolve_workspace_path`'s cascade for the single config-file
/// lookup itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace_path: PathBuf,
    pub agent_binaries: HashMap<String, String>,
    pub default_model: String,
    pub max_parallel: usize,
    pub budget_usd: f64,
    pub output_buffer_capacity: usize,
    pub stop_timeline: StopTimeline,
    pub fallback_grace: Duration,
    /// How long an outbound request to the agent may sit unanswered before
    /// the Correlator evicts it with `CorrelationTimeout`.
    pub correlation_timeout: Duration,
    pub actionable_statuses: Vec<IssueStatus>,
    /// Shell command (program + args) the `scan` command runs to populate
    /// the tracker; `None` until configured via `fleetline.toml` or env.
    pub ci_scan_command: Option<Vec<String>>,
}

/// The Process Supervisor's fixed two-phase stop timeline, kept
/// configurable for tests that want to shrink the waits.
#[derive(Debug, Clone, Copy)]
pub struct StopTimeline {
    pub stdin_close_wait: Duration,
    pub interrupt_wait: Duration,
    pub kill_wait: Duration,
}

impl Default for StopTimeline {
    fn default() -> Self {
        Self {
            stdin_close_wait: Duration::from_millis(500),
            interrupt_wait: Duration::from_millis(500),
            kill_wait: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    agent_binaries: Option<HashMap<String, String>>,
    default_model: Option<String>,
    max_parallel: Option<usize>,
    budget_usd: Option<f64>,
    output_buffer_capacity: Option<usize>,
    fallback_grace_ms: Option<u64>,
    correlation_timeout_ms: Option<u64>,
    actionable_statuses: Option<Vec<IssueStatus>>,
    ci_scan_command: Option<Vec<String>>,
}

impl Config {
    /// Build a `Config`, resolving the workspace path with `explicit_path`
    /// and overlaying `fleetline.toml` (if present) and env vars on defaults.
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        let workspace_path = resolve_workspace_path(explicit_path)?;
        let mut config = Self::defaults(workspace_path.clone());

        let config_file = workspace_path.join("fleetline.toml");
        if config_file.exists() {
            let raw = std::fs::read_to_string(&config_file)?;
            let file: FileConfig = toml::from_str(&raw)?;
            config.apply_file(file);
        }

        config.apply_env();
        Ok(config)
    }

    fn defaults(workspace_path: PathBuf) -> Self {
        let mut agent_binaries = HashMap::new();
        agent_binaries.insert(AgentDialect::ClaudeCode.id().to_string(), "claude".to_string());
        agent_binaries.insert(AgentDialect::Codex.id().to_string(), "codex".to_string());
        agent_binaries.insert(AgentDialect::Gemini.id().to_string(), "gemini".to_string());
        agent_binaries.insert(AgentDialect::Cursor.id().to_string(), "cursor-agent".to_string());

        Self {
            workspace_path,
            agent_binaries,
            default_model: "claude-sonnet-4-5".to_string(),
            max_parallel: 4,
            budget_usd: 10.0,
            output_buffer_capacity: fleetline_types::output::OUTPUT_BUFFER_CAPACITY,
            stop_timeline: StopTimeline::default(),
            fallback_grace: Duration::from_millis(150),
            correlation_timeout: Duration::from_secs(30),
            actionable_statuses: vec![IssueStatus::New, IssueStatus::Recurred],
            ci_scan_command: None,
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(binaries) = file.agent_binaries {
            self.agent_binaries.extend(binaries);
        }
        if let Some(model) = file.default_model {
            self.default_model = model;
        }
        if let Some(n) = file.max_parallel {
            self.max_parallel = n;
        }
        if let Some(b) = file.budget_usd {
            self.budget_usd = b;
        }
        if let Some(cap) = file.output_buffer_capacity {
            self.output_buffer_capacity = cap;
        }
        if let Some(ms) = file.fallback_grace_ms {
            self.fallback_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = file.correlation_timeout_ms {
            self.correlation_timeout = Duration::from_millis(ms);
        }
        if let Some(statuses) = file.actionable_statuses {
            self.actionable_statuses = statuses;
        }
        if let Some(cmd) = file.ci_scan_command {
            self.ci_scan_command = Some(cmd);
        }
    }

    fn apply_env(&mut self) {
        if let Ok(model) = std::env::var("FLEETLINE_MODEL") {
            self.default_model = model;
        }
        if let Ok(n) = std::env::var("FLEETLINE_MAX_PARALLEL") {
            if let Ok(n) = n.parse() {
                self.max_parallel = n;
            }
        }
        if let Ok(b) = std::env::var("FLEETLINE_BUDGET_USD") {
            if let Ok(b) = b.parse() {
                self.budget_usd = b;
            }
        }
    }

    pub fn agent_binary(&self, dialect: AgentDialect) -> Result<&str> {
        self.agent_binaries
            .get(dialect.id())
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("no binary configured for agent {dialect}")))
    }
}
