use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};

use fleetline_providers::traits::dialect_by_name;
use fleetline_types::{
    push_line, AgentDialect, OutputLine, OutputLineKind, Session as SessionRecord, SessionStatus,
    SessionType,
};

use crate::correlator::{DenyAllPermissions, McpHandler, McpRegistry, ToolPermissionHandler};
use crate::error::{Error, Result};
use crate::session::{Session, SessionConfig};

const FOLLOWUP_CAPACITY: usize = 1;
const MANAGER_EVENT_CAPACITY: usize = 10_000;

/// What the Manager broadcasts on its process-wide event channel: status
/// transitions and output-buffer appends, interleaved across every
/// session it owns.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    StatusChanged {
        session_id: String,
        status: SessionStatus,
    },
    Output {
        session_id: String,
        line: OutputLine,
    },
}

/// Durable sink for terminal session records, consulted by `DeleteSession`
/// so a session's final status is never only held in memory — the
/// Manager always persists terminal status before removing live state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_final(&self, record: &SessionRecord) -> Result<()>;
}

/// Default store: one JSON line per terminal session, appended under the
/// resolved workspace path.
pub struct JsonlSessionStore {
    path: std::path::PathBuf,
}

impl JsonlSessionStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for JsonlSessionStore {
    async fn save_final(&self, record: &SessionRecord) -> Result<()> {
        use tokio::io::AsyncWriteExt;
        let line = serde_json::to_string(record).map_err(fleetline_providers::error::Error::from)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

struct ManagedSession {
    session: Arc<Session>,
    record: SessionRecord,
}

/// Parameters shared by every session the Manager spawns: agent binaries,
/// output-buffer sizing, stop timeline and the shared permission/MCP
/// handlers, all sourced from `fleetline_core::Config`.
pub struct ManagerConfig {
    pub agent_binaries: HashMap<String, String>,
    pub output_buffer_capacity: usize,
    pub stop_timeline: fleetline_core::config::StopTimeline,
    pub fallback_grace: std::time::Duration,
    pub correlation_timeout: std::time::Duration,
    pub permission_handler: Arc<dyn ToolPermissionHandler>,
    pub mcp_handler: Arc<dyn McpHandler>,
}

impl From<&fleetline_core::config::Config> for ManagerConfig {
    fn from(config: &fleetline_core::config::Config) -> Self {
        Self {
            agent_binaries: config.agent_binaries.clone(),
            output_buffer_capacity: config.output_buffer_capacity,
            stop_timeline: config.stop_timeline,
            fallback_grace: config.fallback_grace,
            correlation_timeout: config.correlation_timeout,
            permission_handler: Arc::new(DenyAllPermissions),
            mcp_handler: Arc::new(McpRegistry::new()),
        }
    }
}

/// Owns every live Session plus its output buffer and follow-up channel.
/// Lock ordering is `sessions > outputs > follow_ups`; every method below
/// acquires locks in that order or not at all.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, ManagedSession>>,
    outputs: Mutex<HashMap<String, std::collections::VecDeque<OutputLine>>>,
    follow_ups: RwLock<HashMap<String, mpsc::Sender<String>>>,
    events: broadcast::Sender<ManagerEvent>,
    store: Arc<dyn SessionStore>,
    config: ManagerConfig,
}

impl SessionManager {
    pub fn new(config: ManagerConfig, store: Arc<dyn SessionStore>) -> Arc<Self> {
        let (events, _) = broadcast::channel(MANAGER_EVENT_CAPACITY);
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            outputs: Mutex::new(HashMap::new()),
            follow_ups: RwLock::new(HashMap::new()),
            events,
            store,
            config,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ManagerEvent) {
        let _ = self.events.send(event);
    }

    /// Registers a new Session, launches its stdout reader via `Session::start`,
    /// spawns the turn-runner task that drives the initial prompt and any
    /// follow-ups, and returns the generated id immediately — the caller never
    /// waits on the first turn.
    pub async fn start_session(
        self: &Arc<Self>,
        session_type: SessionType,
        work_dir: impl Into<String>,
        prompt: impl Into<String>,
        dialect: AgentDialect,
        model: impl Into<String>,
        worktree_base: &str,
    ) -> Result<String> {
        let work_dir = work_dir.into();
        let prompt = prompt.into();
        let model = model.into();
        let id = format!(
            "{worktree_base}-{}-{}",
            session_type.as_str(),
            short_id()
        );

        let binary = self
            .config
            .agent_binaries
            .get(dialect.id())
            .cloned()
            .ok_or_else(|| Error::UnknownDialect(dialect.id().to_string()))?;

        let mut session_config = SessionConfig::new(dialect, binary, work_dir.clone(), model.clone(), session_type);
        session_config.stop_timeline = self.config.stop_timeline;
        session_config.fallback_grace = self.config.fallback_grace;
        session_config.correlation_timeout = self.config.correlation_timeout;
        session_config.permission_handler = Arc::clone(&self.config.permission_handler);
        session_config.mcp_handler = Arc::clone(&self.config.mcp_handler);

        let dialect_impl: Arc<dyn fleetline_providers::traits::Dialect> = dialect_by_name(dialect.id())
            .ok_or_else(|| Error::UnknownDialect(dialect.id().to_string()))?
            .into();
        let session = Session::new(id.clone(), dialect_impl, session_config);

        let record = SessionRecord::new(id.clone(), session_type, prompt.clone(), model, work_dir);

        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                id.clone(),
                ManagedSession {
                    session: Arc::clone(&session),
                    record,
                },
            );
        }
        {
            let mut outputs = self.outputs.lock().await;
            outputs.insert(id.clone(), std::collections::VecDeque::new());
        }

        let (follow_tx, follow_rx) = mpsc::channel(FOLLOWUP_CAPACITY);
        self.follow_ups.write().await.insert(id.clone(), follow_tx);

        if let Err(err) = session.start().await {
            self.sessions.write().await.remove(&id);
            self.outputs.lock().await.remove(&id);
            self.follow_ups.write().await.remove(&id);
            return Err(err);
        }

        self.spawn_status_bridge(Arc::clone(&session));
        self.spawn_output_bridge(Arc::clone(&session), id.clone());
        self.spawn_turn_runner(Arc::clone(&session), prompt, follow_rx);

        Ok(id)
    }

    /// Mirrors every status transition into the manager-wide event channel and
    /// into the stored `SessionRecord` (so `GetSessionInfo` reflects it without
    /// a round trip through the Session itself).
    fn spawn_status_bridge(self: &Arc<Self>, session: Arc<Session>) {
        let this = Arc::clone(self);
        let mut watch = session.watch_status();
        tokio::spawn(async move {
            loop {
                let status = *watch.borrow();
                {
                    let mut sessions = this.sessions.write().await;
                    if let Some(managed) = sessions.get_mut(&session.id) {
                        managed.record.status = status;
                        if status == SessionStatus::Running && managed.record.started_at.is_none() {
                            managed.record.started_at = Some(Utc::now());
                        }
                        if status.is_terminal() {
                            managed.record.completed_at = Some(Utc::now());
                        }
                    }
                }
                this.emit(ManagerEvent::StatusChanged {
                    session_id: session.id.clone(),
                    status,
                });
                if status.is_terminal() || watch.changed().await.is_err() {
                    break;
                }
            }
        });
    }

    /// Drains the Session's event stream into the bounded, coalescing output
    /// buffer and the manager-wide event channel.
    fn spawn_output_bridge(self: &Arc<Self>, session: Arc<Session>, session_id: String) {
        let this = Arc::clone(self);
        let mut events = session.events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let line = to_output_line(&event);
                        {
                            let mut outputs = this.outputs.lock().await;
                            if let Some(buffer) = outputs.get_mut(&session_id) {
                                push_line(buffer, line.clone());
                            }
                        }
                        this.emit(ManagerEvent::Output {
                            session_id: session_id.clone(),
                            line,
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(session_id = %session_id, skipped, "output bridge dropped events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// The session's turn-runner: runs the initial prompt, then loops on the
    /// follow-up channel until it's closed (`idle -> completed`) or the
    /// session reaches a terminal state some other way.
    fn spawn_turn_runner(
        self: &Arc<Self>,
        session: Arc<Session>,
        prompt: String,
        mut follow_rx: mpsc::Receiver<String>,
    ) {
        tokio::spawn(async move {
            if session.send_message(&prompt).await.is_err() {
                return;
            }
            loop {
                if session.status().is_terminal() {
                    return;
                }
                match follow_rx.recv().await {
                    Some(text) => {
                        if session.send_message(&text).await.is_err() {
                            return;
                        }
                    }
                    None => {
                        session.mark_completed();
                        return;
                    }
                }
            }
        });
    }

    /// Nonblocking; legal only while `idle`.
    pub async fn send_follow_up(&self, id: &str, text: impl Into<String>) -> Result<()> {
        let status = self.get_session_status(id).await?;
        if status != SessionStatus::Idle {
            return Err(Error::Handler(format!(
                "session {id} is not idle (status={status:?})"
            )));
        }
        let follow_ups = self.follow_ups.read().await;
        let tx = follow_ups
            .get(id)
            .ok_or_else(|| Error::Handler(format!("no session {id}")))?;
        tx.try_send(text.into())
            .map_err(|_| Error::Handler("follow-up channel full or closed".to_string()))
    }

    /// Closes the follow-up channel; the turn-runner observes the close and
    /// transitions `idle -> completed`.
    pub async fn complete_session(&self, id: &str) -> Result<()> {
        let mut follow_ups = self.follow_ups.write().await;
        follow_ups
            .remove(id)
            .ok_or_else(|| Error::Handler(format!("no session {id}")))?;
        Ok(())
    }

    pub async fn stop_session(&self, id: &str) -> Result<()> {
        let session = {
            let sessions = self.sessions.read().await;
            sessions
                .get(id)
                .map(|m| Arc::clone(&m.session))
                .ok_or_else(|| Error::Handler(format!("no session {id}")))?
        };
        session.stop().await;
        Ok(())
    }

    /// Allowed only when the session is terminal or idle; persists a final
    /// record before removing all live state.
    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let status = self.get_session_status(id).await?;
        if !status.is_terminal() && status != SessionStatus::Idle {
            return Err(Error::Handler(format!(
                "cannot delete session {id} while status={status:?}"
            )));
        }

        let record = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(id)
                .map(|m| m.record)
                .ok_or_else(|| Error::Handler(format!("no session {id}")))?
        };
        self.store.save_final(&record).await?;

        self.outputs.lock().await.remove(id);
        self.follow_ups.write().await.remove(id);
        Ok(())
    }

    pub async fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).map(|m| Arc::clone(&m.session))
    }

    pub async fn get_session_info(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.read().await.get(id).map(|m| m.record.clone())
    }

    async fn get_session_status(&self, id: &str) -> Result<SessionStatus> {
        self.get_session_info(id)
            .await
            .map(|r| r.status)
            .ok_or_else(|| Error::Handler(format!("no session {id}")))
    }

    pub async fn get_sessions_for_worktree(&self, work_dir: &str) -> Vec<SessionRecord> {
        self.sessions
            .read()
            .await
            .values()
            .map(|m| m.record.clone())
            .filter(|r| r.work_dir == work_dir)
            .collect()
    }

    /// Newest-first, deterministic tie-break by id for equal timestamps.
    pub async fn get_all_sessions(&self) -> Vec<SessionRecord> {
        let mut records: Vec<SessionRecord> = self
            .sessions
            .read()
            .await
            .values()
            .map(|m| m.record.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        records
    }

    /// Deep-copied so a caller mutating the returned buffer can never
    /// observe, or cause, a torn update of the live one.
    pub async fn get_session_output(&self, id: &str) -> Vec<OutputLine> {
        self.outputs
            .lock()
            .await
            .get(id)
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn count_by_status(&self) -> HashMap<SessionStatus, usize> {
        let mut counts = HashMap::new();
        for managed in self.sessions.read().await.values() {
            *counts.entry(managed.record.status).or_insert(0) += 1;
        }
        counts
    }
}

/// Maps one semantic event to its persisted [`OutputLine`] form. Shared
/// between the live output bridge above and `fleetline-replay`, so both
/// paths produce the same line sequence from the same event stream.
pub fn to_output_line(event: &fleetline_types::SemanticEvent) -> OutputLine {
    use fleetline_types::SemanticEvent as E;
    match event {
        E::SessionReady { .. } => OutputLine::text(OutputLineKind::Status, "session ready"),
        E::TextDelta { text } => OutputLine::text(OutputLineKind::Text, text.clone()),
        E::ReasoningDelta { text } => OutputLine::text(OutputLineKind::Thinking, text.clone()),
        E::ToolStart { id, name, .. } => {
            let mut line = OutputLine::text(OutputLineKind::ToolStart, name.clone());
            line.tool_id = Some(id.clone());
            line.tool_state = Some(fleetline_types::ToolCallState::Running);
            line
        }
        E::ToolComplete {
            id,
            result,
            is_error,
            ..
        } => {
            let mut line = OutputLine::text(OutputLineKind::ToolResult, result.clone());
            line.tool_id = Some(id.clone());
            line.tool_state = Some(if *is_error {
                fleetline_types::ToolCallState::Error
            } else {
                fleetline_types::ToolCallState::Complete
            });
            line
        }
        E::TurnComplete {
            duration_ms, usage, ..
        } => {
            let mut line = OutputLine::text(OutputLineKind::TurnEnd, "");
            line.duration_ms = Some(*duration_ms);
            line.cost_usd = Some(usage.cost_usd);
            line
        }
        E::Error { err, context } => {
            OutputLine::text(OutputLineKind::Error, format!("{err}: {context}"))
        }
        _ => OutputLine::text(OutputLineKind::Status, "unknown event"),
    }
}

/// The trailing `<8 hex>` of a fresh v4 UUID, matching the
/// `<worktreeBase>-<type>-<8 hex>` id scheme.
fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
