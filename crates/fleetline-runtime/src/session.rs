use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, oneshot, watch, Mutex};
use tokio_util::sync::CancellationToken;

use fleetline_core::config::StopTimeline;
use fleetline_providers::message::OutboundMessage;
use fleetline_providers::traits::Dialect;
use fleetline_types::{
    AgentDialect, ProtocolFrame, SemanticEvent, SessionStatus, SessionType, ToolCall, TurnUsage,
};

use crate::assembler::Assembler;
use crate::codec::EOF;
use crate::correlator::{Correlator, DenyAllPermissions, McpHandler, McpRegistry, ToolPermissionHandler};
use crate::error::{Error, Result};
use crate::supervisor::Supervisor;

const EVENT_CHANNEL_CAPACITY: usize = 256;
/// How often the reader task sweeps the Correlator for outbound requests
/// that have outlived `SessionConfig::correlation_timeout`.
const CORRELATION_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Everything needed to spawn and run one agent session.
pub struct SessionConfig {
    pub dialect: AgentDialect,
    pub binary: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: String,
    pub model: String,
    pub session_type: SessionType,
    pub fallback_grace: Duration,
    pub stop_timeline: StopTimeline,
    pub permission_handler: Arc<dyn ToolPermissionHandler>,
    pub mcp_handler: Arc<dyn McpHandler>,
    /// How long an outbound request (`interrupt`/`set_permission_mode`/
    /// `set_model`) may sit unanswered before it's evicted with
    /// `Error::CorrelationTimeout`.
    pub correlation_timeout: Duration,
}

impl SessionConfig {
    pub fn new(
        dialect: AgentDialect,
        binary: impl Into<String>,
        cwd: impl Into<String>,
        model: impl Into<String>,
        session_type: SessionType,
    ) -> Self {
        Self {
            dialect,
            binary: binary.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: cwd.into(),
            model: model.into(),
            session_type,
            fallback_grace: Duration::from_millis(150),
            stop_timeline: StopTimeline::default(),
            permission_handler: Arc::new(DenyAllPermissions),
            mcp_handler: Arc::new(McpRegistry::new()),
            correlation_timeout: crate::correlator::DEFAULT_CORRELATION_TIMEOUT,
        }
    }
}

/// The state machine and public operations over one agent's lifetime:
/// `pending -> running <-> idle -> completed`, with `failed`/
/// `stopped` reachable from any non-terminal state.
pub struct Session {
    pub id: String,
    pub session_type: SessionType,
    pub model: String,
    dialect: Arc<dyn Dialect>,
    supervisor: Arc<Supervisor>,
    correlator: Arc<Correlator>,
    assembler: Mutex<Assembler>,
    status_tx: watch::Sender<SessionStatus>,
    status_rx: watch::Receiver<SessionStatus>,
    events_tx: broadcast::Sender<SemanticEvent>,
    turn_waiter: Mutex<Option<oneshot::Sender<std::result::Result<TurnUsage, Error>>>>,
    cancel: CancellationToken,
    turn_number: AtomicU32,
    turn_started_at: Mutex<Option<Instant>>,
    /// Live tool calls this session owns, keyed by tool-use id. Populated on
    /// `ToolStart` and consumed (then dropped) on `ToolComplete`, so the
    /// `name`/`input` missing from the tool-result frame can be filled back
    /// into the `ToolComplete` event and the call's real duration computed.
    tool_calls: Mutex<HashMap<String, ToolCall>>,
    config: SessionConfig,
}

impl Session {
    pub fn new(id: impl Into<String>, dialect: Arc<dyn Dialect>, config: SessionConfig) -> Arc<Self> {
        let supervisor = Arc::new(Supervisor::new(config.stop_timeline));
        let correlator = Correlator::with_timeout(
            Arc::clone(&dialect),
            Arc::clone(&supervisor),
            Arc::clone(&config.permission_handler),
            Arc::clone(&config.mcp_handler),
            config.correlation_timeout,
        );
        let (status_tx, status_rx) = watch::channel(SessionStatus::Pending);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            id: id.into(),
            session_type: config.session_type,
            model: config.model.clone(),
            dialect,
            supervisor,
            correlator,
            assembler: Mutex::new(Assembler::new()),
            status_tx,
            status_rx,
            events_tx,
            turn_waiter: Mutex::new(None),
            cancel: CancellationToken::new(),
            turn_number: AtomicU32::new(0),
            turn_started_at: Mutex::new(None),
            tool_calls: Mutex::new(HashMap::new()),
            config,
        })
    }

    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to status transitions; the Manager watches this to persist
    /// terminal states and to know when `idle` makes a follow-up legal.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// A read-only stream of this session's events, 1:1 per session,
    /// backpressured by dropping the oldest undelivered event — a
    /// lagging subscriber just observes a gap, which is why this is
    /// telemetry, not a reliable queue.
    pub fn events(&self) -> broadcast::Receiver<SemanticEvent> {
        self.events_tx.subscribe()
    }

    fn set_status(&self, status: SessionStatus) {
        let _ = self.status_tx.send(status);
    }

    /// Launches the Supervisor, starts the reader and stderr-drain workers,
    /// and waits for `SessionReady`. Fails with a structured error if the
    /// agent exits or emits nothing recognisable during the handshake.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let streams = self
            .supervisor
            .start(&self.config.binary, &self.config.args, &self.config.env, &self.config.cwd)
            .await?;

        self.spawn_stderr_drain(streams.stderr);

        let this = Arc::clone(self);
        let mut stdout = streams.stdout;
        let ready = tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                tokio::select! {
                    _ = this.cancel.cancelled() => return Err(Error::Cancelled),
                    line = stdout.read_line() => {
                        match line {
                            Ok(l) if l == EOF => {
                                return Err(Error::ChildExited { stderr_tail: String::new() });
                            }
                            Ok(l) => {
                                if let Some(event) = this.process_line(&l).await {
                                    if matches!(event, SemanticEvent::SessionReady { .. }) {
                                        return Ok(());
                                    }
                                }
                            }
                            Err(Error::FrameTooLarge { len }) => {
                                tracing::warn!(session_id = %this.id, len, "frame too large during handshake, skipped");
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
        })
        .await;

        match ready {
            Ok(Ok(())) => {
                self.set_status(SessionStatus::Running);
            }
            Ok(Err(err)) => {
                self.set_status(SessionStatus::Failed);
                return Err(err);
            }
            Err(_) => {
                self.set_status(SessionStatus::Failed);
                return Err(Error::ChildExited {
                    stderr_tail: "handshake timed out".to_string(),
                });
            }
        }

        self.spawn_reader(stdout);
        Ok(())
    }

    /// Decode one line, route request-shaped messages to the Correlator,
    /// feed everything to the Assembler, and broadcast the resulting
    /// events. Returns the last event produced, if any (used by `start` to
    /// detect `SessionReady`).
    async fn process_line(self: &Arc<Self>, line: &str) -> Option<SemanticEvent> {
        let frame = match ProtocolFrame::from_line(line) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(session_id = %self.id, error = %err, "failed to parse frame as JSON");
                return None;
            }
        };
        let message = match self.dialect.decode_inbound(&frame) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(session_id = %self.id, error = %err, "failed to decode frame");
                return None;
            }
        };
        if let fleetline_providers::message::TypedInboundMessage::Skip { discriminator } = &message {
            tracing::warn!(session_id = %self.id, discriminator, "unrecognised discriminator, skipped");
            return None;
        }

        self.correlator.dispatch_inbound(message.clone());

        let events = self.assembler.lock().await.feed(&message);
        let mut last = None;
        for mut event in events {
            self.enrich_tool_event(&mut event).await;
            if let SemanticEvent::TurnComplete {
                duration_ms, usage, ..
            } = &mut event
            {
                self.turn_number.fetch_add(1, Ordering::SeqCst);
                if let Some(started) = self.turn_started_at.lock().await.take() {
                    *duration_ms = started.elapsed().as_millis() as u64;
                }
                if let Some(tx) = self.turn_waiter.lock().await.take() {
                    let _ = tx.send(Ok(*usage));
                }
                self.set_status(SessionStatus::Idle);
            }
            let _ = self.events_tx.send(event.clone());
            last = Some(event);
        }
        last
    }

    /// Maintains the per-session `ToolCall` table: starts tracking on
    /// `ToolStart`, and on `ToolComplete` fills in the `name`/`input` the
    /// tool-result frame doesn't carry (and records the call's duration,
    /// per the ToolCall invariant) before the event is broadcast.
    async fn enrich_tool_event(&self, event: &mut SemanticEvent) {
        match event {
            SemanticEvent::ToolStart { id, name, input } => {
                self.tool_calls
                    .lock()
                    .await
                    .insert(id.clone(), ToolCall::start(id.clone(), name.clone(), input.clone()));
            }
            SemanticEvent::ToolComplete {
                id,
                name,
                input,
                result,
                is_error,
            } => {
                let mut calls = self.tool_calls.lock().await;
                if let Some(mut call) = calls.remove(id) {
                    if *is_error {
                        call.fail(result.clone());
                    } else {
                        call.complete(result.clone());
                    }
                    *name = call.name;
                    *input = call.input;
                }
            }
            _ => {}
        }
    }

    fn spawn_reader(self: &Arc<Self>, mut stdout: crate::codec::LineReader) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut correlation_sweep = tokio::time::interval(CORRELATION_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = this.cancel.cancelled() => break,
                    _ = correlation_sweep.tick() => {
                        this.correlator.sweep_timed_out().await;
                    }
                    line = stdout.read_line() => {
                        match line {
                            Ok(l) if l == EOF => {
                                if !this.status().is_terminal() {
                                    this.set_status(SessionStatus::Failed);
                                    let _ = this.events_tx.send(SemanticEvent::Error {
                                        err: "child exited".to_string(),
                                        context: "stdout closed".to_string(),
                                    });
                                }
                                break;
                            }
                            Ok(l) => {
                                this.process_line(&l).await;
                            }
                            Err(Error::FrameTooLarge { len }) => {
                                tracing::warn!(session_id = %this.id, len, "frame too large, skipped");
                            }
                            Err(err) => {
                                tracing::warn!(session_id = %this.id, error = %err, "reader error");
                            }
                        }
                    }
                }
            }
        });
    }

    fn spawn_stderr_drain(self: &Arc<Self>, mut stderr: tokio::process::ChildStderr) {
        use tokio::io::AsyncReadExt;
        let session_id = self.id.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match stderr.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        tracing::debug!(session_id = %session_id, bytes = n, "agent stderr chunk");
                    }
                    Err(_) => break,
                }
            }
        });
    }

    /// Writes a user-turn frame and waits for `TurnComplete` or
    /// cancellation. Legal from `running` (first turn) or `idle` (a
    /// follow-up); the caller (Manager) is responsible for only calling
    /// this when the state machine allows it.
    pub async fn send_message(self: &Arc<Self>, text: &str) -> Result<TurnUsage> {
        self.set_status(SessionStatus::Running);
        let (tx, rx) = oneshot::channel();
        *self.turn_waiter.lock().await = Some(tx);
        *self.turn_started_at.lock().await = Some(Instant::now());

        let frame = self
            .dialect
            .decode_outbound(&OutboundMessage::UserTurn { text: text.to_string() })?;
        let line = frame.to_line().map_err(|e| fleetline_providers::error::Error::Json(e))?;
        self.supervisor.write_frame(line.as_bytes()).await?;

        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = rx => result.map_err(|_| Error::Cancelled)?,
        }
    }

    /// Explicit state transition used by the Manager to move `idle ->
    /// completed` when the follow-up channel is closed.
    pub fn mark_completed(&self) {
        self.set_status(SessionStatus::Completed);
    }

    /// Idempotent: cancels the session context, fails every pending
    /// outbound resolver with `Cancelled`, tears down the Supervisor with
    /// its fixed stop timeline, and marks the session `stopped` unless it
    /// already reached a terminal state on its own.
    pub async fn stop(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.correlator.cancel_all().await;
        if let Some(tx) = self.turn_waiter.lock().await.take() {
            let _ = tx.send(Err(Error::Cancelled));
        }
        self.supervisor.stop().await;
        if !self.status().is_terminal() {
            self.set_status(SessionStatus::Stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetline_providers::dialect_by_name;

    fn test_config(binary: &str, args: &[&str]) -> SessionConfig {
        let mut cfg = SessionConfig::new(
            AgentDialect::ClaudeCode,
            binary,
            ".",
            "test-model",
            SessionType::Builder,
        );
        cfg.args = args.iter().map(|s| s.to_string()).collect();
        cfg.stop_timeline = StopTimeline {
            stdin_close_wait: Duration::from_millis(20),
            interrupt_wait: Duration::from_millis(20),
            kill_wait: Duration::from_millis(20),
        };
        cfg
    }

    #[tokio::test]
    async fn stop_before_start_is_a_noop() {
        let dialect: Arc<dyn Dialect> = dialect_by_name("claude").unwrap().into();
        let session = Session::new("s1", dialect, test_config("true", &[]));
        session.stop().await;
        session.stop().await;
    }
}
