//! Shared scaffolding for the scenario tests: spins up a real
//! `SessionManager` wired to the scripted `fleetline-fake-agent` binary
//! through the real Process Supervisor, so these tests exercise actual
//! OS processes and pipes end to end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleetline_core::config::StopTimeline;
use fleetline_runtime::{
    DenyAllPermissions, JsonlSessionStore, ManagerConfig, ManagerEvent, McpRegistry, SessionManager,
};
use fleetline_testing::{wrapper_for, Script, ScriptFile, WrapperBinary};
use fleetline_types::{AgentDialect, OutputLine, OutputLineKind, SessionType};

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

fn default_manager_config(agent_binaries: HashMap<String, String>) -> ManagerConfig {
    ManagerConfig {
        agent_binaries,
        output_buffer_capacity: 1000,
        stop_timeline: StopTimeline {
            stdin_close_wait: Duration::from_millis(50),
            interrupt_wait: Duration::from_millis(50),
            kill_wait: Duration::from_millis(50),
        },
        fallback_grace: Duration::from_millis(50),
        correlation_timeout: Duration::from_secs(30),
        permission_handler: Arc::new(DenyAllPermissions),
        mcp_handler: Arc::new(McpRegistry::new()),
    }
}

fn new_store() -> JsonlSessionStore {
    let path = std::env::temp_dir().join(format!(
        "fleetline-scenario-{}-{}.jsonl",
        std::process::id(),
        unique_suffix()
    ));
    JsonlSessionStore::new(path)
}

/// A manager wired to one or more scripted agents, keeping their backing
/// temp files alive for the test's duration.
pub struct ManagerHandle {
    pub manager: Arc<SessionManager>,
    pub events: tokio::sync::broadcast::Receiver<ManagerEvent>,
    _wrappers: Vec<WrapperBinary>,
    _scripts: Vec<ScriptFile>,
}

/// Builds a manager with one scripted fake-agent binary registered per
/// dialect in `agents`, subscribing to its event channel before any
/// session exists so no early output is missed.
pub async fn shared_manager(agents: Vec<(AgentDialect, Script)>) -> ManagerHandle {
    let mut binaries = HashMap::new();
    let mut wrappers = Vec::new();
    let mut scripts = Vec::new();
    for (dialect, script) in agents {
        let script_file = script.into_file().expect("write script to temp file");
        let wrapper = wrapper_for(&script_file).expect("build fake-agent wrapper binary");
        binaries.insert(dialect.id().to_string(), wrapper.path_str());
        wrappers.push(wrapper);
        scripts.push(script_file);
    }
    let manager = SessionManager::new(default_manager_config(binaries), Arc::new(new_store()));
    let events = manager.subscribe();
    ManagerHandle {
        manager,
        events,
        _wrappers: wrappers,
        _scripts: scripts,
    }
}

/// Keeps a single scripted session's generated files alive for the
/// test's duration.
pub struct RunningSession {
    pub manager: Arc<SessionManager>,
    pub id: String,
    pub events: tokio::sync::broadcast::Receiver<ManagerEvent>,
    _wrapper: WrapperBinary,
    _script: ScriptFile,
}

/// Starts one scripted session under its own dedicated manager,
/// subscribing to the manager's event channel *before* the session is
/// created so no early output is missed.
pub async fn start_scripted_session(script: Script, prompt: &str) -> RunningSession {
    let script_file = script.into_file().expect("write script to temp file");
    let wrapper = wrapper_for(&script_file).expect("build fake-agent wrapper binary");

    let binaries = HashMap::from([("claude".to_string(), wrapper.path_str())]);
    let manager = SessionManager::new(default_manager_config(binaries), Arc::new(new_store()));
    let events = manager.subscribe();

    let workdir = std::env::temp_dir().to_string_lossy().into_owned();
    let id = manager
        .start_session(
            SessionType::Builder,
            workdir,
            prompt,
            AgentDialect::ClaudeCode,
            "test-model",
            "scenario",
        )
        .await
        .expect("start_session should succeed against the fake agent");

    RunningSession {
        manager,
        id,
        events,
        _wrapper: wrapper,
        _script: script_file,
    }
}

/// Drains `ManagerEvent::Output` lines for `session_id` out of `events`
/// until one with `TurnEnd` kind arrives (or the timeout elapses).
pub async fn drain_until_turn_end(
    events: &mut tokio::sync::broadcast::Receiver<ManagerEvent>,
    session_id: &str,
    timeout: Duration,
) -> Vec<OutputLine> {
    let mut lines = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            panic!("timed out waiting for TurnEnd on {session_id}; collected so far: {lines:?}");
        }
        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(ManagerEvent::Output { session_id: sid, line })) if sid == session_id => {
                let done = line.kind == OutputLineKind::TurnEnd;
                lines.push(line);
                if done {
                    return lines;
                }
            }
            Ok(Ok(_)) => continue,
            Ok(Err(_)) => panic!("manager event channel closed before TurnEnd on {session_id}"),
            Err(_) => panic!("timed out waiting for TurnEnd on {session_id}"),
        }
    }
}

pub async fn collect_output_until_turn_end(
    running: &mut RunningSession,
    timeout: Duration,
) -> Vec<OutputLine> {
    drain_until_turn_end(&mut running.events, &running.id, timeout).await
}
