mod support;

use std::time::Duration;

use fleetline_testing::frames::claude;
use fleetline_testing::Script;
use fleetline_types::SessionStatus;

/// Scenario 6: stopping a session mid-stream settles it into the
/// `Stopped` terminal state within the configured stop timeline even
/// though the agent is still sleeping mid-turn and never reaches its own
/// `TurnComplete`. Process-level termination (stdin close -> SIGINT ->
/// SIGKILL to the process group) is covered directly against a real
/// child by the Supervisor's own `stop_is_idempotent` test; this test
/// covers the Session/Manager state transition that `Stop` is responsible
/// for on top of that.
#[tokio::test]
async fn stop_mid_turn_reaches_stopped_within_the_timeline() {
    let script = Script::builder()
        .emit(claude::session_start("sess-6", "claude-3-5"))
        .wait_for_line()
        .emit(claude::message_start())
        .emit(claude::text_block_start(0))
        .emit(claude::text_delta(0, "still writing"))
        // Long pause: simulates a turn that's still streaming when Stop fires.
        .sleep_ms(60_000)
        .emit(claude::block_stop(0))
        .emit(claude::message_stop())
        .emit(claude::turn_result("never reached", true, 1, 1, 0.0))
        .build();

    let running = support::start_scripted_session(script, "start a long turn").await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(info) = running.manager.get_session_info(&running.id).await {
            if info.status == SessionStatus::Running {
                break;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session never reached Running before Stop"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    running.manager.stop_session(&running.id).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let info = running.manager.get_session_info(&running.id).await.unwrap();
        if info.status.is_terminal() {
            assert_eq!(info.status, SessionStatus::Stopped);
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "stop should settle the session well inside its configured stop timeline"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
