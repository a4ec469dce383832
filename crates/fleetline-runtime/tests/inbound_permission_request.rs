mod support;

use std::time::Duration;

use fleetline_testing::frames::claude;
use fleetline_testing::Script;
use fleetline_types::OutputLineKind;
use serde_json::json;

/// Scenario 3: the default `DenyAllPermissions` handler answers an agent's
/// `can_use_tool` control request with a `deny` control response on the
/// wire, without interrupting the turn the agent goes on to complete.
#[tokio::test]
async fn unconfigured_permission_handler_denies_and_turn_still_completes() {
    let script = Script::builder()
        .emit(claude::session_start("sess-3", "claude-3-5"))
        .wait_for_line()
        .emit(claude::message_start())
        .emit(claude::control_request_can_use_tool(
            "perm-1",
            "Bash",
            json!({"command": "rm -rf /"}),
        ))
        // Blocks until the host's deny response reaches the agent's stdin.
        .wait_for_contains("\"behavior\":\"deny\"")
        .emit(claude::turn_result("acknowledged", true, 3, 2, 0.0001))
        .wait_for_line()
        .build();

    let mut running = support::start_scripted_session(script, "try something risky").await;
    let lines = support::collect_output_until_turn_end(&mut running, Duration::from_secs(5)).await;

    assert!(
        lines.iter().any(|l| l.kind == OutputLineKind::TurnEnd),
        "turn should complete after the permission round trip: {lines:?}"
    );

    running.manager.stop_session(&running.id).await.unwrap();
}
