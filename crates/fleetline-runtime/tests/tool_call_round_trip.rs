mod support;

use std::time::Duration;

use fleetline_testing::frames::claude;
use fleetline_testing::Script;
use fleetline_types::{OutputLineKind, ToolCallState};

/// Scenario 2: a tool call's `ToolStart` output line is mutated in place
/// (copy-on-write) into its `complete`/`error` state rather than appended
/// as a second line, and the completed line carries the tool's name even
/// though the wire's tool-result frame never repeats it.
#[tokio::test]
async fn tool_call_mutates_its_output_line_in_place() {
    let script = Script::builder()
        .emit(claude::session_start("sess-2", "claude-3-5"))
        .wait_for_line()
        .emit(claude::message_start())
        .emit(claude::tool_use_block_start(0, "tool-1", "Bash"))
        .emit(claude::input_json_delta(0, "{\"command\":\"ls\"}"))
        .emit(claude::block_stop(0))
        .emit(claude::tool_result("tool-1", "file_a\nfile_b", false))
        .emit(claude::turn_result("done", true, 8, 4, 0.0005))
        .wait_for_line()
        .build();

    let mut running = support::start_scripted_session(script, "list files").await;
    let lines = support::collect_output_until_turn_end(&mut running, Duration::from_secs(5)).await;

    let tool_lines: Vec<_> = lines.iter().filter(|l| l.tool_id.as_deref() == Some("tool-1")).collect();
    assert_eq!(
        tool_lines.len(),
        1,
        "tool start/complete should collapse into one output line: {lines:?}"
    );
    assert_eq!(tool_lines[0].kind, OutputLineKind::ToolStart);
    assert_eq!(tool_lines[0].content, "file_a\nfile_b");
    assert_eq!(tool_lines[0].tool_state, Some(ToolCallState::Complete));

    running.manager.stop_session(&running.id).await.unwrap();
}
