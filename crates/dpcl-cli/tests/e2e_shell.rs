//! E2E tests for the `dpcl` binary.
//!
//! Drives the shell over stdin/stdout by spawning real subprocesses.
//! `show` output and prompts go to stdout; errors go to stderr.

mod common;

use common::{dpcl_cmd, dpcl_cmd_with, program};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

// ─── Startup / Shutdown ────────────────────────────────────────────

#[test]
fn quit_immediately() {
    let (mut cmd, _guard) = dpcl_cmd();
    cmd.write_stdin("exit\n")
        .assert()
        .success()
        .stdout(contains("DPCL shell").and(contains("bye")));
}

#[test]
fn empty_stdin_exits_gracefully() {
    let (mut cmd, _guard) = dpcl_cmd();
    cmd.write_stdin("").assert().success();
}

#[test]
fn help_lists_commands() {
    let (mut cmd, _guard) = dpcl_cmd();
    cmd.write_stdin("help\nexit\n")
        .assert()
        .success()
        .stdout(contains("load <path>").and(contains("show")));
}

// ─── Program loading ───────────────────────────────────────────────

#[test]
fn startup_load_reports_success() {
    let (mut cmd, _guard) = dpcl_cmd_with("library.json");
    cmd.write_stdin("exit\n")
        .assert()
        .success()
        .stdout(contains("loaded"));
}

#[test]
fn startup_load_failure_is_fatal() {
    let (mut cmd, _guard) = dpcl_cmd_with("broken.json");
    cmd.write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(contains("ENGINE_SCHEMA_ERROR").and(contains("reactive rule")));
}

#[test]
fn startup_load_missing_file_is_fatal() {
    let (mut cmd, _guard) = dpcl_cmd();
    cmd.arg("--program")
        .arg("/no/such/program.json")
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(contains("ENGINE_IO_ERROR"));
}

#[test]
fn in_session_load_failure_is_not_fatal() {
    let (mut cmd, _guard) = dpcl_cmd();
    cmd.write_stdin("load /no/such/program.json\nexit\n")
        .assert()
        .success()
        .stderr(contains("ENGINE_IO_ERROR"));
}

#[test]
fn in_session_load_works() {
    let (mut cmd, _guard) = dpcl_cmd();
    let input = format!("load {}\nshow alice\nexit\n", program("library.json").display());
    cmd.write_stdin(input)
        .assert()
        .success()
        .stdout(contains("atomic alice").and(contains("student")));
}

// ─── Requests and show ─────────────────────────────────────────────

#[test]
fn register_round_trip() {
    let (mut cmd, _guard) = dpcl_cmd_with("library.json");
    cmd.write_stdin(concat!(
        r##"{"agent": "alice", "action": "#register"}"##,
        "\nshow alice\nexit\n"
    ))
    .assert()
    .success()
    .stdout(contains("ok").and(contains("member")));
}

#[test]
fn borrow_creates_instance() {
    let (mut cmd, _guard) = dpcl_cmd_with("library.json");
    cmd.write_stdin(concat!(
        r##"{"agent": "alice", "action": "#register"}"##,
        "\n",
        r##"{"agent": "alice", "action": {"event": "#borrow", "refinement": {"item": "dracula"}}}"##,
        "\nshow borrowing\nexit\n"
    ))
    .assert()
    .success()
    .stdout(
        contains("item: dracula")
            .and(contains("duty d1"))
            .and(contains("violated: false")),
    );
}

#[test]
fn timeout_then_fine() {
    let (mut cmd, _guard) = dpcl_cmd_with("library.json");
    cmd.write_stdin(concat!(
        r##"{"agent": "alice", "action": "#register"}"##,
        "\n",
        r##"{"agent": "alice", "action": {"event": "#borrow", "refinement": {"item": "dracula"}}}"##,
        "\n#timeout\n",
        r##"{"agent": "library", "action": {"event": "#fine", "refinement": {"target": "alice"}}}"##,
        "\nshow alice\nexit\n"
    ))
    .assert()
    .success()
    .stdout(contains("fined"));
}

#[test]
fn unauthorized_request_is_silent() {
    let (mut cmd, _guard) = dpcl_cmd_with("library.json");
    cmd.write_stdin(concat!(
        r##"{"agent": "bob", "action": "#register"}"##,
        "\nshow bob\nexit\n"
    ))
    .assert()
    .success()
    .stdout(contains("atomic bob [").and(contains("member").not()));
}

#[test]
fn show_unknown_name_reports_name_error() {
    let (mut cmd, _guard) = dpcl_cmd_with("library.json");
    cmd.write_stdin("show ghost\nexit\n")
        .assert()
        .success()
        .stderr(contains("ENGINE_NAME_ERROR"));
}

#[test]
fn malformed_json_is_reported() {
    let (mut cmd, _guard) = dpcl_cmd();
    cmd.write_stdin("{not json\nexit\n")
        .assert()
        .success()
        .stderr(contains("malformed input"));
}

// ─── Command mode ──────────────────────────────────────────────────

#[test]
fn command_mode_runs_one_line() {
    let (mut cmd, _guard) = dpcl_cmd_with("library.json");
    cmd.arg("show").arg("alice").assert().success().stdout(
        contains("atomic alice").and(contains("DPCL shell").not()),
    );
}
