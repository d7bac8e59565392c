#![allow(dead_code)]
//! Shared E2E helpers for `dpcl` binary tests.
//!
//! `assert_cmd::write_stdin()` sets stdin content before the process
//! starts, and the shell reads stdin line by line, so scripted
//! sessions (`"show alice\nexit\n"`) are deterministic: each cascade
//! drains before the next line is read.

use std::path::PathBuf;
use std::time::Duration;

use assert_cmd::Command;

/// Default timeout for shell tests.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Path to a fixture program under `tests/programs/`.
pub fn program(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("programs")
        .join(name)
}

/// Build a `dpcl` Command with history isolated to a tempdir.
///
/// Returns `(command, _guard)`; keep the guard alive for the test's
/// duration.
pub fn dpcl_cmd() -> (Command, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("create temp dir for history");
    let mut cmd = Command::cargo_bin("dpcl").expect("dpcl binary builds");
    cmd.timeout(TIMEOUT);
    cmd.env("DPCL_HISTORY", tmp.path().join("history"));
    (cmd, tmp)
}

/// Same, pre-loading a fixture program via `--program`.
pub fn dpcl_cmd_with(program_name: &str) -> (Command, tempfile::TempDir) {
    let (mut cmd, tmp) = dpcl_cmd();
    cmd.arg("--program").arg(program(program_name));
    (cmd, tmp)
}
