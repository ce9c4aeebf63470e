//! E2E tests for watch mode
//!
//! These are timing-sensitive: the watcher drains startup noise for 500ms
//! before it starts scheduling, so every test sleeps past that window
//! before touching files.

mod common;

use std::fs;
use std::process::{Child, Stdio};
use std::thread;
use std::time::Duration;

use common::{rescomp, write_file};
use tempfile::tempdir;

fn spawn_watch(args: &[&std::ffi::OsStr]) -> Child {
    let mut cmd = rescomp();
    cmd.arg("--watch").arg("--json");
    for arg in args {
        cmd.arg(arg);
    }
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start rescomp --watch")
}

fn finish(mut child: Child) -> String {
    let _ = child.kill();
    let output = child.wait_with_output().expect("failed to collect output");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn watch_emits_start_and_initial_pass_events() {
    let temp = tempdir().unwrap();
    let input = write_file(temp.path(), "hud/health.res", "\"Health\" { \"xpos\" \"1\" }\n");
    let out = temp.path().join("dist/health.res");

    let child = spawn_watch(&[input.as_os_str(), "-o".as_ref(), out.as_os_str()]);
    thread::sleep(Duration::from_millis(800));
    let stdout = finish(child);

    assert!(stdout.contains("watch_started"), "got: {stdout}");
    assert!(stdout.contains("pass_complete"), "got: {stdout}");
    assert!(out.is_file(), "initial pass should write the output");
}

#[test]
fn watch_recompiles_a_changed_file() {
    let temp = tempdir().unwrap();
    let input = write_file(temp.path(), "hud/health.res", "\"Health\" { \"xpos\" \"1\" }\n");
    let out = temp.path().join("dist/health.res");

    let child = spawn_watch(&[input.as_os_str(), "-o".as_ref(), out.as_os_str()]);

    // Let the initial pass and the startup cooldown finish.
    thread::sleep(Duration::from_millis(1200));
    fs::write(&input, "\"Health\" { \"xpos\" \"99\" }\n").unwrap();
    thread::sleep(Duration::from_millis(1200));

    let stdout = finish(child);
    assert!(stdout.contains("file_changed"), "got: {stdout}");

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.contains("\"99\""), "output not recompiled: {written}");
}

#[test]
fn watch_collapses_a_burst_into_one_recompilation() {
    let temp = tempdir().unwrap();
    let input = write_file(temp.path(), "hud/health.res", "\"Health\" { \"xpos\" \"1\" }\n");
    let out = temp.path().join("dist/health.res");

    let mut cmd = rescomp();
    cmd.arg("--watch")
        .arg("--json")
        .arg(&input)
        .arg("-o")
        .arg(&out)
        // A wide window makes the collapse deterministic under load.
        .env("RESCOMP_DEBOUNCE_MS", "500")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let child = cmd.spawn().expect("failed to start rescomp --watch");

    thread::sleep(Duration::from_millis(1200));
    for value in ["2", "3", "4"] {
        fs::write(&input, format!("\"Health\" {{ \"xpos\" \"{value}\" }}\n")).unwrap();
        thread::sleep(Duration::from_millis(60));
    }
    thread::sleep(Duration::from_millis(1500));

    let stdout = finish(child);
    let passes = stdout.matches("pass_complete").count();
    // One initial pass plus exactly one for the whole burst.
    assert_eq!(passes, 2, "got: {stdout}");

    let written = fs::read_to_string(&out).unwrap();
    assert!(
        written.contains("\"4\""),
        "output should reflect state at window close: {written}"
    );
}

#[test]
fn watch_trigger_change_rebuilds_the_whole_input() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("hud");
    write_file(&src, "health.res", "#base \"../shared/colors.res\"\n\"Health\" { }\n");
    let shared = write_file(temp.path(), "shared/colors.res", "\"Health\" { \"old\" \"1\" }\n");
    let dest = temp.path().join("dist");

    let child = spawn_watch(&[
        src.as_os_str(),
        "-o".as_ref(),
        dest.as_os_str(),
        "-t".as_ref(),
        shared.as_os_str(),
    ]);

    thread::sleep(Duration::from_millis(1200));
    // The trigger file is outside the watched input; changing it must
    // rebuild the owning input in full.
    fs::write(&shared, "\"Health\" { \"new\" \"1\" }\n").unwrap();
    thread::sleep(Duration::from_millis(1500));

    let stdout = finish(child);
    assert!(stdout.contains("trigger_fired"), "got: {stdout}");

    let written = fs::read_to_string(dest.join("health.res")).unwrap();
    assert!(written.contains("\"new\""), "not rebuilt from trigger: {written}");
}
