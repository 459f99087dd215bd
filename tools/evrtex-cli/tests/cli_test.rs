//! CLI integration tests.
//!
//! Exercises the commands that work without the external codec tools
//! installed, and verifies failure modes for the ones that need them.

use std::path::Path;
use std::process::Command;

fn evrtex() -> Command {
    Command::new(env!("CARGO_BIN_EXE_evrtex"))
}

fn write_dds(path: &Path, width: u32, height: u32) {
    let mut buf = vec![0u8; 128];
    buf[0..4].copy_from_slice(b"DDS ");
    buf[12..16].copy_from_slice(&height.to_le_bytes());
    buf[16..20].copy_from_slice(&width.to_le_bytes());
    buf[28..32].copy_from_slice(&5u32.to_le_bytes());
    buf[84..88].copy_from_slice(b"DXT1");
    std::fs::write(path, buf).unwrap();
}

#[test]
fn inspect_prints_header_fields() {
    let dir = tempfile::tempdir().unwrap();
    let dds = dir.path().join("wall.dds");
    write_dds(&dds, 256, 128);

    let output = evrtex().arg("inspect").arg(&dds).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("256x128"));
    assert!(stdout.contains("BC1/DXT1"));
    assert!(stdout.contains("Mipmaps: 5"));
}

#[test]
fn inspect_rejects_non_dds() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("blob.bin");
    std::fs::write(&file, b"just some bytes").unwrap();

    let output = evrtex().arg("inspect").arg(&file).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn resolve_fails_cleanly_when_tools_are_missing() {
    let dir = tempfile::tempdir().unwrap();
    let blob = dir.path().join("rock_d");
    std::fs::write(&blob, vec![0u8; 4096]).unwrap();

    // Point tool discovery at a path that cannot exist.
    let output = evrtex()
        .arg("--settings-dir")
        .arg(dir.path())
        .arg("--astcenc")
        .arg(dir.path().join("no-such-astcenc"))
        .arg("resolve")
        .arg(&blob)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("astcenc"));
}

#[test]
fn batch_rejects_empty_job_file() {
    let dir = tempfile::tempdir().unwrap();
    let jobs = dir.path().join("jobs.json");
    std::fs::write(&jobs, b"[]").unwrap();

    let output = evrtex()
        .arg("--settings-dir")
        .arg(dir.path())
        .arg("batch")
        .arg(&jobs)
        .output()
        .unwrap();
    assert!(!output.status.success());
}
