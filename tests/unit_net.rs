#![cfg(unix)]
#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chimp_stress::context::{shutdown_channel, RunContext, Shutdown};
use chimp_stress::domain::StatusBoard;
use chimp_stress::error::StressError;
use chimp_stress::lib_net::{iperf_args, network_load, NetworkSettings};
use chimp_stress::metrics::Metrics;
use tempfile::TempDir;

fn ctx() -> RunContext {
    RunContext::new(
        StatusBoard::default(),
        Metrics::new().expect("metrics"),
        Shutdown::never(),
    )
}

/// Writes an executable shell script standing in for the throughput client.
fn fake_client(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-iperf3");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

fn settings(program: &Path, grace: Duration) -> NetworkSettings {
    NetworkSettings {
        program: program.display().to_string(),
        exit_grace: grace,
    }
}

#[test]
fn client_arguments() {
    assert_eq!(
        iperf_args("peer.example", 30, "eth0"),
        vec!["--client", "peer.example", "--time", "30", "--bind-dev", "eth0"]
    );
}

#[tokio::test]
async fn passes_arguments_and_succeeds() {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().join("args.txt");
    let program = fake_client(dir.path(), &format!("echo \"$@\" > {}", out.display()));
    network_load(&ctx(), &settings(&program, Duration::from_secs(5)), 1, "eth0", "peer.example")
        .await
        .expect("ok");
    let args = std::fs::read_to_string(&out).expect("args");
    assert_eq!(args.trim(), "--client peer.example --time 1 --bind-dev eth0");
}

#[tokio::test]
async fn failing_client_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let program = fake_client(dir.path(), "exit 3");
    let err = network_load(&ctx(), &settings(&program, Duration::from_secs(5)), 1, "eth0", "peer")
        .await
        .expect_err("fails");
    assert!(matches!(err, StressError::External { .. }));
}

#[tokio::test]
async fn overrunning_client_is_terminated() {
    let dir = TempDir::new().expect("tempdir");
    let program = fake_client(dir.path(), "sleep 30");
    let started = Instant::now();
    network_load(&ctx(), &settings(&program, Duration::from_millis(200)), 1, "eth0", "peer")
        .await
        .expect("terminated after duration");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn missing_client_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let program = dir.path().join("does-not-exist");
    let err = network_load(&ctx(), &settings(&program, Duration::from_secs(1)), 1, "eth0", "peer")
        .await
        .expect_err("spawn fails");
    assert!(matches!(err, StressError::External { .. }));
}

#[tokio::test]
async fn empty_interface_rejected() {
    let err = network_load(&ctx(), &NetworkSettings::default(), 1, " ", "peer")
        .await
        .expect_err("validation");
    assert!(matches!(err, StressError::Validation(_)));
}

#[tokio::test]
async fn client_killed_when_interrupted() {
    let dir = TempDir::new().expect("tempdir");
    let pid_file = dir.path().join("pid");
    let program = fake_client(
        dir.path(),
        &format!("echo $$ > {}\nexec sleep 30", pid_file.display()),
    );
    let (trigger, shutdown) = shutdown_channel();
    let ctx = RunContext::new(
        StatusBoard::default(),
        Metrics::new().expect("metrics"),
        shutdown,
    );
    let watcher = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.trigger();
    });
    let started = Instant::now();
    let err = network_load(&ctx, &settings(&program, Duration::from_secs(5)), 30, "eth0", "peer")
        .await
        .expect_err("interrupted");
    watcher.await.expect("watcher");
    assert!(matches!(err, StressError::Interrupted));
    assert!(started.elapsed() < Duration::from_secs(10));
    let pid = std::fs::read_to_string(&pid_file).expect("pid");
    let alive = std::process::Command::new("kill")
        .args(["-0", pid.trim()])
        .status()
        .expect("kill")
        .success();
    assert!(!alive, "client {} still running", pid.trim());
}
