//! Runs the built binary and checks signal handling and exit status.

#![cfg(unix)]

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

fn daemon() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_listd"));
    command
        .env_remove("LISTD_CONFIG")
        .env_remove("LISTD_STORAGE_ADDRESS")
        .env_remove("LISTD_GRACE_PERIOD_SECS")
        .env("LISTD_BIND_ADDRESS", "127.0.0.1:0")
        .env("RUST_LOG", "listd=info")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    command
}

/// Wait until the accept loop is running and hand back the rest of the
/// log. Signal handlers are installed before the loop starts.
async fn wait_until_serving(child: &mut Child) -> Lines<BufReader<ChildStdout>> {
    let stdout = child.stdout.take().expect("stdout is piped");
    let mut lines = BufReader::new(stdout).lines();

    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(line) = lines.next_line().await.unwrap() {
            if line.contains("accepting connections") {
                break;
            }
        }
    })
    .await
    .expect("daemon never started serving");

    lines
}

async fn remaining(mut lines: Lines<BufReader<ChildStdout>>) -> Vec<String> {
    let mut rest = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        rest.push(line);
    }
    rest
}

fn position(log: &[String], message: &str) -> usize {
    log.iter()
        .position(|line| line.contains(message))
        .unwrap_or_else(|| panic!("{:?} not logged", message))
}

async fn send_sigterm(child: &Child) {
    let pid = child.id().expect("daemon still running");
    let _ = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()
        .await;
}

async fn wait_for_exit(child: &mut Child) -> ExitStatus {
    tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("daemon did not exit")
        .unwrap()
}

#[tokio::test]
async fn test_repeated_sigterm_shuts_down_cleanly() {
    let mut child = daemon().spawn().unwrap();
    let lines = wait_until_serving(&mut child).await;

    send_sigterm(&child).await;
    send_sigterm(&child).await;

    let status = wait_for_exit(&mut child).await;
    assert_eq!(status.code(), Some(0));

    let log = remaining(lines).await;
    assert!(position(&log, "Shutdown signal received") < position(&log, "Shutting down"));
    assert_eq!(log.iter().filter(|l| l.contains("Shutting down")).count(), 1);
}

#[tokio::test]
async fn test_unreachable_storage_fails_startup() {
    let refused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = refused.local_addr().unwrap().to_string();
    drop(refused);

    let mut child = daemon()
        .env("LISTD_STORAGE_ADDRESS", address)
        .spawn()
        .unwrap();

    let status = wait_for_exit(&mut child).await;
    assert_eq!(status.code(), Some(1));
}

#[tokio::test]
async fn test_zero_grace_period_is_rejected() {
    let mut child = daemon()
        .env("LISTD_GRACE_PERIOD_SECS", "0")
        .spawn()
        .unwrap();

    let status = wait_for_exit(&mut child).await;
    assert_eq!(status.code(), Some(1));
}
