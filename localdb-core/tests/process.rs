#![cfg(unix)]


use std::{
    fs,
    time::{Duration, Instant},
};

use localdb_core::{CommandRunner, LocalDbError, ProcessRunner};
use tokio::time;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn capture_output_and_exit_code() {
    let runner = ProcessRunner::new(false, None);

    let output =
        runner.run("sh", "-c", &["echo hello; echo oops >&2; exit 3"]).await.unwrap();

    assert_eq!(3, output.exit_code);
    assert!(!output.success());
    assert_eq!("hello\n", output.stdout);
    assert_eq!("oops\n", output.stderr);
}

#[tokio::test]
async fn run_through_shell() {
    let runner = ProcessRunner::new(true, None);

    let output = runner.run("echo", "create", &["UnitTestProject", "-s"]).await.unwrap();

    assert!(output.success());
    assert_eq!("create UnitTestProject -s\n", output.stdout);
}

#[tokio::test]
async fn default_runner() {
    let runner = ProcessRunner::default();

    assert_eq!(None, runner.timeout());
    assert!(!runner.cancellation_token().is_cancelled());

    // runs through the shell
    let output = runner.run("echo", "start", &["UnitTestProject"]).await.unwrap();

    assert_eq!("start UnitTestProject\n", output.stdout);
}

#[tokio::test]
async fn drain_large_output() {
    let runner = ProcessRunner::new(false, Some(Duration::from_secs(30)));

    let output = runner
        .run("sh", "-c", &["head -c 1000000 /dev/zero | tr '\\0' a; head -c 1000000 /dev/zero | tr '\\0' b >&2"])
        .await
        .unwrap();

    assert!(output.success());
    assert_eq!(1_000_000, output.stdout.len());
    assert_eq!(1_000_000, output.stderr.len());
}

#[tokio::test]
async fn spawn_failed() {
    let runner = ProcessRunner::new(false, None);

    let error = runner.run("localdb-no-such-program", "create", &[]).await.unwrap_err();

    assert!(
        matches!(error, LocalDbError::IOError(ref error) if error.kind() == std::io::ErrorKind::NotFound)
    );
}

#[tokio::test]
async fn timeout() {
    let runner = ProcessRunner::new(false, Some(Duration::from_millis(200)));

    let start = Instant::now();

    let error = runner.run("sleep", "10", &[]).await.unwrap_err();

    assert!(matches!(error, LocalDbError::CommandTimedOut {
        subcommand: "10",
        ..
    }));
    assert!(start.elapsed() < Duration::from_secs(5));
}

/// Whether a process is gone. A zombie waiting to be reaped counts as gone.
#[cfg(target_os = "linux")]
fn process_exited(pid: &str) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat.rsplit_once(')').is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_through_shell_kills_spawned_processes() {
    let data_path = global::unique_data_path();

    fs::create_dir_all(data_path.as_path()).unwrap();

    let pid_file = data_path.join("background.pid");

    let runner = ProcessRunner::new(true, Some(Duration::from_millis(500)));

    let start = Instant::now();

    let error = runner
        .run("sh", "-c", &[r#"sleep 30 & echo $! > "$0"; wait"#, pid_file.to_str().unwrap()])
        .await
        .unwrap_err();

    assert!(matches!(error, LocalDbError::CommandTimedOut {
        subcommand: "-c",
        ..
    }));
    assert!(start.elapsed() < Duration::from_secs(5));

    let pid = fs::read_to_string(pid_file.as_path()).unwrap();
    let pid = pid.trim();

    let mut exited = false;

    for _ in 0..50 {
        if process_exited(pid) {
            exited = true;

            break;
        }

        time::sleep(Duration::from_millis(100)).await;
    }

    fs::remove_dir_all(data_path).unwrap();

    assert!(exited, "the background process {pid} is still running");
}

#[tokio::test]
async fn cancel() {
    let cancellation_token = CancellationToken::new();

    let runner = ProcessRunner::new(false, None).with_cancellation_token(cancellation_token.clone());

    {
        let cancellation_token = cancellation_token.clone();

        tokio::spawn(async move {
            time::sleep(Duration::from_millis(200)).await;

            cancellation_token.cancel();
        });
    }

    let start = Instant::now();

    let error = runner.run("sleep", "10", &[]).await.unwrap_err();

    assert!(matches!(error, LocalDbError::Cancelled {
        subcommand: "10"
    }));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(runner.cancellation_token().is_cancelled());
}
