use std::{
    future::{self, Future},
    process::{Command as StdCommand, Stdio},
    time::Duration,
};

use educe::Educe;
use tokio::{process::Command, time};
use tokio_util::sync::CancellationToken;

use crate::LocalDbError;

#[cfg(windows)]
const SHELL: &str = "cmd.exe";
#[cfg(windows)]
const SHELL_ARGS: &[&str] = &["/c"];

#[cfg(not(windows))]
const SHELL: &str = "sh";
#[cfg(not(windows))]
const SHELL_ARGS: &[&str] = &["-c", r#"exec "$0" "$@""#];

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// The exit code reported for a process which exited without one.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// The result of one finished external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout:    String,
    pub stderr:    String,
}

impl CommandOutput {
    #[inline]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs the instance manager.
pub trait CommandRunner {
    /// Run `program subcommand args...` to completion.
    ///
    /// A non-zero exit code is not an error here. Callers decide what it means.
    fn run(
        &self,
        program: &str,
        subcommand: &'static str,
        args: &[&str],
    ) -> impl Future<Output = Result<CommandOutput, LocalDbError>> + Send;
}

/// Runs commands as child processes with both output streams captured.
#[derive(Debug, Clone, Educe)]
#[educe(Default)]
pub struct ProcessRunner {
    #[educe(Default = true)]
    use_shell:          bool,
    timeout:            Option<Duration>,
    cancellation_token: CancellationToken,
}

impl ProcessRunner {
    #[inline]
    pub fn new(use_shell: bool, timeout: Option<Duration>) -> Self {
        Self {
            use_shell,
            timeout,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Replace the token which aborts running invocations once cancelled.
    #[inline]
    pub fn with_cancellation_token(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;

        self
    }

    #[inline]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn build_command(&self, program: &str, subcommand: &str, args: &[&str]) -> Command {
        let mut command = if self.use_shell {
            let mut command = StdCommand::new(SHELL);

            command.args(SHELL_ARGS).arg(program);

            command
        } else {
            StdCommand::new(program)
        };

        command
            .arg(subcommand)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;

            command.creation_flags(CREATE_NO_WINDOW);
        }

        // a group of its own, so that everything it spawns can be killed together
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;

            command.process_group(0);
        }

        let mut command = Command::from(command);

        command.kill_on_drop(true);

        command
    }
}

/// Kill a child together with every process it has spawned.
///
/// Dropping the child only kills the child itself, which is the shell when the command runs through one.
async fn kill_process_tree(pid: Option<u32>) {
    // already reaped
    let Some(pid) = pid else {
        return;
    };

    #[cfg(windows)]
    let mut command = {
        let mut command = Command::new("taskkill");

        command.args(["/T", "/F", "/PID"]).arg(pid.to_string()).creation_flags(CREATE_NO_WINDOW);

        command
    };

    #[cfg(not(windows))]
    let mut command = {
        let mut command = Command::new("kill");

        command.args(["-KILL", "--"]).arg(format!("-{pid}"));

        command
    };

    command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

    match command.status().await {
        Ok(status) if status.success() => tracing::debug!("process tree {pid} has been killed"),
        Ok(status) => tracing::debug!("killing process tree {pid}: {status}"),
        Err(error) => tracing::warn!("cannot kill process tree {pid}: {error}"),
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        subcommand: &'static str,
        args: &[&str],
    ) -> Result<CommandOutput, LocalDbError> {
        let mut command = self.build_command(program, subcommand, args);

        tracing::debug!("executing {:?}", command.as_std());

        let child = command.spawn()?;
        let pid = child.id();

        // `wait_with_output` drains stdout and stderr concurrently while waiting
        let wait = child.wait_with_output();
        tokio::pin!(wait);

        let deadline = async {
            match self.timeout {
                Some(timeout) => {
                    time::sleep(timeout).await;

                    timeout
                },
                None => future::pending().await,
            }
        };

        // the child stays alive inside `wait` until the tree has been killed
        let output = tokio::select! {
            output = &mut wait => output?,
            timeout = deadline => {
                tracing::debug!("{program} {subcommand} has timed out after {timeout:?}");

                kill_process_tree(pid).await;

                return Err(LocalDbError::CommandTimedOut {
                    subcommand,
                    timeout,
                });
            },
            _ = self.cancellation_token.cancelled() => {
                tracing::debug!("{program} {subcommand} has been cancelled");

                kill_process_tree(pid).await;

                return Err(LocalDbError::Cancelled {
                    subcommand,
                });
            },
        };

        let exit_code = output.status.code().unwrap_or(UNKNOWN_EXIT_CODE);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        tracing::debug!("{program} {subcommand} exited with {exit_code}");

        if !stdout.trim().is_empty() {
            tracing::debug!("stdout: {}", stdout.trim_end());
        }

        if !stderr.trim().is_empty() {
            tracing::debug!("stderr: {}", stderr.trim_end());
        }

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}
