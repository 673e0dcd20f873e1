//! Running `ssh`, `scp`, `sftp` and the editor as child processes.

use crate::{Result, SshyError};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, error};

/// Starts external programs and reports their exit code.
pub trait CommandRunner {
    /// Run `program` with `args` to completion, with the terminal attached.
    ///
    /// # Errors
    ///
    /// Returns [`SshyError::Command`] if the program cannot be started or
    /// waited on.
    fn run(&mut self, program: &str, args: &[String]) -> Result<i32>;
}

/// Spawns real processes with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, program: &str, args: &[String]) -> Result<i32> {
        debug!("Running command: {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SshyError::Command { program: program.to_string(), source })?;

        let status = child
            .wait()
            .map_err(|source| SshyError::Command { program: program.to_string(), source })?;

        Ok(exit_code(status))
    }
}

/// Exit code to report for a finished child: its own code, or 128 plus the
/// signal number when it was killed by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        if code != 0 {
            debug!("Command exited with code: {}", code);
        }
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            error!("Command terminated by signal: {}", signal);
            return 128_i32.saturating_add(signal);
        }
    }

    error!("Command terminated abnormally");
    1
}
