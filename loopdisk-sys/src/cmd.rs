// SPDX-License-Identifier: GPL-3.0-only

//! Invocation of external device-management utilities.
//!
//! A non-zero exit code is a normal return value here, never an error: all
//! interpretation of failure belongs to callers. Standard error is relayed to
//! the diagnostic stream only and never parsed for semantics.

use std::process::Command;

use loopdisk_types::non_empty_trimmed;

use crate::error::{DiskError, Result};

/// Exit code reported when the utility could not be spawned at all,
/// matching the shell convention for a missing command.
const SPAWN_FAILURE_CODE: i32 = 127;

/// Result of one external command invocation.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Rendered command line, for diagnostics and error reporting.
    pub command: String,
    /// Exit code; 127 when the process could not be spawned.
    pub code: i32,
    /// Trimmed stdout; `None` when empty or not captured.
    pub stdout: Option<String>,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub fn render(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Run a utility and capture its output.
///
/// The rendered command line is emitted to the diagnostic stream before the
/// process starts, as an audit trail of every device mutation.
pub fn run(program: &str, args: &[String]) -> Outcome {
    let command = render(program, args);
    tracing::info!("$ {command}");

    match Command::new(program).args(args).output() {
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(stderr) = non_empty_trimmed(&stderr) {
                tracing::debug!("{program}: {stderr}");
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            Outcome {
                command,
                code: output.status.code().unwrap_or(-1),
                stdout: non_empty_trimmed(&stdout).map(str::to_string),
            }
        }
        Err(error) => {
            tracing::warn!("failed to spawn {command}: {error}");
            Outcome {
                command,
                code: SPAWN_FAILURE_CODE,
                stdout: None,
            }
        }
    }
}

/// Exit-code-only mode: stdout and stderr are inherited, not captured.
pub fn run_status(program: &str, args: &[String]) -> i32 {
    let command = render(program, args);
    tracing::info!("$ {command}");

    match Command::new(program).args(args).status() {
        Ok(status) => status.code().unwrap_or(-1),
        Err(error) => {
            tracing::warn!("failed to spawn {command}: {error}");
            SPAWN_FAILURE_CODE
        }
    }
}

/// Stdout-only mode; `None` on non-zero exit or empty output.
pub fn run_stdout(program: &str, args: &[String]) -> Option<String> {
    let outcome = run(program, args);
    if outcome.success() {
        outcome.stdout
    } else {
        None
    }
}

/// Run a utility whose non-zero exit should abort the caller.
pub(crate) fn run_checked(program: &str, args: &[String]) -> Result<()> {
    let outcome = run(program, args);
    if outcome.success() {
        Ok(())
    } else {
        Err(DiskError::Execution {
            command: outcome.command,
            code: outcome.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{render, run, run_stdout};

    #[test]
    fn formats_command_context() {
        let args = vec![
            "--find".to_string(),
            "--show".to_string(),
            "disk.img".to_string(),
        ];
        assert_eq!(render("losetup", &args), "losetup --find --show disk.img");
        assert_eq!(render("losetup", &[]), "losetup");
    }

    #[test]
    fn captures_trimmed_stdout() {
        let outcome = run("sh", &["-c".to_string(), "printf ' hello '".to_string()]);
        assert!(outcome.success());
        assert_eq!(outcome.stdout.as_deref(), Some("hello"));
    }

    #[test]
    fn non_zero_exit_is_a_value_not_an_error() {
        let outcome = run("sh", &["-c".to_string(), "exit 3".to_string()]);
        assert_eq!(outcome.code, 3);
        assert_eq!(outcome.stdout, None);
    }

    #[test]
    fn spawn_failure_reports_shell_convention_code() {
        let outcome = run("loopdisk-no-such-binary", &[]);
        assert_eq!(outcome.code, 127);
    }

    #[test]
    fn stdout_mode_hides_output_of_failed_commands() {
        let hidden = run_stdout("sh", &["-c".to_string(), "echo boo; exit 1".to_string()]);
        assert_eq!(hidden, None);
    }
}
