//! inject::exec
//!
//! Runs the child command with the injected environment.
//!
//! The child inherits stdio. While it runs, interrupts are forwarded to it
//! and the parent keeps waiting; the child's exit status becomes the result.

use std::collections::BTreeMap;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use super::errors::InjectError;

/// Command used when none is given: `$SHELL`, else the platform shell.
pub fn default_command() -> Vec<String> {
    match std::env::var("SHELL") {
        Ok(shell) if !shell.trim().is_empty() => vec![shell],
        _ if cfg!(windows) => vec!["cmd.exe".to_string()],
        _ => vec!["/bin/sh".to_string()],
    }
}

/// Spawn `command` with exactly `env` and wait for it.
///
/// Returns the child's exit code, or `128 + signal` if it was killed by a
/// signal.
pub async fn run_child(command: &[String], env: &BTreeMap<String, String>) -> Result<i32, InjectError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| InjectError::Input("no command to run".into()))?;

    let mut child = Command::new(program)
        .args(args)
        .env_clear()
        .envs(env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| InjectError::Spawn {
            command: program.clone(),
            source,
        })?;
    tracing::debug!(command = %program, pid = ?child.id(), "started child");

    let wait_error = |source| InjectError::Wait {
        command: program.clone(),
        source,
    };

    loop {
        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(wait_error)?;
                tracing::debug!(command = %program, %status, "child exited");
                return Ok(exit_code(status));
            }
            signal = tokio::signal::ctrl_c() => {
                if signal.is_err() {
                    let status = child.wait().await.map_err(wait_error)?;
                    return Ok(exit_code(status));
                }
                forward_interrupt(&child);
            }
        }
    }
}

#[cfg(unix)]
fn forward_interrupt(child: &Child) {
    if let Some(pid) = child.id() {
        tracing::debug!(pid, "forwarding interrupt to child");
        // SAFETY: plain kill(2) on the pid of a child we have not reaped.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGINT);
        }
    }
}

#[cfg(not(unix))]
fn forward_interrupt(child: &Child) {
    // The console delivers Ctrl-C to every attached process.
    tracing::debug!(pid = ?child.id(), "interrupt received while child runs");
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn env_with_path() -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        if let Ok(path) = std::env::var("PATH") {
            env.insert("PATH".to_string(), path);
        }
        env
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn exit_code_propagates() {
        assert_eq!(run_child(&sh("exit 0"), &env_with_path()).await.unwrap(), 0);
        assert_eq!(run_child(&sh("exit 3"), &env_with_path()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn child_sees_only_the_given_environment() {
        let mut env = env_with_path();
        env.insert("SSOENV_TEST_MARKER".into(), "yes".into());
        let code = run_child(
            &sh(r#"[ "$SSOENV_TEST_MARKER" = yes ] && [ -z "$SSOENV_TEST_ABSENT" ]"#),
            &env,
        )
        .await
        .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn signal_death_maps_to_128_plus_signal() {
        let code = run_child(&sh("kill -TERM $$"), &env_with_path()).await.unwrap();
        assert_eq!(code, 128 + libc::SIGTERM);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let err = run_child(&["/nonexistent/ssoenv-child".to_string()], &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InjectError::Spawn { .. }));
    }

    #[tokio::test]
    async fn empty_command_is_input_error() {
        let err = run_child(&[], &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, InjectError::Input(_)));
    }
}
