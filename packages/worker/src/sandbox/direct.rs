use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use super::{RunOutcome, RunSpec, Sandbox, SandboxError};

/// Plain-subprocess backend.
///
/// Enforces the wall-clock cap by killing the child, but measures no memory
/// and shares the host network and filesystem view. Only suitable for
/// trusted environments and tests.
#[derive(Debug, Default)]
pub struct DirectSandbox;

#[async_trait]
impl Sandbox for DirectSandbox {
    async fn run(&self, spec: RunSpec) -> Result<RunOutcome, SandboxError> {
        let Some((program, args)) = spec.argv.split_first() else {
            return Err(SandboxError::Execution(
                "run requires at least one program argument".to_string(),
            ));
        };

        let stdin = match &spec.stdin_file {
            Some(name) => {
                let file = std::fs::File::open(spec.workdir.join(name)).map_err(|err| {
                    SandboxError::Execution(format!("failed to open stdin file: {err}"))
                })?;
                Stdio::from(file)
            }
            None => Stdio::null(),
        };

        let start = Instant::now();
        let child = Command::new(program)
            .args(args)
            .current_dir(&spec.workdir)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| SandboxError::Execution(format!("failed to spawn program: {err}")))?;

        // On timeout the dropped future kills the child via kill_on_drop.
        match tokio::time::timeout(spec.limits.wall_time, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let signal = exit_signal(&output.status);
                Ok(RunOutcome {
                    exit_code: output.status.code(),
                    signal,
                    timed_out: false,
                    wall_time_ms: start.elapsed().as_millis() as i64,
                    memory_kb: None,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                })
            }
            Ok(Err(err)) => Err(SandboxError::Execution(format!(
                "failed to wait for program: {err}"
            ))),
            Err(_) => Ok(RunOutcome {
                exit_code: None,
                signal: None,
                timed_out: true,
                wall_time_ms: start.elapsed().as_millis() as i64,
                memory_kb: None,
                stdout: String::new(),
                stderr: String::new(),
            }),
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
