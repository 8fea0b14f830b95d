//! Sandboxed program execution.
//!
//! Two backends behind one trait: `IsolateSandbox` (control-group
//! isolation, the default) and `DirectSandbox` (plain subprocess, trusted
//! environments only).

pub mod direct;
pub mod error;
pub mod isolate;

pub use direct::DirectSandbox;
pub use error::SandboxError;
pub use isolate::IsolateSandbox;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Resource limits for one sandboxed run.
#[derive(Clone, Debug)]
pub struct RunLimits {
    /// Wall-clock cap; the process is killed once it is exceeded.
    pub wall_time: Duration,
    /// Peak memory cap in kilobytes, when the backend can enforce it.
    pub memory_kb: Option<i64>,
}

/// One program invocation inside a sandbox.
#[derive(Clone, Debug)]
pub struct RunSpec {
    pub argv: Vec<String>,
    /// Directory holding exactly the files the run may see.
    pub workdir: PathBuf,
    /// File within `workdir` fed to the program on stdin.
    pub stdin_file: Option<String>,
    /// Files the run produces that must land back in `workdir` (compiled
    /// artifacts). Backends that execute in a separate directory copy them
    /// out after the run.
    pub outputs: Vec<String>,
    pub limits: RunLimits,
}

/// Observed outcome of a sandboxed run.
#[derive(Clone, Debug, Default)]
pub struct RunOutcome {
    /// Process exit code; `None` when killed by a signal.
    pub exit_code: Option<i32>,
    /// Terminating signal, if any.
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub wall_time_ms: i64,
    /// Peak memory in kilobytes; `None` when the backend cannot measure it.
    pub memory_kb: Option<i64>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run(&self, spec: RunSpec) -> Result<RunOutcome, SandboxError>;
}
