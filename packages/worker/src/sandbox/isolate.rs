use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;

use super::{RunOutcome, RunSpec, Sandbox, SandboxError};

/// Sandbox backed by the `isolate` control-group jail.
///
/// Each run initializes the slot's box, copies the working directory in,
/// executes with cgroup memory accounting and wall/cpu limits, parses the
/// meta file, and tears the box down. Boxes have their own namespaces and
/// no network access.
pub struct IsolateSandbox {
    isolate_bin: String,
    box_id: u32,
}

impl IsolateSandbox {
    pub fn new(isolate_bin: impl Into<String>, box_id: u32) -> Self {
        Self {
            isolate_bin: isolate_bin.into(),
            box_id,
        }
    }

    async fn init_box(&self) -> Result<PathBuf, SandboxError> {
        let output = Command::new(&self.isolate_bin)
            .arg(format!("--box-id={}", self.box_id))
            .arg("--cg")
            .arg("--init")
            .output()
            .await
            .map_err(|err| {
                SandboxError::Initialization(format!("failed to execute isolate --init: {err}"))
            })?;

        if !output.status.success() {
            return Err(SandboxError::Initialization(format!(
                "isolate --init failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let path_text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if path_text.is_empty() {
            return Err(SandboxError::Initialization(
                "isolate --init did not return sandbox path".to_string(),
            ));
        }

        Ok(PathBuf::from(path_text).join("box"))
    }

    async fn cleanup_box(&self) -> Result<(), SandboxError> {
        let output = Command::new(&self.isolate_bin)
            .arg(format!("--box-id={}", self.box_id))
            .arg("--cg")
            .arg("--cleanup")
            .output()
            .await
            .map_err(|err| {
                SandboxError::Execution(format!("failed to execute isolate --cleanup: {err}"))
            })?;

        if !output.status.success() {
            return Err(SandboxError::Execution(format!(
                "isolate --cleanup failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    /// Copy every regular file of the staged working directory into the box.
    async fn populate_box(&self, workdir: &Path, box_dir: &Path) -> Result<(), SandboxError> {
        let mut entries = fs::read_dir(workdir).await.map_err(|err| {
            SandboxError::Initialization(format!("failed to read staging directory: {err}"))
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|err| {
            SandboxError::Initialization(format!("failed to read staging directory: {err}"))
        })? {
            let file_type = entry.file_type().await.map_err(|err| {
                SandboxError::Initialization(format!("failed to stat staged file: {err}"))
            })?;
            if !file_type.is_file() {
                continue;
            }
            let target = box_dir.join(entry.file_name());
            fs::copy(entry.path(), &target).await.map_err(|err| {
                SandboxError::Initialization(format!(
                    "failed to copy {} into sandbox: {err}",
                    entry.path().display()
                ))
            })?;
        }
        Ok(())
    }

    async fn exec(&self, spec: &RunSpec, box_dir: &Path) -> Result<RunOutcome, SandboxError> {
        let meta_path =
            std::env::temp_dir().join(format!("judge-isolate-{}.meta", self.box_id));

        let mut command = Command::new(&self.isolate_bin);
        command
            .arg(format!("--box-id={}", self.box_id))
            .arg("--cg")
            .arg(format!("--meta={}", meta_path.to_string_lossy()))
            .arg(format!(
                "--wall-time={:.3}",
                spec.limits.wall_time.as_secs_f64()
            ))
            .arg(format!("--time={:.3}", spec.limits.wall_time.as_secs_f64()))
            .arg("--processes")
            .arg("--stdout=stdout.txt")
            .arg("--stderr=stderr.txt");

        if let Some(memory_kb) = spec.limits.memory_kb {
            command.arg(format!("--cg-mem={memory_kb}"));
        }
        if let Some(stdin_file) = &spec.stdin_file {
            command.arg(format!("--stdin={stdin_file}"));
        }

        command.arg("--run").arg("--").args(&spec.argv);

        let output = command.output().await.map_err(|err| {
            SandboxError::Execution(format!("failed to execute isolate --run: {err}"))
        })?;

        // isolate exits 0 on success and 1 when the program failed; anything
        // else is an isolate-level failure.
        match output.status.code() {
            Some(0) | Some(1) => {
                let mut outcome = parse_meta(&meta_path).await?;
                outcome.stdout = fs::read_to_string(box_dir.join("stdout.txt"))
                    .await
                    .unwrap_or_default();
                outcome.stderr = fs::read_to_string(box_dir.join("stderr.txt"))
                    .await
                    .unwrap_or_default();
                let _ = fs::remove_file(&meta_path).await;
                Ok(outcome)
            }
            _ => Err(SandboxError::Unknown(format!(
                "isolate internal error: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}

async fn parse_meta(meta_path: &Path) -> Result<RunOutcome, SandboxError> {
    let content = fs::read_to_string(meta_path).await.map_err(|err| {
        SandboxError::Execution(format!("failed to read isolate meta file: {err}"))
    })?;

    let mut raw = HashMap::<String, String>::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            raw.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let parse_i32 = |key: &str| raw.get(key).and_then(|v| v.parse::<i32>().ok());
    let parse_i64 = |key: &str| raw.get(key).and_then(|v| v.parse::<i64>().ok());
    let parse_f64 = |key: &str| {
        raw.get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let status = raw.get("status").map(String::as_str).unwrap_or("OK");

    Ok(RunOutcome {
        exit_code: parse_i32("exitcode").or(if status == "OK" { Some(0) } else { None }),
        signal: parse_i32("exitsig"),
        timed_out: status == "TO",
        wall_time_ms: (parse_f64("time-wall") * 1000.0) as i64,
        memory_kb: parse_i64("cg-mem").or(parse_i64("max-rss")),
        stdout: String::new(),
        stderr: String::new(),
    })
}

#[async_trait]
impl Sandbox for IsolateSandbox {
    async fn run(&self, spec: RunSpec) -> Result<RunOutcome, SandboxError> {
        if spec.argv.is_empty() {
            return Err(SandboxError::Execution(
                "isolate --run requires at least one program argument".to_string(),
            ));
        }

        let box_dir = self.init_box().await?;
        self.populate_box(&spec.workdir, &box_dir).await?;

        let outcome = self.exec(&spec, &box_dir).await;

        // Bring declared outputs back before the box is torn down.
        if outcome.is_ok() {
            for name in &spec.outputs {
                let _ = fs::copy(box_dir.join(name), spec.workdir.join(name)).await;
            }
        }

        if let Err(err) = self.cleanup_box().await {
            tracing::warn!(box_id = self.box_id, error = %err, "Sandbox cleanup failed");
        }
        outcome
    }
}
