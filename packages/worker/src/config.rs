use common::worker::HEARTBEAT_INTERVAL_SECS;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError};
use queue::QueueConfig;
use serde::Deserialize;

use crate::error::Result;

/// Which sandbox backend runs untrusted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxBackend {
    /// Control-group isolation: enforced memory cap, no network. Default.
    Isolate,
    /// Plain subprocess. No memory measurement, host network; only suitable
    /// for trusted environments and tests.
    Direct,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    /// Concurrent job loops in this process; each gets its own worker id
    /// and sandbox slot.
    pub max_workers: usize,
    pub heartbeat_interval_secs: u64,
    /// How long a dequeue blocks before polling again.
    pub poll_timeout_secs: u64,
    pub sandbox: SandboxBackend,
    pub isolate_bin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub queue: QueueConfig,
    pub worker: WorkerSettings,
    pub logging: LoggingConfig,
}

/// Recognized environment variables, applied as explicit overrides (the
/// names are flat and shared platform-wide).
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("REDIS_ADDR", "queue.addr"),
    ("REDIS_PASSWORD", "queue.password"),
    ("REDIS_DB", "queue.db"),
    ("MAX_WORKERS", "worker.max_workers"),
    ("WORKER_HEARTBEAT_INTERVAL", "worker.heartbeat_interval_secs"),
    ("WORKER_POLL_TIMEOUT", "worker.poll_timeout_secs"),
    ("WORKER_SANDBOX", "worker.sandbox"),
    ("WORKER_ISOLATE_BIN", "worker.isolate_bin"),
    ("LOG_LEVEL", "logging.level"),
];

impl WorkerConfig {
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("queue.addr", "localhost:6379")?
            .set_default("queue.password", "")?
            .set_default("queue.db", 0_i64)?
            .set_default("worker.max_workers", 3_i64)?
            .set_default(
                "worker.heartbeat_interval_secs",
                HEARTBEAT_INTERVAL_SECS as i64,
            )?
            .set_default("worker.poll_timeout_secs", 30_i64)?
            .set_default("worker.sandbox", "isolate")?
            .set_default("worker.isolate_bin", "isolate")?
            .set_default("logging.level", "info")?;

        builder = apply_env_overrides(builder)?;
        Ok(builder.build()?.try_deserialize()?)
    }
}

fn apply_env_overrides(
    mut builder: ConfigBuilder<DefaultState>,
) -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(var) {
            builder = builder.set_override(*key, value)?;
        }
    }
    Ok(builder)
}
