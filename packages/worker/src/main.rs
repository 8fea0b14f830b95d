use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use queue::ExecutionQueue;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use worker::config::{SandboxBackend, WorkerConfig};
use worker::judge;
use worker::sandbox::{DirectSandbox, IsolateSandbox, Sandbox};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::load().context("Failed to load config")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let exec_queue = Arc::new(
        ExecutionQueue::connect(&config.queue)
            .await
            .context("Failed to connect to broker")?,
    );

    let base_id = worker_base_id();
    info!(
        worker_id = %base_id,
        max_workers = config.worker.max_workers,
        sandbox = ?config.worker.sandbox,
        "Worker starting"
    );

    let mut loops = JoinSet::new();
    for slot in 0..config.worker.max_workers.max(1) {
        let worker_id = format!("{base_id}-{slot}");
        let sandbox = build_sandbox(&config, slot as u32);

        exec_queue
            .register_worker(&worker_id)
            .await
            .context("Failed to register worker")?;
        spawn_heartbeat(
            Arc::clone(&exec_queue),
            worker_id.clone(),
            Duration::from_secs(config.worker.heartbeat_interval_secs),
        );

        let queue_handle = Arc::clone(&exec_queue);
        let poll_timeout = Duration::from_secs(config.worker.poll_timeout_secs);
        loops.spawn(async move {
            job_loop(queue_handle, sandbox, worker_id, poll_timeout).await;
        });
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping worker");
    loops.shutdown().await;

    Ok(())
}

/// `worker-{hostname}-{uuid8}`; slots append their index.
fn worker_base_id() -> String {
    let suffix = &Uuid::new_v4().to_string()[..8];
    match hostname::get() {
        Ok(host) => format!("worker-{}-{}", host.to_string_lossy(), suffix),
        Err(_) => format!("worker-{suffix}"),
    }
}

fn build_sandbox(config: &WorkerConfig, slot: u32) -> Box<dyn Sandbox> {
    match config.worker.sandbox {
        SandboxBackend::Isolate => {
            Box::new(IsolateSandbox::new(config.worker.isolate_bin.clone(), slot))
        }
        SandboxBackend::Direct => Box::new(DirectSandbox),
    }
}

fn spawn_heartbeat(exec_queue: Arc<ExecutionQueue>, worker_id: String, interval: Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            if let Err(e) = exec_queue.heartbeat_worker(&worker_id).await {
                warn!(worker_id = %worker_id, error = %e, "Heartbeat failed");
            }
        }
    });
}

/// Pull jobs, judge them, publish verdicts.
async fn job_loop(
    exec_queue: Arc<ExecutionQueue>,
    sandbox: Box<dyn Sandbox>,
    worker_id: String,
    poll_timeout: Duration,
) {
    loop {
        let job = match exec_queue.dequeue(&worker_id, poll_timeout).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                error!(worker_id = %worker_id, error = %e, "Dequeue failed");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        info!(
            worker_id = %worker_id,
            job_id = %job.job_id,
            submission_id = job.submission_id,
            test_cases = job.test_cases.len(),
            "Processing job"
        );

        let started = Instant::now();
        let result = judge::judge_submission(&job, sandbox.as_ref(), &worker_id).await;

        info!(
            worker_id = %worker_id,
            job_id = %job.job_id,
            status = %result.status,
            passed = result.passed_test_cases,
            total = result.total_test_cases,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job finished"
        );

        match exec_queue.publish_result(&result).await {
            Ok(()) => {
                // Only a published job releases its lease; otherwise the
                // reaper surfaces it after the job timeout.
                if let Err(e) = exec_queue.complete_job(&job.job_id).await {
                    warn!(job_id = %job.job_id, error = %e, "Failed to clear job lease");
                }
            }
            Err(e) => {
                error!(job_id = %job.job_id, error = %e, "Failed to publish result");
            }
        }

        if let Err(e) = exec_queue.mark_worker_idle(&worker_id).await {
            warn!(worker_id = %worker_id, error = %e, "Failed to mark worker idle");
        }
    }
}
