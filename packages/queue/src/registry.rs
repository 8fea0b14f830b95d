//! Worker registry over the `workers:status` hash.
//!
//! Each worker owns one entry keyed by its id. Heartbeats refresh
//! `last_ping`; entries silent for more than two minutes are evicted.

use std::collections::HashMap;

use chrono::Utc;
use redis::AsyncCommands;
use tracing::{info, warn};

use common::worker::{WorkerState, WorkerStatus};

use crate::error::QueueError;
use crate::queue::ExecutionQueue;

/// Hash holding one `WorkerStatus` entry per registered worker.
pub const WORKERS_KEY: &str = "workers:status";

impl ExecutionQueue {
    /// Record a fresh idle entry for `worker_id`.
    pub async fn register_worker(&self, worker_id: &str) -> Result<(), QueueError> {
        self.write_worker_entry(&WorkerStatus::idle(worker_id)).await?;
        info!(worker_id, "Registered worker");
        Ok(())
    }

    /// Refresh `last_ping`, re-registering if the entry was evicted.
    pub async fn heartbeat_worker(&self, worker_id: &str) -> Result<(), QueueError> {
        self.update_worker_entry(worker_id, |entry| {
            entry.last_ping = Utc::now();
        })
        .await
    }

    /// Return the worker to idle after finishing a job.
    pub async fn mark_worker_idle(&self, worker_id: &str) -> Result<(), QueueError> {
        self.update_worker_entry(worker_id, |entry| {
            entry.status = WorkerState::Idle;
            entry.current_job_id = None;
            entry.jobs_processed += 1;
            entry.last_ping = Utc::now();
        })
        .await
    }

    /// Workers that pinged within the live window.
    pub async fn active_workers(&self) -> Result<Vec<WorkerStatus>, QueueError> {
        let now = Utc::now();
        Ok(self
            .all_workers()
            .await?
            .into_iter()
            .filter(|worker| worker.is_live(now))
            .collect())
    }

    /// Remove entries silent past the stale window. Returns how many were
    /// evicted; any job they still held becomes an orphan for the reaper.
    pub async fn evict_stale_workers(&self) -> Result<usize, QueueError> {
        let now = Utc::now();
        let stale: Vec<WorkerStatus> = self
            .all_workers()
            .await?
            .into_iter()
            .filter(|worker| worker.is_stale(now))
            .collect();

        let mut conn = self.conn.clone();
        for worker in &stale {
            let _: () = conn.hdel(WORKERS_KEY, &worker.worker_id).await?;
            info!(worker_id = %worker.worker_id, "Evicted stale worker");
        }
        Ok(stale.len())
    }

    async fn all_workers(&self) -> Result<Vec<WorkerStatus>, QueueError> {
        let mut conn = self.conn.clone();
        let entries: HashMap<String, String> = conn.hgetall(WORKERS_KEY).await?;

        let mut workers = Vec::with_capacity(entries.len());
        for (worker_id, raw) in entries {
            match serde_json::from_str::<WorkerStatus>(&raw) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    warn!(worker_id = %worker_id, error = %e, "Discarding malformed worker entry");
                }
            }
        }
        Ok(workers)
    }

    async fn write_worker_entry(&self, entry: &WorkerStatus) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(WORKERS_KEY, &entry.worker_id, serde_json::to_string(entry)?)
            .await?;
        Ok(())
    }

    /// Read-modify-write one registry entry, starting from a fresh idle
    /// entry when none exists.
    pub(crate) async fn update_worker_entry(
        &self,
        worker_id: &str,
        apply: impl FnOnce(&mut WorkerStatus),
    ) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(WORKERS_KEY, worker_id).await?;

        let mut entry = match raw {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|_| WorkerStatus::idle(worker_id)),
            None => WorkerStatus::idle(worker_id),
        };
        apply(&mut entry);
        self.write_worker_entry(&entry).await
    }
}
