use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use common::execution::{ExecutionRequest, ExecutionResult};
use common::worker::WorkerState;

use crate::config::QueueConfig;
use crate::error::QueueError;

/// FIFO list carrying judge jobs, head at the right.
pub const JOBS_KEY: &str = "execution:jobs";
/// Pub/sub channel fanning out execution results.
pub const RESULTS_CHANNEL: &str = "execution:results";
/// Hash of leased jobs awaiting results, keyed by job id.
pub const INFLIGHT_KEY: &str = "execution:inflight";

/// Per-subscriber buffer; results beyond this are dropped for that subscriber.
pub const RESULT_BUFFER_SIZE: usize = 10;

/// A job handed to a worker but not yet resolved by a result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobLease {
    pub request: ExecutionRequest,
    pub worker_id: String,
    pub leased_at: DateTime<Utc>,
}

impl JobLease {
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        (now - self.leased_at).num_seconds() >= timeout.as_secs() as i64
    }
}

/// The shared execution queue: job FIFO, result fan-out, and worker registry
/// over one Redis broker.
pub struct ExecutionQueue {
    pub(crate) client: redis::Client,
    pub(crate) conn: ConnectionManager,
}

impl ExecutionQueue {
    pub async fn connect(config: &QueueConfig) -> Result<Self, QueueError> {
        let client = redis::Client::open(config.url().as_str())?;
        let conn = client.get_connection_manager().await?;
        info!(addr = %config.addr, db = config.db, "Connected to broker");
        Ok(Self { client, conn })
    }

    /// Push a job onto the tail of the jobs channel.
    pub async fn enqueue(&self, request: &ExecutionRequest) -> Result<(), QueueError> {
        let payload = serde_json::to_string(request)?;
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(JOBS_KEY, payload).await?;
        info!(
            job_id = %request.job_id,
            submission_id = request.submission_id,
            "Queued execution job"
        );
        Ok(())
    }

    /// Block up to `timeout` for a job. On success the job is leased to
    /// `worker_id` and the worker is marked busy; on timeout the worker is
    /// left idle and `None` is returned.
    ///
    /// Blocking pops run on a dedicated connection so they cannot starve
    /// heartbeats and registry writes sharing the managed connection.
    pub async fn dequeue(
        &self,
        worker_id: &str,
        timeout: Duration,
    ) -> Result<Option<ExecutionRequest>, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let popped: Option<(String, String)> = conn.brpop(JOBS_KEY, timeout.as_secs_f64()).await?;

        let Some((_, payload)) = popped else {
            return Ok(None);
        };
        let request: ExecutionRequest = serde_json::from_str(&payload)?;

        let lease = JobLease {
            request: request.clone(),
            worker_id: worker_id.to_string(),
            leased_at: Utc::now(),
        };
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(INFLIGHT_KEY, &request.job_id, serde_json::to_string(&lease)?)
            .await?;

        self.update_worker_entry(worker_id, |entry| {
            entry.status = WorkerState::Busy;
            entry.current_job_id = Some(request.job_id.clone());
            entry.last_ping = Utc::now();
        })
        .await?;

        debug!(job_id = %request.job_id, worker_id, "Leased execution job");
        Ok(Some(request))
    }

    /// Deliver a result to every live subscriber.
    pub async fn publish_result(&self, result: &ExecutionResult) -> Result<(), QueueError> {
        let payload = serde_json::to_string(result)?;
        let mut conn = self.conn.clone();
        let _: () = conn.publish(RESULTS_CHANNEL, payload).await?;
        Ok(())
    }

    /// Clear the in-flight lease once a job's result has been published.
    pub async fn complete_job(&self, job_id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(INFLIGHT_KEY, job_id).await?;
        Ok(())
    }

    /// Subscribe to the results channel.
    ///
    /// Returns a bounded, non-restartable stream. A subscriber that falls
    /// behind loses the newest results (logged) rather than blocking the
    /// producer side.
    pub async fn subscribe_results(
        &self,
    ) -> Result<mpsc::Receiver<ExecutionResult>, QueueError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(RESULTS_CHANNEL).await?;

        let (tx, rx) = mpsc::channel(RESULT_BUFFER_SIZE);

        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Failed to read result payload");
                        continue;
                    }
                };
                let result: ExecutionResult = match serde_json::from_str(&payload) {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(error = %e, "Discarding malformed execution result");
                        continue;
                    }
                };
                match tx.try_send(result) {
                    Ok(()) => {}
                    Err(TrySendError::Full(dropped)) => {
                        warn!(job_id = %dropped.job_id, "Result buffer full, dropping result");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
            debug!("Result subscription closed");
        });

        Ok(rx)
    }

    /// Number of jobs waiting in the FIFO.
    pub async fn queue_len(&self) -> Result<i64, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(JOBS_KEY).await?)
    }

    /// All current job leases.
    pub async fn job_leases(&self) -> Result<Vec<JobLease>, QueueError> {
        let mut conn = self.conn.clone();
        let entries: HashMap<String, String> = conn.hgetall(INFLIGHT_KEY).await?;

        let mut leases = Vec::with_capacity(entries.len());
        for (job_id, raw) in entries {
            match serde_json::from_str::<JobLease>(&raw) {
                Ok(lease) => leases.push(lease),
                Err(e) => warn!(job_id = %job_id, error = %e, "Discarding malformed job lease"),
            }
        }
        Ok(leases)
    }

    /// Surface leased jobs whose result never arrived within `timeout` as
    /// platform failures, publishing through the normal results channel.
    /// Returns the number of jobs reaped.
    pub async fn reap_expired_jobs(&self, timeout: Duration) -> Result<usize, QueueError> {
        let now = Utc::now();
        let expired: Vec<JobLease> = self
            .job_leases()
            .await?
            .into_iter()
            .filter(|lease| lease.is_expired(now, timeout))
            .collect();

        for lease in &expired {
            error!(
                job_id = %lease.request.job_id,
                submission_id = lease.request.submission_id,
                worker_id = %lease.worker_id,
                "Job lease expired, reaping as judgement failure"
            );
            let result = ExecutionResult::judgement_failed(
                lease.request.job_id.clone(),
                lease.request.submission_id,
                format!(
                    "Judging timed out after {}s on worker {}",
                    timeout.as_secs(),
                    lease.worker_id
                ),
            );
            self.publish_result(&result).await?;
            self.complete_job(&lease.request.job_id).await?;
        }

        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::contest::Language;

    fn lease_aged(secs: i64) -> JobLease {
        JobLease {
            request: ExecutionRequest::new(
                1,
                1,
                1,
                1,
                "int main() {}".into(),
                Language::Cpp,
                vec![],
                1000,
                256,
            ),
            worker_id: "worker-1".into(),
            leased_at: Utc::now() - chrono::Duration::seconds(secs),
        }
    }

    #[test]
    fn test_lease_expiry() {
        let now = Utc::now();
        let timeout = Duration::from_secs(300);

        assert!(!lease_aged(10).is_expired(now, timeout));
        assert!(!lease_aged(299).is_expired(now, timeout));
        assert!(lease_aged(301).is_expired(now, timeout));
    }

    #[test]
    fn test_lease_roundtrip() {
        let lease = lease_aged(0);
        let json = serde_json::to_string(&lease).unwrap();
        let parsed: JobLease = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request.job_id, lease.request.job_id);
        assert_eq!(parsed.worker_id, "worker-1");
    }
}
