use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How often each worker refreshes its registry entry.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;

/// A worker is live if it pinged within this window.
pub const LIVE_WINDOW_SECS: i64 = 30;

/// A worker is stale (eligible for eviction) past this window.
pub const STALE_WINDOW_SECS: i64 = 120;

/// A leased job with no result after this long is reaped as a platform failure.
pub const JOB_TIMEOUT_SECS: i64 = 300;

/// Availability of a registered worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Busy,
}

/// Registry entry for one worker, stored in the `workers:status` hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub status: WorkerState,
    pub last_ping: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_job_id: Option<String>,
    #[serde(default)]
    pub jobs_processed: i64,
}

impl WorkerStatus {
    pub fn idle(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            status: WorkerState::Idle,
            last_ping: Utc::now(),
            current_job_id: None,
            jobs_processed: 0,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now - self.last_ping <= Duration::seconds(LIVE_WINDOW_SECS)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.last_ping > Duration::seconds(STALE_WINDOW_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_windows() {
        let now = Utc::now();
        let mut status = WorkerStatus::idle("worker-1");

        status.last_ping = now - Duration::seconds(10);
        assert!(status.is_live(now));
        assert!(!status.is_stale(now));

        status.last_ping = now - Duration::seconds(45);
        assert!(!status.is_live(now));
        assert!(!status.is_stale(now));

        status.last_ping = now - Duration::seconds(150);
        assert!(!status.is_live(now));
        assert!(status.is_stale(now));
    }

    #[test]
    fn test_registry_entry_roundtrip() {
        let mut status = WorkerStatus::idle("worker-host-abc123");
        status.status = WorkerState::Busy;
        status.current_job_id = Some("job-1".into());

        let json = serde_json::to_string(&status).unwrap();
        let parsed: WorkerStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.worker_id, "worker-host-abc123");
        assert_eq!(parsed.status, WorkerState::Busy);
        assert_eq!(parsed.current_job_id.as_deref(), Some("job-1"));
    }
}
