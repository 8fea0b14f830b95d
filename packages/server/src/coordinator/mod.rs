//! Contest coordinator.
//!
//! Owns the in-memory registry of active contests, dispatches submissions
//! onto the execution queue, ingests verdicts, and fans leaderboard updates
//! out to subscribers. Durable state stays in the persistence gateway; the
//! registry is rebuilt from it on restart (`rehydrate`).

pub mod agents;
pub mod scoring;

pub use agents::AgentLifecycle;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, error, info, warn};

use common::execution::{ExecutionRequest, ExecutionResult, TestCaseData};
use common::{ContestState, SubmissionStatus};
use queue::ExecutionQueue;

use crate::entity::submission;
use crate::models::leaderboard::LeaderboardRow;
use crate::store;

/// Per-subscriber buffer for leaderboard updates; a lagging subscriber
/// loses updates rather than blocking the broadcast.
pub const LEADERBOARD_BUFFER_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Maximum concurrent contests ({0}) reached")]
    CapacityReached(usize),

    #[error("Contest {0} is not active")]
    ContestNotActive(i32),

    #[error("Contest {0} not found")]
    ContestNotFound(i32),

    #[error("Submission {0} not found")]
    SubmissionNotFound(i32),

    #[error("Problem {0} not found")]
    ProblemNotFound(i32),

    #[error("Participant {0} not found")]
    ParticipantNotFound(i32),

    #[error("No problem result for participant {participant_id} and problem {problem_id}")]
    ProblemResultMissing {
        participant_id: i32,
        problem_id: i32,
    },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),
}

/// One leaderboard snapshot pushed to subscribers.
#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardUpdate {
    pub contest_id: i32,
    pub participants: Vec<LeaderboardRow>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory state of one admitted contest. Immutable apart from the stop
/// signal; everything else is re-read through the store.
struct ContestInstance {
    started_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    stop: watch::Sender<bool>,
    /// participant id -> agent id, for lifecycle coordination on stop.
    agent_ids: HashMap<i32, String>,
}

#[derive(Default)]
struct Registry {
    active: HashMap<i32, ContestInstance>,
    subscribers: HashMap<i32, Vec<mpsc::Sender<LeaderboardUpdate>>>,
}

pub struct ContestCoordinator {
    db: DatabaseConnection,
    queue: Arc<ExecutionQueue>,
    max_concurrent_contests: usize,
    registry: RwLock<Registry>,
    agents: Option<Arc<dyn AgentLifecycle>>,
}

impl ContestCoordinator {
    /// Build the coordinator, take the shared results subscription, and
    /// launch the verdict ingestion loop. That loop is the sole mutator of
    /// ranking state.
    pub async fn start(
        db: DatabaseConnection,
        queue: Arc<ExecutionQueue>,
        max_concurrent_contests: usize,
        agents: Option<Arc<dyn AgentLifecycle>>,
    ) -> Result<Arc<Self>, CoordinatorError> {
        let results = queue.subscribe_results().await?;

        let coordinator = Arc::new(Self {
            db,
            queue,
            max_concurrent_contests,
            registry: RwLock::new(Registry::default()),
            agents,
        });
        coordinator.spawn_verdict_loop(results);
        Ok(coordinator)
    }

    pub async fn is_active(&self, contest_id: i32) -> bool {
        self.registry.read().await.active.contains_key(&contest_id)
    }

    pub async fn active_contest_count(&self) -> usize {
        self.registry.read().await.active.len()
    }

    /// Admit a contest into the registry and launch its timer.
    pub async fn start_contest(
        self: &Arc<Self>,
        contest_id: i32,
        agent_ids: HashMap<i32, String>,
    ) -> Result<(), CoordinatorError> {
        let ends_at;
        let stop_rx;
        {
            let mut registry = self.registry.write().await;
            if registry.active.contains_key(&contest_id) {
                warn!(contest_id, "Contest already active, ignoring re-admission");
                return Ok(());
            }
            if registry.active.len() >= self.max_concurrent_contests {
                return Err(CoordinatorError::CapacityReached(
                    self.max_concurrent_contests,
                ));
            }

            let contest = store::contests::get_contest_row(&self.db, contest_id)
                .await?
                .ok_or(CoordinatorError::ContestNotFound(contest_id))?;

            let (stop_tx, rx) = watch::channel(false);
            ends_at = contest.ends_at;
            stop_rx = rx;
            registry.active.insert(
                contest_id,
                ContestInstance {
                    started_at: contest.started_at,
                    ends_at: contest.ends_at,
                    stop: stop_tx,
                    agent_ids,
                },
            );
        }

        // The initial snapshot must go out; roll the admission back if it
        // cannot.
        if let Err(e) = self.broadcast_leaderboard(contest_id).await {
            self.registry.write().await.active.remove(&contest_id);
            return Err(e);
        }

        self.spawn_timer(contest_id, ends_at, stop_rx);
        info!(contest_id, %ends_at, "Contest started");
        Ok(())
    }

    /// Stop a contest: signal, persist the terminal state, fail whatever is
    /// still queued, send the final leaderboard, drop the instance, and
    /// notify the agent collaborator last.
    ///
    /// Idempotent: stopping an already-finished contest is a no-op.
    pub async fn stop_contest(&self, contest_id: i32) -> Result<(), CoordinatorError> {
        let agent_ids = {
            let registry = self.registry.read().await;
            match registry.active.get(&contest_id) {
                Some(instance) => {
                    let _ = instance.stop.send(true);
                    Some(instance.agent_ids.clone())
                }
                None => None,
            }
        };

        let Some(agent_ids) = agent_ids else {
            let contest = store::contests::get_contest_row(&self.db, contest_id)
                .await?
                .ok_or(CoordinatorError::ContestNotFound(contest_id))?;
            if !contest.state.is_finished() {
                return Err(CoordinatorError::ContestNotActive(contest_id));
            }
            return Ok(());
        };

        // Persistence and broadcast tolerate individual failure; removal
        // from the registry must happen regardless.
        if let Err(e) =
            store::contests::update_contest_state(&self.db, contest_id, ContestState::Finished)
                .await
        {
            error!(contest_id, error = %e, "Failed to persist finished state");
        }
        match store::submissions::cancel_pending_submissions(&self.db, contest_id).await {
            Ok(cancelled) if cancelled > 0 => {
                info!(contest_id, cancelled, "Cancelled pending submissions");
            }
            Ok(_) => {}
            Err(e) => error!(contest_id, error = %e, "Failed to cancel pending submissions"),
        }
        if let Err(e) = self.broadcast_leaderboard(contest_id).await {
            error!(contest_id, error = %e, "Failed to broadcast final leaderboard");
        }

        {
            let mut registry = self.registry.write().await;
            registry.active.remove(&contest_id);
            // Dropping the senders closes every subscriber stream.
            registry.subscribers.remove(&contest_id);
        }

        if let Some(agents) = &self.agents {
            for (participant_id, agent_id) in &agent_ids {
                if let Err(e) = agents.stop_agent(agent_id, "Contest ended").await {
                    warn!(
                        contest_id,
                        participant_id,
                        agent_id = %agent_id,
                        error = %e,
                        "Failed to stop agent"
                    );
                }
            }
        }

        info!(contest_id, "Contest stopped");
        Ok(())
    }

    /// Dispatch a persisted submission onto the execution queue.
    pub async fn process_submission(&self, submission_id: i32) -> Result<(), CoordinatorError> {
        let submission = store::submissions::get_submission(&self.db, submission_id)
            .await?
            .ok_or(CoordinatorError::SubmissionNotFound(submission_id))?;

        if !self.is_active(submission.contest_id).await {
            return Err(CoordinatorError::ContestNotActive(submission.contest_id));
        }

        let problem = store::problems::get_problem(&self.db, submission.problem_id)
            .await?
            .ok_or(CoordinatorError::ProblemNotFound(submission.problem_id))?;
        let test_cases: Vec<TestCaseData> =
            store::problems::get_test_cases_by_problem(&self.db, submission.problem_id)
                .await?
                .into_iter()
                .map(|tc| TestCaseData {
                    input: tc.input,
                    expected_output: tc.expected_output,
                    test_order: tc.test_order,
                })
                .collect();

        let request = ExecutionRequest::new(
            submission.id,
            submission.contest_id,
            submission.participant_id,
            submission.problem_id,
            submission.code.clone(),
            submission.language,
            test_cases,
            problem.time_limit_ms,
            problem.memory_limit_mb,
        );

        store::submissions::update_submission_status(
            &self.db,
            submission.id,
            SubmissionStatus::Pending,
            "Queued for execution",
        )
        .await?;

        if let Err(e) = self.queue.enqueue(&request).await {
            if let Err(mark) = store::submissions::update_submission_status(
                &self.db,
                submission.id,
                SubmissionStatus::JudgementFailed,
                "Failed to queue for execution",
            )
            .await
            {
                error!(
                    submission_id,
                    error = %mark,
                    "Failed to mark submission as judgement failure"
                );
            }
            return Err(e.into());
        }

        info!(
            submission_id,
            job_id = %request.job_id,
            contest_id = submission.contest_id,
            "Submission queued for execution"
        );
        Ok(())
    }

    /// Open a leaderboard subscription for an active contest. The stream
    /// closes when the contest stops.
    pub async fn subscribe_leaderboard(
        &self,
        contest_id: i32,
    ) -> Result<mpsc::Receiver<LeaderboardUpdate>, CoordinatorError> {
        let mut registry = self.registry.write().await;
        if !registry.active.contains_key(&contest_id) {
            return Err(CoordinatorError::ContestNotActive(contest_id));
        }
        let (tx, rx) = mpsc::channel(LEADERBOARD_BUFFER_SIZE);
        registry.subscribers.entry(contest_id).or_default().push(tx);
        Ok(rx)
    }

    /// Re-admit contests persisted as RUNNING after a restart. Contests
    /// already past their end are finished instead of admitted.
    pub async fn rehydrate(self: &Arc<Self>) -> Result<usize, CoordinatorError> {
        let running = store::contests::get_running_contests(&self.db).await?;
        let mut restored = 0;

        for contest in running {
            if Utc::now() >= contest.ends_at {
                info!(
                    contest_id = contest.id,
                    "Persisted contest already past its end, finishing"
                );
                if let Err(e) = store::contests::update_contest_state(
                    &self.db,
                    contest.id,
                    ContestState::Finished,
                )
                .await
                {
                    error!(contest_id = contest.id, error = %e, "Failed to finish expired contest");
                }
                if let Err(e) =
                    store::submissions::cancel_pending_submissions(&self.db, contest.id).await
                {
                    error!(contest_id = contest.id, error = %e, "Failed to cancel pending submissions");
                }
                continue;
            }

            let stop_rx;
            {
                let mut registry = self.registry.write().await;
                if registry.active.len() >= self.max_concurrent_contests {
                    warn!(
                        contest_id = contest.id,
                        "Rehydrating past the concurrency bound"
                    );
                }
                let (stop_tx, rx) = watch::channel(false);
                stop_rx = rx;
                registry.active.insert(
                    contest.id,
                    ContestInstance {
                        started_at: contest.started_at,
                        ends_at: contest.ends_at,
                        stop: stop_tx,
                        // Agent assignments are not persisted; rehydrated
                        // contests run without lifecycle coordination.
                        agent_ids: HashMap::new(),
                    },
                );
            }
            self.spawn_timer(contest.id, contest.ends_at, stop_rx);
            info!(contest_id = contest.id, ends_at = %contest.ends_at, "Rehydrated running contest");
            restored += 1;
        }

        Ok(restored)
    }

    /// Stop every active contest. Pending submissions become judgement
    /// failures through the normal stop path.
    pub async fn shutdown(&self) {
        let ids: Vec<i32> = self.registry.read().await.active.keys().copied().collect();
        for contest_id in ids {
            if let Err(e) = self.stop_contest(contest_id).await {
                warn!(contest_id, error = %e, "Failed to stop contest during shutdown");
            }
        }
    }

    /// Build the current leaderboard and push it to every subscriber of the
    /// contest, dropping updates for subscribers whose buffer is full.
    pub async fn broadcast_leaderboard(&self, contest_id: i32) -> Result<(), CoordinatorError> {
        let mut participants =
            store::participants::get_participants_by_contest(&self.db, contest_id).await?;
        scoring::order_participants(&mut participants);

        let update = LeaderboardUpdate {
            contest_id,
            participants: participants
                .iter()
                .enumerate()
                .map(|(i, p)| LeaderboardRow::ranked(p, i as i32 + 1))
                .collect(),
            updated_at: Utc::now(),
        };

        let senders = {
            let registry = self.registry.read().await;
            registry
                .subscribers
                .get(&contest_id)
                .cloned()
                .unwrap_or_default()
        };

        for sender in senders {
            match sender.try_send(update.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(contest_id, "Leaderboard subscriber lagging, dropping update");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }

        Ok(())
    }

    fn spawn_timer(
        self: &Arc<Self>,
        contest_id: i32,
        ends_at: DateTime<Utc>,
        mut stop: watch::Receiver<bool>,
    ) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(StdDuration::from_secs(1));
            loop {
                tokio::select! {
                    _ = stop.changed() => {
                        debug!(contest_id, "Contest timer stopped");
                        return;
                    }
                    _ = tick.tick() => {
                        if Utc::now() >= ends_at {
                            if let Err(e) = coordinator.stop_contest(contest_id).await {
                                warn!(contest_id, error = %e, "Timer failed to stop contest");
                            }
                            return;
                        }
                    }
                }
            }
        });
    }

    fn spawn_verdict_loop(self: &Arc<Self>, mut results: mpsc::Receiver<ExecutionResult>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            info!("Started verdict ingestion loop");
            while let Some(result) = results.recv().await {
                let submission_id = result.submission_id;
                let job_id = result.job_id.clone();
                if let Err(e) = coordinator.ingest_result(result).await {
                    error!(
                        submission_id,
                        job_id = %job_id,
                        error = %e,
                        "Failed to ingest execution result"
                    );
                }
            }
            info!("Verdict ingestion loop stopped");
        });
    }

    /// Apply one execution result: persist the verdict, then update ranking
    /// state if the owning contest is still live.
    async fn ingest_result(&self, result: ExecutionResult) -> Result<(), CoordinatorError> {
        info!(
            submission_id = result.submission_id,
            job_id = %result.job_id,
            status = %result.status,
            worker_id = %result.worker_id,
            "Received execution result"
        );

        // Results are delivered at least once; a submission that already
        // holds a terminal verdict has been fully processed.
        let existing = store::submissions::get_submission(&self.db, result.submission_id)
            .await?
            .ok_or(CoordinatorError::SubmissionNotFound(result.submission_id))?;
        if existing.status.is_terminal() {
            info!(
                submission_id = result.submission_id,
                status = %existing.status,
                "Submission already judged, skipping duplicate result"
            );
            return Ok(());
        }

        store::submissions::update_submission_status(
            &self.db,
            result.submission_id,
            result.status,
            &result.verdict_message,
        )
        .await?;
        if let Err(e) = store::submissions::update_submission_progress(
            &self.db,
            result.submission_id,
            result.total_test_cases,
            result.passed_test_cases,
        )
        .await
        {
            warn!(
                submission_id = result.submission_id,
                error = %e,
                "Failed to update test case progress"
            );
        }

        // Re-read to observe the authoritative record, submitted_at in
        // particular.
        let submission = store::submissions::get_submission(&self.db, result.submission_id)
            .await?
            .ok_or(CoordinatorError::SubmissionNotFound(result.submission_id))?;

        let contest = store::contests::get_contest_row(&self.db, submission.contest_id)
            .await?
            .ok_or(CoordinatorError::ContestNotFound(submission.contest_id))?;
        if contest.state.is_finished() {
            debug!(
                contest_id = submission.contest_id,
                submission_id = submission.id,
                "Contest finished, verdict persisted without ranking update"
            );
            return Ok(());
        }

        let started_at = {
            let registry = self.registry.read().await;
            match registry.active.get(&submission.contest_id) {
                Some(instance) => instance.started_at,
                None => {
                    debug!(
                        contest_id = submission.contest_id,
                        "Contest no longer active, skipping ranking update"
                    );
                    return Ok(());
                }
            }
        };

        // Accepted verdicts and counting failures both touch the scoring
        // record; judgement failures never do.
        if result.status.is_accepted() || result.status.counts_as_penalty() {
            self.update_participant_stats(&submission, result.status, started_at)
                .await?;
            self.broadcast_leaderboard(submission.contest_id).await?;
        }

        Ok(())
    }

    async fn update_participant_stats(
        &self,
        submission: &submission::Model,
        status: SubmissionStatus,
        contest_started_at: DateTime<Utc>,
    ) -> Result<(), CoordinatorError> {
        let data = store::participants::get_participant(&self.db, submission.participant_id)
            .await?
            .ok_or(CoordinatorError::ParticipantNotFound(
                submission.participant_id,
            ))?;

        let mut results = data.problem_results;
        let result = results
            .iter_mut()
            .find(|pr| pr.problem_id == submission.problem_id)
            .ok_or(CoordinatorError::ProblemResultMissing {
                participant_id: submission.participant_id,
                problem_id: submission.problem_id,
            })?;

        let elapsed = (submission.submitted_at - contest_started_at)
            .num_seconds()
            .clamp(0, i64::from(i32::MAX)) as i32;

        if scoring::apply_verdict(result, status.is_accepted(), elapsed) {
            store::results::upsert_problem_result(&self.db, result).await?;
        }

        let (solved, total_penalty_seconds) = scoring::aggregate_stats(&results);
        store::participants::update_participant_stats(
            &self.db,
            submission.participant_id,
            solved,
            total_penalty_seconds,
        )
        .await?;

        debug!(
            participant_id = submission.participant_id,
            solved, total_penalty_seconds, "Updated participant stats"
        );
        Ok(())
    }
}
