use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use queue::ExecutionQueue;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::coordinator::ContestCoordinator;
use server::state::AppState;
use server::{build_router, database};

/// How often expired job leases are swept.
const REAPER_INTERVAL: Duration = Duration::from_secs(30);
/// How often silent workers are evicted from the registry.
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let db = database::init_db(&config.database, &config.logging)
        .await
        .context("Failed to connect to database")?;
    info!(
        host = %config.database.host,
        name = %config.database.name,
        "Database connected"
    );

    let exec_queue = Arc::new(
        ExecutionQueue::connect(&config.queue)
            .await
            .context("Failed to connect to broker")?,
    );

    let coordinator = ContestCoordinator::start(
        db.clone(),
        Arc::clone(&exec_queue),
        config.contest.max_concurrent_contests,
        None,
    )
    .await
    .context("Failed to start coordinator")?;

    match coordinator.rehydrate().await {
        Ok(0) => {}
        Ok(restored) => info!(restored, "Rehydrated running contests"),
        Err(e) => error!(error = %e, "Contest rehydration failed"),
    }

    spawn_job_reaper(
        Arc::clone(&exec_queue),
        Duration::from_secs(config.judging.job_timeout_seconds),
    );
    spawn_worker_eviction(Arc::clone(&exec_queue));

    let state = AppState {
        db,
        config: config.clone(),
        queue: exec_queue,
        coordinator: Arc::clone(&coordinator),
    };

    let app = build_router(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.http_port));
    info!(
        %addr,
        max_concurrent_contests = config.contest.max_concurrent_contests,
        contest_duration_seconds = config.contest.duration_seconds,
        "Contest server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(coordinator))
        .await?;

    Ok(())
}

/// Periodically surface leased jobs without results as judgement failures.
fn spawn_job_reaper(exec_queue: Arc<ExecutionQueue>, job_timeout: Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(REAPER_INTERVAL);
        loop {
            tick.tick().await;
            match exec_queue.reap_expired_jobs(job_timeout).await {
                Ok(0) => {}
                Ok(reaped) => warn!(reaped, "Reaped timed-out jobs"),
                Err(e) => error!(error = %e, "Job reaper sweep failed"),
            }
        }
    });
}

/// Periodically drop workers that stopped heartbeating.
fn spawn_worker_eviction(exec_queue: Arc<ExecutionQueue>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(EVICTION_INTERVAL);
        loop {
            tick.tick().await;
            match exec_queue.evict_stale_workers().await {
                Ok(0) => {}
                Ok(evicted) => info!(evicted, "Evicted stale workers"),
                Err(e) => error!(error = %e, "Worker eviction sweep failed"),
            }
        }
    });
}

async fn shutdown_signal(coordinator: Arc<ContestCoordinator>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received, stopping active contests");
    coordinator.shutdown().await;
}
