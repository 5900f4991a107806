//! Background collection scheduler.
//!
//! Builds one [`Collector`] for the life of the process so per-source rate
//! limiter windows span cycles, then registers a repeating job that runs a
//! full collection cycle every `update_interval_minutes`. A single in-flight
//! guard skips a tick while the previous cycle is still running, so cycles
//! never overlap. One cycle is kicked off immediately at startup so a fresh
//! deployment has data before the first scheduled tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pulse_collect::Collector;
use pulse_core::{AppConfig, Watchlist};
use sqlx::SqlitePool;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Builds and starts the scheduler with the recurring collection job.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns an error if the collector or scheduler cannot be initialised or
/// started.
pub async fn build_scheduler(
    pool: SqlitePool,
    config: Arc<AppConfig>,
    watchlist: Arc<Watchlist>,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let collector = Arc::new(Collector::new(&config)?);
    let running = Arc::new(AtomicBool::new(false));

    let interval = Duration::from_secs(config.update_interval_minutes * 60);
    let job = {
        let pool = pool.clone();
        let collector = Arc::clone(&collector);
        let config = Arc::clone(&config);
        let watchlist = Arc::clone(&watchlist);
        let running = Arc::clone(&running);

        Job::new_repeated_async(interval, move |_uuid, _lock| {
            let pool = pool.clone();
            let collector = Arc::clone(&collector);
            let config = Arc::clone(&config);
            let watchlist = Arc::clone(&watchlist);
            let running = Arc::clone(&running);

            Box::pin(async move {
                run_guarded_cycle(&pool, &collector, &config, &watchlist, &running).await;
            })
        })?
    };
    scheduler.add(job).await?;
    tracing::info!(
        interval_minutes = config.update_interval_minutes,
        "scheduler: registered collection cycle job"
    );

    // Initial cycle on startup, sharing the same overlap guard.
    tokio::spawn(async move {
        run_guarded_cycle(&pool, &collector, &config, &watchlist, &running).await;
    });

    scheduler.start().await?;
    Ok(scheduler)
}

/// Run one collection cycle unless another is already in flight. Returns
/// whether a cycle actually ran.
///
/// Failures are logged rather than propagated so one broken cycle does not
/// take the scheduler down.
async fn run_guarded_cycle(
    pool: &SqlitePool,
    collector: &Collector,
    config: &AppConfig,
    watchlist: &Watchlist,
    running: &AtomicBool,
) -> bool {
    if running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        tracing::warn!("scheduler: previous collection cycle still running, skipping this tick");
        return false;
    }

    match collector.run_cycle(pool, config, watchlist).await {
        Ok(report) => {
            tracing::info!(
                cycle_id = %report.public_id,
                status = %report.status,
                fetched = report.fetched,
                inserted = report.inserted,
                updated = report.updated,
                deduplicated = report.deduplicated,
                evicted = report.evicted,
                trends = report.trends,
                "scheduler: collection cycle finished"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: collection cycle failed");
        }
    }

    running.store(false, Ordering::SeqCst);
    true
}
