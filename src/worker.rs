// Per-server monitor loop: one tracker tick per interval tick, then persistence and cache upkeep.
// File I/O runs on the blocking pool; the status query is the only await on the hot path.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{Duration, interval};
use tracing::Instrument;

use crate::aggregation_cache::AggregationCache;
use crate::history_repo::HistoryRepo;
use crate::status_repo::StatusSource;
use crate::tracker::SessionTracker;

/// Tracker, source and stores owned by one monitor.
pub struct WorkerDeps<S> {
    pub source: S,
    pub tracker: SessionTracker,
    pub history_repo: Arc<HistoryRepo>,
    pub cache: AggregationCache,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Monitor timing. The tracker counts one tick as one second of playtime.
pub struct WorkerConfig {
    pub tick_interval_ms: u64,
    /// How often to log monitor counters (real seconds).
    pub stats_log_interval_secs: u64,
}

pub const TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Default)]
struct Counters {
    matches_recorded: u64,
    snapshots_recorded: u64,
    cache_recomputes: u64,
}

pub fn spawn<S>(deps: WorkerDeps<S>, config: WorkerConfig) -> tokio::task::JoinHandle<()>
where
    S: StatusSource + 'static,
{
    let span = tracing::info_span!("monitor", server = %deps.history_repo.server());
    tokio::spawn(run(deps, config).instrument(span))
}

async fn run<S: StatusSource>(deps: WorkerDeps<S>, config: WorkerConfig) {
    let WorkerDeps {
        source,
        mut tracker,
        history_repo,
        mut cache,
        mut shutdown_rx,
    } = deps;

    let mut tick = interval(Duration::from_millis(config.tick_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut stats_log_tick = interval(Duration::from_secs(config.stats_log_interval_secs));
    stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut counters = Counters::default();

    loop {
        tokio::select! {
            _ = tick.tick() => {
                tracker.advance(&source).await;
                let finished = tracker.take_match();
                let timed = tracker.take_timed();

                if finished.is_some() || timed.is_some() {
                    let repo = history_repo.clone();
                    let active = tracker.active_map().to_string();
                    let has_match = finished.is_some();
                    let has_timed = timed.is_some();
                    let result = tokio::task::spawn_blocking(move || {
                        (
                            repo.record_match(finished.as_ref(), &active),
                            repo.record_snapshot(timed.as_ref()),
                        )
                    })
                    .await;
                    match result {
                        Ok((recorded_match, recorded_snapshot)) => {
                            match recorded_match {
                                Ok(()) => counters.matches_recorded += u64::from(has_match),
                                Err(e) => {
                                    tracing::warn!(error = %e, operation = "record_match", "failed to persist match");
                                }
                            }
                            match recorded_snapshot {
                                Ok(()) => counters.snapshots_recorded += u64::from(has_timed),
                                Err(e) => {
                                    tracing::warn!(error = %e, operation = "record_snapshot", "failed to persist snapshot");
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "record", "persist task panicked");
                        }
                    }
                }

                let cooldown_ticks = cache.cooldown_ticks();
                let result = tokio::task::spawn_blocking(move || {
                    let ran = cache.tick();
                    (cache, ran)
                })
                .await;
                match result {
                    Ok((returned, ran)) => {
                        cache = returned;
                        match ran {
                            Ok(true) => counters.cache_recomputes += 1,
                            Ok(false) => {}
                            Err(e) => {
                                tracing::warn!(error = %e, operation = "recompute_cache", "cache recompute failed");
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, operation = "recompute_cache", "cache task panicked, restarting cooldown");
                        cache = AggregationCache::new(history_repo.clone(), cooldown_ticks);
                    }
                }
            }
            _ = stats_log_tick.tick() => {
                tracing::info!(
                    current_map = %tracker.active_map(),
                    matches_recorded = counters.matches_recorded,
                    snapshots_recorded = counters.snapshots_recorded,
                    cache_recomputes = counters.cache_recomputes,
                    "monitor stats"
                );
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::debug!("Monitor shutting down");
                    break;
                }
            }
        }
    }
}
