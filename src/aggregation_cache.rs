// Aggregate cache: per-map mean playtime and mean player change, recomputed from the
// whole history log on a coarse cooldown. Every pass starts from empty accumulators.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{info, instrument};

use crate::history_repo::HistoryRepo;
use crate::history_repo::aggregation::Aggregates;
use crate::models::MapAverage;

pub struct AggregationCache {
    repo: Arc<HistoryRepo>,
    cooldown_ticks: u64,
    cooldown: u64,
}

impl AggregationCache {
    /// The first tick recomputes right away; afterwards once every `cooldown_ticks + 1` ticks.
    pub fn new(repo: Arc<HistoryRepo>, cooldown_ticks: u64) -> Self {
        Self {
            repo,
            cooldown_ticks,
            cooldown: 0,
        }
    }

    pub fn cooldown_ticks(&self) -> u64 {
        self.cooldown_ticks
    }

    /// Advances the cooldown and recomputes when due. Returns whether a recompute ran.
    /// Blocking file I/O: call from a blocking context.
    pub fn tick(&mut self) -> anyhow::Result<bool> {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return Ok(false);
        }
        self.cooldown = self.cooldown_ticks;
        recompute(&self.repo, Local::now())?;
        Ok(true)
    }
}

/// Full recompute: stream the history log, average per map, replace the cache file.
#[instrument(skip(repo, now), fields(server = %repo.server(), operation = "recompute_cache"))]
pub fn recompute(repo: &HistoryRepo, now: DateTime<Local>) -> anyhow::Result<Vec<MapAverage>> {
    let mut acc = Aggregates::default();
    let history_lines = repo.fold_history(|entry| acc.add(&entry))?;
    let averages = acc.averages();
    repo.write_cache(&averages, now)?;
    info!(history_lines, maps = averages.len(), "map averages recomputed");
    Ok(averages)
}
