// Per-map averages over the full history log: pure accumulation logic.
// File access (read history, write cache) stays in history_repo::mod.

use std::collections::HashMap;

use super::lines::HistoryLine;
use crate::models::MapAverage;

/// Samples collected for one map during a single recompute pass.
#[derive(Debug, Clone, Default)]
pub struct MapAggregate {
    pub map_name: String,
    pub playtimes: Vec<u64>,
    pub player_changes: Vec<i64>,
}

impl MapAggregate {
    pub fn new(map_name: impl Into<String>) -> Self {
        Self {
            map_name: map_name.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, playtime: u64, player_change: i64) {
        self.playtimes.push(playtime);
        self.player_changes.push(player_change);
    }

    /// Means of both sample sets; `None` without samples.
    pub fn average(&self) -> Option<MapAverage> {
        Some(MapAverage {
            map_name: self.map_name.clone(),
            avg_playtime: mean_u64(&self.playtimes)?,
            avg_player_change: mean_i64(&self.player_changes)?,
        })
    }
}

/// One accumulator per map, in order of first appearance. Fed line by line while the
/// history log is streamed, dropped at the end of the pass.
#[derive(Debug, Default)]
pub struct Aggregates {
    index: HashMap<String, usize>,
    maps: Vec<MapAggregate>,
}

impl Aggregates {
    pub fn add(&mut self, line: &HistoryLine) {
        let i = match self.index.get(line.map_name.as_str()) {
            Some(&i) => i,
            None => {
                self.maps.push(MapAggregate::new(line.map_name.as_str()));
                self.index.insert(line.map_name.clone(), self.maps.len() - 1);
                self.maps.len() - 1
            }
        };
        self.maps[i].add(line.playtime, line.player_change);
    }

    /// Averages for every map with at least one sample.
    pub fn averages(&self) -> Vec<MapAverage> {
        self.maps.iter().filter_map(MapAggregate::average).collect()
    }
}

pub fn collect_aggregates<'a>(lines: impl IntoIterator<Item = &'a HistoryLine>) -> Aggregates {
    let mut acc = Aggregates::default();
    for line in lines {
        acc.add(line);
    }
    acc
}

pub fn compute_averages<'a>(lines: impl IntoIterator<Item = &'a HistoryLine>) -> Vec<MapAverage> {
    collect_aggregates(lines).averages()
}

fn mean_u64(values: &[u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: u128 = values.iter().map(|&v| v as u128).sum();
    Some(sum as f64 / values.len() as f64)
}

fn mean_i64(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i128 = values.iter().map(|&v| v as i128).sum();
    Some(sum as f64 / values.len() as f64)
}
