// Per-map statistics as stored in the play-count table and the aggregate cache.

use serde::{Deserialize, Serialize};

/// One row of the play-count table (`name | count`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayCount {
    pub map_name: String,
    pub count: u64,
}

/// One row of the aggregate cache (`name | mean_playtime | mean_player_change`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapAverage {
    pub map_name: String,
    pub avg_playtime: f64,
    pub avg_player_change: f64,
}

/// Server-level summary served by `GET /{server}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub name: String,
    pub monitoring_since: String,
    pub last_cache_update: String,
    pub maps_tracked: usize,
    pub player_sample: Vec<String>,
}

/// Current session served by `GET /{server}/current_map`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentMap {
    pub current_map: String,
    pub game_time: u64,
    pub event: bool,
}

/// Per-map view served by `GET /{server}/maps/{map}`. Zeroed averages when not cached yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapStats {
    pub server_name: String,
    pub map_name: String,
    pub found_in_cache: bool,
    pub playcount: u64,
    pub map_avg_playtime: f64,
    pub map_avg_playercount_change: f64,
}
