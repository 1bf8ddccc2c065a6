// Session models: one status poll, one finished match, one live snapshot of the open match.

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

/// Raw result of one status query, before the map identifier is extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStatus {
    /// Description (MOTD) flattened to legacy text, `§`-codes included.
    pub description: String,
    pub players_online: u32,
    pub player_sample: Vec<String>,
}

/// One poll after map extraction (or the sentinel substituted for a failed poll).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub map_name: String,
    pub players_online: u32,
    pub player_sample: Vec<String>,
    pub captured_at: DateTime<Local>,
}

/// A finished session on one map. Always names the map that just ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub start_time: DateTime<Local>,
    /// Whole seconds.
    pub playtime: u64,
    pub map_name: String,
    pub start_players: u32,
    pub end_players: u32,
    pub is_event: bool,
}

impl Match {
    pub fn end_time(&self) -> DateTime<Local> {
        self.start_time + Duration::seconds(self.playtime as i64)
    }

    pub fn player_change(&self) -> i64 {
        self.end_players as i64 - self.start_players as i64
    }
}

/// Live view of the session that is still open; overwrites the previous one on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedSnapshot {
    pub online_players: Vec<String>,
    pub player_count: u32,
    /// Seconds elapsed in the open session.
    pub game_time: u64,
}
