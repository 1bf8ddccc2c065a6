// Shared test helpers: scripted status sources and tracker config.
#![allow(dead_code)]

use mapmonitor::config::{MotdFormat, QueryErrorPolicy};
use mapmonitor::models::ServerStatus;
use mapmonitor::status_repo::{StatusError, StatusSource};
use mapmonitor::tracker::TrackerConfig;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Description whose second line carries `map` in the default MOTD layout.
pub fn describe(map: &str) -> String {
    format!("§6§lTest Network\n§7» §b{map} §7«")
}

pub fn status(map: &str, players: &[&str]) -> ServerStatus {
    ServerStatus {
        description: describe(map),
        players_online: players.len() as u32,
        player_sample: players.iter().map(|p| p.to_string()).collect(),
    }
}

/// Status with a player count but no sample (large servers often hide it).
pub fn status_count(map: &str, players_online: u32) -> ServerStatus {
    ServerStatus {
        description: describe(map),
        players_online,
        player_sample: vec![],
    }
}

pub fn tracker_config(poll_interval_secs: u32) -> TrackerConfig {
    TrackerConfig {
        poll_interval_secs,
        query_error_policy: QueryErrorPolicy::Transition,
        event_marker: "§".into(),
        motd: MotdFormat::default(),
    }
}

/// Answers polls from a script; `None` entries fail. Counts queries.
pub struct ScriptedSource {
    polls: Mutex<VecDeque<Option<ServerStatus>>>,
    pub queries: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(polls: Vec<Option<ServerStatus>>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl StatusSource for ScriptedSource {
    fn status(&self) -> impl Future<Output = Result<ServerStatus, StatusError>> + Send {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let next = self.polls.lock().unwrap().pop_front().flatten();
        std::future::ready(next.ok_or_else(|| StatusError::Protocol("scripted failure".into())))
    }
}

/// Cycles through `maps`, one per query, forever.
pub struct CyclingSource {
    maps: Vec<String>,
    calls: AtomicUsize,
}

impl CyclingSource {
    pub fn new(maps: &[&str]) -> Self {
        Self {
            maps: maps.iter().map(|m| m.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl StatusSource for CyclingSource {
    fn status(&self) -> impl Future<Output = Result<ServerStatus, StatusError>> + Send {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        let map = &self.maps[i % self.maps.len()];
        std::future::ready(Ok(status(map, &["alice", "bob"])))
    }
}
