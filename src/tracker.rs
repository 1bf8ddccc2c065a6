// Session tracker: turns a stream of status polls into finished matches and live snapshots.
// Driven once per second by the monitor loop; after a query it sits out `poll_interval_secs` calls.

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::config::{MotdFormat, QueryErrorPolicy};
use crate::models::map_id::{BOOTSTRAP, QUERY_ERROR};
use crate::models::{Match, Snapshot, TimedSnapshot};
use crate::status_repo::{StatusSource, motd};

/// Per-server tracking options.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval_secs: u32,
    pub query_error_policy: QueryErrorPolicy,
    pub event_marker: String,
    pub motd: MotdFormat,
}

/// Tracker state for one monitored server.
pub struct SessionTracker {
    config: TrackerConfig,
    prev_map: String,
    start_time: DateTime<Local>,
    /// Polls observed on the open session after the one that opened it.
    session_ticks: u64,
    start_players: u32,
    countdown: u32,
    is_event: bool,
    pending_match: Option<Match>,
    pending_timed: Option<TimedSnapshot>,
}

impl SessionTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self::new_at(config, Local::now())
    }

    pub fn new_at(config: TrackerConfig, now: DateTime<Local>) -> Self {
        Self {
            config,
            prev_map: BOOTSTRAP.to_string(),
            start_time: now,
            session_ticks: 0,
            start_players: 0,
            countdown: 0,
            is_event: false,
            pending_match: None,
            pending_timed: None,
        }
    }

    pub async fn advance<S: StatusSource>(&mut self, source: &S) {
        self.advance_at(source, Local::now()).await;
    }

    /// One tick of the tracker at wall-clock `now`.
    pub async fn advance_at<S: StatusSource>(&mut self, source: &S, now: DateTime<Local>) {
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }
        self.countdown = self.config.poll_interval_secs;

        let polled = self.poll(source, now).await;
        self.observe(polled);
    }

    async fn poll<S: StatusSource>(&self, source: &S, now: DateTime<Local>) -> Poll {
        debug!(session_ticks = self.session_ticks, "querying server");
        let result = source.status().await.and_then(|status| {
            let map_name = motd::extract_map_name(&status.description, &self.config.motd)?;
            Ok(Snapshot {
                map_name,
                players_online: status.players_online,
                player_sample: status.player_sample,
                captured_at: now,
            })
        });
        match result {
            Ok(snapshot) => Poll {
                snapshot,
                failed: false,
            },
            Err(e) => {
                warn!(error = %e, operation = "status", "unable to query server");
                Poll {
                    snapshot: Snapshot {
                        map_name: QUERY_ERROR.to_string(),
                        players_online: 0,
                        player_sample: Vec::new(),
                        captured_at: now,
                    },
                    failed: true,
                }
            }
        }
    }

    fn observe(&mut self, polled: Poll) {
        let Poll { snapshot, failed } = polled;
        let poll_interval = u64::from(self.config.poll_interval_secs);

        self.pending_timed = Some(TimedSnapshot {
            online_players: snapshot.player_sample,
            player_count: snapshot.players_online,
            game_time: self.session_ticks * poll_interval,
        });

        let held = failed && self.config.query_error_policy == QueryErrorPolicy::Hold;
        if held || snapshot.map_name == self.prev_map {
            self.session_ticks += 1;
            return;
        }

        let entering_event = snapshot.map_name.contains(self.config.event_marker.as_str());
        if entering_event {
            self.is_event = true;
        }

        let finished = Match {
            start_time: self.start_time,
            playtime: self.session_ticks * poll_interval,
            map_name: std::mem::replace(&mut self.prev_map, snapshot.map_name),
            start_players: self.start_players,
            end_players: snapshot.players_online,
            is_event: self.is_event,
        };
        info!(
            finished = %finished.map_name,
            started = %self.prev_map,
            playtime = finished.playtime,
            player_change = finished.player_change(),
            is_event = finished.is_event,
            "new map detected"
        );

        if !entering_event {
            self.is_event = false;
        }
        self.start_time = snapshot.captured_at;
        self.start_players = snapshot.players_online;
        self.session_ticks = 0;
        self.pending_match = Some(finished);
    }

    /// Claims the match closed by the latest transition, if not claimed yet.
    pub fn take_match(&mut self) -> Option<Match> {
        self.pending_match.take()
    }

    /// Claims the snapshot produced by the latest poll, if not claimed yet.
    pub fn take_timed(&mut self) -> Option<TimedSnapshot> {
        self.pending_timed.take()
    }

    /// Map of the session that is currently open.
    pub fn active_map(&self) -> &str {
        &self.prev_map
    }

    pub fn is_event(&self) -> bool {
        self.is_event
    }
}

struct Poll {
    snapshot: Snapshot,
    failed: bool,
}
