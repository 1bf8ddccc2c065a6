// File-backed history for one monitored server: `<save_dir>/<server name>/`.
// Append-only logs (map_history, player_history) plus small files that are replaced whole
// via temp-file + rename, so concurrent readers never see a half-written table.

pub mod aggregation;
mod files;
pub mod lines;

use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{instrument, warn};

use crate::models::map_id::{self, EVENT};
use crate::models::{
    CurrentMap, MapAverage, MapStats, Match, PlayCount, ServerSummary, TimedSnapshot,
};
use lines::HistoryLine;

pub const MAP_HISTORY: &str = "map_history";
pub const MAP_DATA: &str = "map_data";
pub const MAP_AVERAGE_CACHE: &str = "map_average_cache";
pub const ACTIVE_MAP: &str = "active_map";
pub const GAME_TIME: &str = "game_time";
pub const ONLINE: &str = "online";
pub const PLAYER_HISTORY: &str = "player_history";
pub const FIRST_WRITE: &str = "first_write";
pub const LAST_CACHE_TIME: &str = "last_cache_time";

const ALL_FILES: [&str; 8] = [
    MAP_HISTORY,
    MAP_DATA,
    MAP_AVERAGE_CACHE,
    ACTIVE_MAP,
    GAME_TIME,
    ONLINE,
    PLAYER_HISTORY,
    LAST_CACHE_TIME,
];

pub struct HistoryRepo {
    dir: PathBuf,
    server: String,
}

impl HistoryRepo {
    /// Opens (creating if needed) the directory and files for `server`. Safe to call repeatedly.
    pub fn open(save_dir: impl AsRef<Path>, server: &str) -> anyhow::Result<Self> {
        Self::open_at(save_dir, server, Local::now())
    }

    pub fn open_at(
        save_dir: impl AsRef<Path>,
        server: &str,
        now: DateTime<Local>,
    ) -> anyhow::Result<Self> {
        let repo = Self::at(save_dir, server);
        std::fs::create_dir_all(&repo.dir)?;
        for name in ALL_FILES {
            files::touch(&repo.path(name))?;
        }
        let first_write = repo.path(FIRST_WRITE);
        if !first_write.is_file() {
            files::replace(&first_write, &lines::timestamp_text(&now))?;
        }
        Ok(repo)
    }

    /// Read-only handle on an existing directory; `None` when nothing was recorded for `server`.
    pub fn existing(save_dir: impl AsRef<Path>, server: &str) -> Option<Self> {
        let repo = Self::at(save_dir, server);
        repo.dir.is_dir().then_some(repo)
    }

    fn at(save_dir: impl AsRef<Path>, server: &str) -> Self {
        Self {
            dir: save_dir.as_ref().join(server),
            server: server.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn read(&self, file: &str) -> anyhow::Result<String> {
        files::read_or_empty(&self.path(file))
    }

    /// Records a finished match. Event matches are redacted to the event sentinel and do not count as plays.
    #[instrument(skip(self, m), fields(repo = "history", server = %self.server, operation = "record_match"))]
    pub fn record_match(&self, m: Option<&Match>, active_map: &str) -> anyhow::Result<()> {
        let Some(m) = m else {
            return Ok(());
        };
        if m.is_event {
            files::append_line(
                &self.path(MAP_HISTORY),
                &lines::format_history_line(EVENT, m),
            )?;
            files::replace(&self.path(ACTIVE_MAP), EVENT)?;
            return Ok(());
        }
        files::append_line(
            &self.path(MAP_HISTORY),
            &lines::format_history_line(&m.map_name, m),
        )?;
        files::replace(&self.path(ACTIVE_MAP), active_map)?;
        self.increment_play_count(&m.map_name)
    }

    /// Read-modify-replace of the play-count table. Unparseable rows are carried over untouched.
    fn increment_play_count(&self, map_name: &str) -> anyhow::Result<()> {
        let data = self.read(MAP_DATA)?;
        let mut out = String::with_capacity(data.len() + map_name.len() + 8);
        let mut found = false;
        for (i, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match lines::parse_play_count(line) {
                Some(mut row) if row.map_name == map_name => {
                    row.count += 1;
                    found = true;
                    out.push_str(&lines::format_play_count(&row));
                }
                Some(row) => out.push_str(&lines::format_play_count(&row)),
                None => {
                    warn!(line_no = i + 1, line, "malformed play-count row kept as is");
                    out.push_str(line);
                }
            }
            out.push('\n');
        }
        if !found {
            out.push_str(&lines::format_play_count(&PlayCount {
                map_name: map_name.to_string(),
                count: 1,
            }));
            out.push('\n');
        }
        files::replace(&self.path(MAP_DATA), &out)
    }

    pub fn record_snapshot(&self, timed: Option<&TimedSnapshot>) -> anyhow::Result<()> {
        self.record_snapshot_at(timed, Local::now())
    }

    /// Replaces the online list and elapsed time, appends to the player history.
    #[instrument(skip(self, timed, now), fields(repo = "history", server = %self.server, operation = "record_snapshot"))]
    pub fn record_snapshot_at(
        &self,
        timed: Option<&TimedSnapshot>,
        now: DateTime<Local>,
    ) -> anyhow::Result<()> {
        let Some(timed) = timed else {
            return Ok(());
        };
        let mut online = String::new();
        for player in &timed.online_players {
            online.push_str(player);
            online.push('\n');
        }
        files::replace(&self.path(ONLINE), &online)?;
        files::append_line(
            &self.path(PLAYER_HISTORY),
            &lines::format_player_history(&now, timed.player_count, &timed.online_players),
        )?;
        files::replace(&self.path(GAME_TIME), &format!("{}\n", timed.game_time))
    }

    /// Streams the history log, handing every well-formed line to `f`. Malformed lines are
    /// logged and skipped. Returns how many lines were handed over.
    #[instrument(skip(self, f), fields(repo = "history", server = %self.server, operation = "fold_history"))]
    pub fn fold_history(&self, mut f: impl FnMut(HistoryLine)) -> anyhow::Result<usize> {
        let Some(reader) = files::open_reader(&self.path(MAP_HISTORY))? else {
            return Ok(0);
        };
        let mut parsed = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match lines::parse_history_line(&line) {
                Some(entry) => {
                    f(entry);
                    parsed += 1;
                }
                None => warn!(line_no = i + 1, line = %line, "skipping malformed history line"),
            }
        }
        Ok(parsed)
    }

    pub fn read_history(&self) -> anyhow::Result<Vec<HistoryLine>> {
        let mut out = Vec::new();
        self.fold_history(|entry| out.push(entry))?;
        Ok(out)
    }

    pub fn read_play_counts(&self) -> anyhow::Result<Vec<PlayCount>> {
        let data = self.read(MAP_DATA)?;
        Ok(data
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| {
                let row = lines::parse_play_count(l);
                if row.is_none() {
                    warn!(line = l, "skipping malformed play-count row");
                }
                row
            })
            .collect())
    }

    pub fn read_cache(&self) -> anyhow::Result<Vec<MapAverage>> {
        let data = self.read(MAP_AVERAGE_CACHE)?;
        Ok(data
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| {
                let row = lines::parse_map_average(l);
                if row.is_none() {
                    warn!(line = l, "skipping malformed cache row");
                }
                row
            })
            .collect())
    }

    /// Replaces the aggregate cache and stamps `last_cache_time`.
    #[instrument(skip(self, rows, now), fields(repo = "history", server = %self.server, operation = "write_cache", maps = rows.len()))]
    pub fn write_cache(&self, rows: &[MapAverage], now: DateTime<Local>) -> anyhow::Result<()> {
        let mut out = String::new();
        for row in rows {
            out.push_str(&lines::format_map_average(row));
            out.push('\n');
        }
        files::replace(&self.path(MAP_AVERAGE_CACHE), &out)?;
        files::replace(&self.path(LAST_CACHE_TIME), &lines::timestamp_text(&now))
    }

    pub fn load_players(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .read(ONLINE)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    pub fn load_server_summary(&self) -> anyhow::Result<ServerSummary> {
        let maps_tracked = self
            .read_play_counts()?
            .iter()
            .filter(|row| !map_id::is_sentinel(&row.map_name))
            .count();
        Ok(ServerSummary {
            name: self.server.clone(),
            monitoring_since: self.read(FIRST_WRITE)?.trim().to_string(),
            last_cache_update: self.read(LAST_CACHE_TIME)?.trim().to_string(),
            maps_tracked,
            player_sample: self.load_players()?,
        })
    }

    pub fn load_current_map(&self) -> anyhow::Result<CurrentMap> {
        let current_map = self.read(ACTIVE_MAP)?.trim().to_string();
        let raw_time = self.read(GAME_TIME)?;
        let raw_time = raw_time.trim();
        let game_time = if raw_time.is_empty() {
            0
        } else {
            raw_time.parse().unwrap_or_else(|_| {
                warn!(value = raw_time, "malformed game_time, reporting 0");
                0
            })
        };
        Ok(CurrentMap {
            event: current_map == EVENT,
            current_map,
            game_time,
        })
    }

    /// `None` when the map was never recorded in the play-count table.
    pub fn load_map_stats(&self, map_name: &str) -> anyhow::Result<Option<MapStats>> {
        let Some(played) = self
            .read_play_counts()?
            .into_iter()
            .find(|row| row.map_name == map_name)
        else {
            return Ok(None);
        };
        let cached = self
            .read_cache()?
            .into_iter()
            .find(|row| row.map_name == map_name);
        Ok(Some(MapStats {
            server_name: self.server.clone(),
            map_name: map_name.to_string(),
            found_in_cache: cached.is_some(),
            playcount: played.count,
            map_avg_playtime: cached.as_ref().map_or(0.0, |c| c.avg_playtime),
            map_avg_playercount_change: cached.as_ref().map_or(0.0, |c| c.avg_player_change),
        }))
    }
}
