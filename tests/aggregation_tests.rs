// Aggregation tests: per-map means, full recompute, idempotence, cooldown gating

use chrono::{Local, TimeZone};
use mapmonitor::aggregation_cache::{self, AggregationCache};
use mapmonitor::history_repo::aggregation::{MapAggregate, compute_averages};
use mapmonitor::history_repo::lines::parse_history_line;
use mapmonitor::history_repo::{self, HistoryRepo};
use mapmonitor::models::Match;
use std::sync::Arc;
use tempfile::TempDir;

fn finished(map: &str, playtime: u64, start: u32, end: u32) -> Match {
    Match {
        start_time: Local.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap(),
        playtime,
        map_name: map.into(),
        start_players: start,
        end_players: end,
        is_event: false,
    }
}

fn repo_with(matches: &[Match]) -> (TempDir, Arc<HistoryRepo>) {
    let dir = TempDir::new().unwrap();
    let repo = HistoryRepo::open(dir.path(), "agg").unwrap();
    for m in matches {
        repo.record_match(Some(m), "next").unwrap();
    }
    (dir, Arc::new(repo))
}

fn read(repo: &HistoryRepo, file: &str) -> String {
    std::fs::read_to_string(repo.path(file)).unwrap()
}

#[test]
fn map_aggregate_without_samples_has_no_average() {
    assert!(MapAggregate::new("forest").average().is_none());
}

#[test]
fn compute_averages_groups_by_first_appearance() {
    let lines: Vec<_> = [
        "forest | t | 30 | 5 | -2",
        "desert | t | 100 | 3 | 1",
        "forest | t | 90 | 1 | 4",
    ]
    .iter()
    .map(|l| parse_history_line(l).unwrap())
    .collect();
    let averages = compute_averages(&lines);
    assert_eq!(averages.len(), 2);
    assert_eq!(averages[0].map_name, "forest");
    assert_eq!(averages[0].avg_playtime, 60.0);
    assert_eq!(averages[0].avg_player_change, 1.0);
    assert_eq!(averages[1].map_name, "desert");
    assert_eq!(averages[1].avg_playtime, 100.0);
}

#[test]
fn recompute_writes_cache_and_timestamp() {
    let (_dir, repo) = repo_with(&[
        finished("SYS_INIT", 0, 0, 5),
        finished("forest", 30, 5, 3),
        finished("desert", 45, 3, 4),
        finished("forest", 35, 4, 4),
    ]);
    let now = Local.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
    let averages = aggregation_cache::recompute(&repo, now).unwrap();
    assert_eq!(averages.len(), 3);

    assert_eq!(
        read(&repo, history_repo::MAP_AVERAGE_CACHE),
        "SYS_INIT | 0.0 | 5.0\nforest | 32.5 | -1.0\ndesert | 45.0 | 1.0\n"
    );
    assert_eq!(
        read(&repo, history_repo::LAST_CACHE_TIME),
        "2024-06-01 06:00:00.000000"
    );

    let stats = repo.load_map_stats("forest").unwrap().unwrap();
    assert!(stats.found_in_cache);
    assert_eq!(stats.playcount, 2);
    assert_eq!(stats.map_avg_playtime, 32.5);
    assert_eq!(stats.map_avg_playercount_change, -1.0);
}

#[test]
fn recompute_is_idempotent() {
    let (_dir, repo) = repo_with(&[
        finished("forest", 30, 5, 3),
        finished("desert", 47, 3, 4),
        finished("forest", 31, 4, 9),
    ]);
    let now = Local::now();
    aggregation_cache::recompute(&repo, now).unwrap();
    let first = read(&repo, history_repo::MAP_AVERAGE_CACHE);
    aggregation_cache::recompute(&repo, now).unwrap();
    let second = read(&repo, history_repo::MAP_AVERAGE_CACHE);
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn recompute_starts_from_scratch_each_time() {
    let (_dir, repo) = repo_with(&[finished("forest", 30, 5, 3)]);
    aggregation_cache::recompute(&repo, Local::now()).unwrap();
    repo.record_match(Some(&finished("forest", 90, 3, 7)), "lake")
        .unwrap();
    let averages = aggregation_cache::recompute(&repo, Local::now()).unwrap();
    assert_eq!(averages.len(), 1);
    assert_eq!(averages[0].avg_playtime, 60.0);
    assert_eq!(averages[0].avg_player_change, 1.0);
}

#[test]
fn recompute_leaves_history_and_play_counts_alone() {
    let (_dir, repo) = repo_with(&[finished("forest", 30, 5, 3)]);
    let history = read(&repo, history_repo::MAP_HISTORY);
    let counts = read(&repo, history_repo::MAP_DATA);
    aggregation_cache::recompute(&repo, Local::now()).unwrap();
    assert_eq!(read(&repo, history_repo::MAP_HISTORY), history);
    assert_eq!(read(&repo, history_repo::MAP_DATA), counts);
}

#[test]
fn recompute_on_empty_history_writes_empty_cache() {
    let (_dir, repo) = repo_with(&[]);
    let averages = aggregation_cache::recompute(&repo, Local::now()).unwrap();
    assert!(averages.is_empty());
    assert_eq!(read(&repo, history_repo::MAP_AVERAGE_CACHE), "");
    assert!(!read(&repo, history_repo::LAST_CACHE_TIME).is_empty());
}

#[test]
fn recompute_skips_malformed_history_lines() {
    let (_dir, repo) = repo_with(&[finished("forest", 30, 5, 3)]);
    let mut history = read(&repo, history_repo::MAP_HISTORY);
    history.push_str("forest | broken\n");
    std::fs::write(repo.path(history_repo::MAP_HISTORY), history).unwrap();
    let averages = aggregation_cache::recompute(&repo, Local::now()).unwrap();
    assert_eq!(averages.len(), 1);
    assert_eq!(averages[0].avg_playtime, 30.0);
}

#[test]
fn cache_tick_honours_cooldown() {
    let (_dir, repo) = repo_with(&[finished("forest", 30, 5, 3)]);
    let mut cache = AggregationCache::new(repo.clone(), 2);
    let ran: Vec<bool> = (0..7).map(|_| cache.tick().unwrap()).collect();
    assert_eq!(ran, [true, false, false, true, false, false, true]);
    assert_eq!(
        read(&repo, history_repo::MAP_AVERAGE_CACHE),
        "forest | 30.0 | -2.0\n"
    );
}
