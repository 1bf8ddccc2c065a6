// Line formats of the per-server files. Tabular files use " | " between fields.

use chrono::{DateTime, Local};

use crate::models::{MapAverage, Match, PlayCount};

pub const FIELD_SEP: &str = " | ";

/// Local timestamp text used in the history log and the marker files.
pub fn timestamp_text(t: &DateTime<Local>) -> String {
    t.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// One parsed history line (`name | start_time | playtime | start_players | player_change`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLine {
    pub map_name: String,
    pub start_time: String,
    pub playtime: u64,
    pub start_players: u32,
    pub player_change: i64,
}

/// Formats a history line. `name` may differ from `m.map_name` (event redaction).
pub fn format_history_line(name: &str, m: &Match) -> String {
    format!(
        "{name}{FIELD_SEP}{}{FIELD_SEP}{}{FIELD_SEP}{}{FIELD_SEP}{}",
        timestamp_text(&m.start_time),
        m.playtime,
        m.start_players,
        m.player_change()
    )
}

/// Fields are taken from the right: map names are free text and may contain the separator.
pub fn parse_history_line(line: &str) -> Option<HistoryLine> {
    let mut fields = line.rsplitn(5, FIELD_SEP);
    let player_change = fields.next()?.trim().parse().ok()?;
    let start_players = fields.next()?.trim().parse().ok()?;
    let playtime = fields.next()?.trim().parse().ok()?;
    let start_time = fields.next()?;
    let map_name = fields.next()?;
    if map_name.is_empty() {
        return None;
    }
    Some(HistoryLine {
        map_name: map_name.to_string(),
        start_time: start_time.to_string(),
        playtime,
        start_players,
        player_change,
    })
}

pub fn format_play_count(row: &PlayCount) -> String {
    format!("{}{FIELD_SEP}{}", row.map_name, row.count)
}

pub fn parse_play_count(line: &str) -> Option<PlayCount> {
    let (name, count) = line.rsplit_once(FIELD_SEP)?;
    if name.is_empty() {
        return None;
    }
    Some(PlayCount {
        map_name: name.to_string(),
        count: count.trim().parse().ok()?,
    })
}

/// Whole means keep one decimal (`30.0`); others use the shortest round-trip form.
pub fn format_mean(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

pub fn format_map_average(row: &MapAverage) -> String {
    format!(
        "{}{FIELD_SEP}{}{FIELD_SEP}{}",
        row.map_name,
        format_mean(row.avg_playtime),
        format_mean(row.avg_player_change)
    )
}

pub fn parse_map_average(line: &str) -> Option<MapAverage> {
    let mut fields = line.rsplitn(3, FIELD_SEP);
    let avg_player_change = fields.next()?.trim().parse().ok()?;
    let avg_playtime = fields.next()?.trim().parse().ok()?;
    let map_name = fields.next()?;
    if map_name.is_empty() {
        return None;
    }
    Some(MapAverage {
        map_name: map_name.to_string(),
        avg_playtime,
        avg_player_change,
    })
}

/// Player-history line: `timestamp|count|` then `id|` per player.
pub fn format_player_history(t: &DateTime<Local>, count: u32, players: &[String]) -> String {
    let mut line = format!("{}|{}|", t.to_rfc3339(), count);
    for p in players {
        line.push_str(p);
        line.push('|');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_match() -> Match {
        Match {
            start_time: Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            playtime: 30,
            map_name: "forest".into(),
            start_players: 5,
            end_players: 3,
            is_event: false,
        }
    }

    #[test]
    fn history_line_layout() {
        let line = format_history_line("forest", &sample_match());
        assert_eq!(line, "forest | 2024-03-01 12:30:00.000000 | 30 | 5 | -2");
        let parsed = parse_history_line(&line).unwrap();
        assert_eq!(parsed.map_name, "forest");
        assert_eq!(parsed.playtime, 30);
        assert_eq!(parsed.player_change, -2);
    }

    #[test]
    fn history_line_rejects_garbage() {
        assert!(parse_history_line("").is_none());
        assert!(parse_history_line("forest | x | 30").is_none());
        assert!(parse_history_line("forest | t | thirty | 5 | -2").is_none());
        assert!(parse_history_line("forest | t | 30 | 5 | -2 | extra").is_none());
    }

    #[test]
    fn play_count_parse() {
        assert_eq!(
            parse_play_count("Harb | 12"),
            Some(PlayCount {
                map_name: "Harb".into(),
                count: 12
            })
        );
        assert!(parse_play_count("Harb 12").is_none());
        assert!(parse_play_count("Harb | -1").is_none());
        assert_eq!(
            parse_play_count("Red | Blue | 3").map(|r| r.map_name),
            Some("Red | Blue".to_string())
        );
    }

    #[test]
    fn separator_inside_map_name() {
        let line = format_history_line("Red | Blue", &sample_match());
        let parsed = parse_history_line(&line).unwrap();
        assert_eq!(parsed.map_name, "Red | Blue");
        assert_eq!(parsed.start_time, "2024-03-01 12:30:00.000000");
        assert_eq!(parsed.start_players, 5);

        let cached = parse_map_average("Red | Blue | 30.0 | -2.0").unwrap();
        assert_eq!(cached.map_name, "Red | Blue");
        assert_eq!(cached.avg_player_change, -2.0);
    }

    #[test]
    fn mean_formatting() {
        assert_eq!(format_mean(30.0), "30.0");
        assert_eq!(format_mean(-2.0), "-2.0");
        assert_eq!(format_mean(12.5), "12.5");
    }

    #[test]
    fn player_history_trailing_separator() {
        let t = Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let line = format_player_history(&t, 2, &["a".into(), "b".into()]);
        assert!(line.ends_with("|2|a|b|"), "{line}");
        let empty = format_player_history(&t, 0, &[]);
        assert!(empty.ends_with("|0|"), "{empty}");
    }
}
