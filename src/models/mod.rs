// Domain models

pub mod map_id;
mod map_stats;
mod session;

pub use map_stats::{CurrentMap, MapAverage, MapStats, PlayCount, ServerSummary};
pub use session::{Match, ServerStatus, Snapshot, TimedSnapshot};
