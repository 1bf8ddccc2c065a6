use serde::Deserialize;

use crate::models::map_id::DEFAULT_EVENT_MARKER;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub monitoring: MonitoringConfig,
    pub servers: Vec<MonitoredServerConfig>,
}

/// Bind address of the read API.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of the per-server directories (`<save_dir>/<server name>/`).
    pub save_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub query_timeout_ms: u64,
    /// Ticks (seconds) between two full recomputes of the aggregate cache.
    #[serde(default = "default_cache_cooldown_secs")]
    pub cache_cooldown_secs: u64,
    /// How often each monitor logs its counters at INFO level.
    pub stats_log_interval_secs: u64,
}

fn default_cache_cooldown_secs() -> u64 {
    43_200
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoredServerConfig {
    /// Display name; also the directory name under `storage.save_dir`.
    pub name: String,
    /// `host[:port]`
    pub address: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u32,
    #[serde(default)]
    pub query_error_policy: QueryErrorPolicy,
    #[serde(default = "default_event_marker")]
    pub event_marker: String,
    #[serde(default)]
    pub motd: MotdFormat,
}

fn default_poll_interval_secs() -> u32 {
    30
}

fn default_event_marker() -> String {
    DEFAULT_EVENT_MARKER.to_string()
}

/// How a failed status query affects the open session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryErrorPolicy {
    /// The query-error sentinel is treated like any other map: failure and recovery both close a match.
    #[default]
    Transition,
    /// A failed poll keeps the open session running; only a real map change closes it.
    Hold,
}

/// Where the map name sits in the flattened description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MotdFormat {
    /// 0-based line index.
    pub map_line: usize,
    /// Characters dropped from the start of that line.
    pub strip_prefix: usize,
    /// Characters dropped from the end of that line.
    pub strip_suffix: usize,
}

impl Default for MotdFormat {
    fn default() -> Self {
        Self {
            map_line: 1,
            strip_prefix: 6,
            strip_suffix: 4,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.servers.iter().map(|s| s.name.clone()).collect()
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.storage.save_dir.is_empty(),
            "storage.save_dir must be non-empty"
        );
        anyhow::ensure!(
            self.monitoring.query_timeout_ms > 0,
            "monitoring.query_timeout_ms must be > 0, got {}",
            self.monitoring.query_timeout_ms
        );
        anyhow::ensure!(
            self.monitoring.cache_cooldown_secs > 0,
            "monitoring.cache_cooldown_secs must be > 0, got {}",
            self.monitoring.cache_cooldown_secs
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            !self.servers.is_empty(),
            "servers must list at least one server to monitor"
        );

        let mut seen = std::collections::HashSet::new();
        for s in &self.servers {
            anyhow::ensure!(!s.name.trim().is_empty(), "servers.name must be non-empty");
            anyhow::ensure!(
                !s.name.contains(['/', '\\']) && s.name != "." && s.name != "..",
                "servers.name must be a plain directory name, got {:?}",
                s.name
            );
            anyhow::ensure!(
                seen.insert(s.name.as_str()),
                "servers.name must be unique, {:?} is listed twice",
                s.name
            );
            anyhow::ensure!(
                !s.address.is_empty(),
                "servers.address must be non-empty (server {:?})",
                s.name
            );
            anyhow::ensure!(
                s.poll_interval_secs > 0,
                "servers.poll_interval_secs must be > 0, got {} (server {:?})",
                s.poll_interval_secs,
                s.name
            );
            anyhow::ensure!(
                !s.event_marker.is_empty(),
                "servers.event_marker must be non-empty (server {:?})",
                s.name
            );
        }
        Ok(())
    }
}
