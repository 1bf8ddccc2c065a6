use anyhow::Result;
use mapmonitor::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        version = version::VERSION,
        servers = app_config.servers.len(),
        save_dir = %app_config.storage.save_dir,
        "starting monitor"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let query_timeout = Duration::from_millis(app_config.monitoring.query_timeout_ms);

    let mut worker_handles = Vec::with_capacity(app_config.servers.len());
    for server in &app_config.servers {
        let history_repo = Arc::new(
            history_repo::HistoryRepo::open(&app_config.storage.save_dir, &server.name)
                .map_err(|e| anyhow::anyhow!("open save dir for {:?}: {}", server.name, e))?,
        );
        let source = status_repo::JavaStatusRepo::new(&server.address, query_timeout)?;
        let tracker = tracker::SessionTracker::new(tracker::TrackerConfig {
            poll_interval_secs: server.poll_interval_secs,
            query_error_policy: server.query_error_policy,
            event_marker: server.event_marker.clone(),
            motd: server.motd,
        });
        let cache = aggregation_cache::AggregationCache::new(
            history_repo.clone(),
            app_config.monitoring.cache_cooldown_secs,
        );
        tracing::info!(
            server = %server.name,
            address = %server.address,
            poll_interval_secs = server.poll_interval_secs,
            "monitoring server"
        );
        worker_handles.push(worker::spawn(
            worker::WorkerDeps {
                source,
                tracker,
                history_repo,
                cache,
                shutdown_rx: shutdown_rx.clone(),
            },
            worker::WorkerConfig {
                tick_interval_ms: worker::TICK_INTERVAL_MS,
                stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
            },
        ));
    }

    let app = routes::app(&app_config.storage.save_dir, app_config.server_names());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Read API listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            futures_util::future::join_all(worker_handles).await;
        }
    }

    Ok(())
}
