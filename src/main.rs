use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use credpool::config;
use credpool::proxy::{default_sources, HttpProbe, ProxyScheduler, ProxySchedulerConfig, RedisIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cfg = config::load_daemon_config();
    let store_addr = cfg.resolve_store_addr();
    let key = cfg.resolve_key();
    info!("Starting proxy pool daemon (store {store_addr}, key {key})");

    let index = RedisIndex::open(&store_addr, &cfg.resolve_store_password(), &key).await?;

    let scheduler = ProxyScheduler::new(
        Arc::new(index),
        Arc::new(HttpProbe::new(cfg.resolve_probe_url())),
        default_sources(),
        ProxySchedulerConfig {
            api_addr: cfg.resolve_api_addr(),
            threshold: cfg.resolve_threshold(),
            probe_cycle: Duration::from_secs(cfg.resolve_probe_cycle_secs()),
            crawl_cycle: Duration::from_secs(cfg.resolve_crawl_cycle_secs()),
        },
    );

    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("shutdown signal received, draining pool duties");
            scheduler.close();
        });
    }

    scheduler.serve().await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
