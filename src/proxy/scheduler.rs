//! Proxy pool scheduler: three long-running duties — periodic probe sweep,
//! periodic crawl sweep, and the selection API — over one scored index.
//!
//! Every blocking read selects on the scheduler's cancellation token, and a
//! sweep joins all of its stages before returning, so `close()` drains the
//! whole pipeline and sweeps never overlap.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::proxy::api;
use crate::proxy::index::ScoredIndex;
use crate::proxy::probe::LivenessProbe;
use crate::proxy::source::CandidateSource;

/// Cap on concurrent outbound probes within one sweep. Keeps the fan-out
/// inside typical per-process socket budgets.
pub const PROBE_CONCURRENCY: usize = 20;

/// Depth of the add/del apply channels. Decouples store writes from probe
/// I/O without buffering a meaningful share of the pool.
const APPLY_DEPTH: usize = 10;

/// Wake period while the external network is unreachable.
const NETWORK_RETRY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ProxySchedulerConfig {
    /// Bind address for the selection API.
    pub api_addr: String,
    /// Skip the crawl sweep while `count() >= threshold`. 0 disables.
    pub threshold: u64,
    /// Pause between probe sweeps.
    pub probe_cycle: Duration,
    /// Pause between crawl sweeps.
    pub crawl_cycle: Duration,
}

struct ProbeOutcome {
    candidate: String,
    alive: Result<bool>,
}

struct Inner {
    index: Arc<dyn ScoredIndex>,
    probe: Arc<dyn LivenessProbe>,
    sources: Vec<Arc<dyn CandidateSource>>,
    config: ProxySchedulerConfig,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct ProxyScheduler {
    inner: Arc<Inner>,
}

impl ProxyScheduler {
    pub fn new(
        index: Arc<dyn ScoredIndex>,
        probe: Arc<dyn LivenessProbe>,
        sources: Vec<Arc<dyn CandidateSource>>,
        config: ProxySchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                index,
                probe,
                sources,
                config,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Broadcast the abort signal. Idempotent; `serve` returns once every
    /// duty has drained.
    pub fn close(&self) {
        self.inner.cancel.cancel();
    }

    /// Run all three duties until [`close`](Self::close).
    pub async fn serve(&self) -> Result<()> {
        let mut duties = JoinSet::new();

        {
            let inner = Arc::clone(&self.inner);
            duties.spawn(async move {
                info!("probe duty started");
                loop {
                    inner.probe_sweep().await;
                    tokio::select! {
                        _ = inner.cancel.cancelled() => break,
                        _ = tokio::time::sleep(inner.config.probe_cycle) => {}
                    }
                }
                info!("probe duty stopped");
            });
        }

        {
            let inner = Arc::clone(&self.inner);
            duties.spawn(async move {
                info!("crawl duty started");
                loop {
                    inner.crawl_sweep().await;
                    tokio::select! {
                        _ = inner.cancel.cancelled() => break,
                        _ = tokio::time::sleep(inner.config.crawl_cycle) => {}
                    }
                }
                info!("crawl duty stopped");
            });
        }

        {
            let inner = Arc::clone(&self.inner);
            duties.spawn(async move {
                info!("api duty started");
                if let Err(e) = api::serve(
                    Arc::clone(&inner.index),
                    &inner.config.api_addr,
                    inner.cancel.clone(),
                )
                .await
                {
                    error!("selection api failed: {e}");
                }
                info!("api duty stopped");
            });
        }

        while let Some(joined) = duties.join_next().await {
            if let Err(e) = joined {
                error!("scheduler duty panicked: {e}");
            }
        }
        info!("all duties drained");
        Ok(())
    }
}

impl Inner {
    /// One probe sweep: snapshot → bounded probe fan-out → classify →
    /// apply. Two apply channels rather than one tagged channel let the
    /// pin and decay branches run at independent rates.
    async fn probe_sweep(&self) {
        let candidates = match self.index.get_all().await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("probe sweep: snapshot failed: {e}");
                return;
            }
        };

        let (res_tx, mut res_rx) = mpsc::channel::<ProbeOutcome>(worker_parallelism());

        // Producer: walks the snapshot, holding while the uplink is down and
        // admitting at most PROBE_CONCURRENCY probes at a time. Owns every
        // sender clone, so the results channel closes exactly when the last
        // probe has reported.
        let producer = {
            let probe = Arc::clone(&self.probe);
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                let admission = Arc::new(Semaphore::new(PROBE_CONCURRENCY));
                let mut probes = JoinSet::new();

                'walk: for candidate in candidates {
                    while !probe.network_up().await {
                        warn!("external network unreachable, retrying in 60 s");
                        tokio::select! {
                            _ = cancel.cancelled() => break 'walk,
                            _ = tokio::time::sleep(NETWORK_RETRY) => {}
                        }
                    }

                    let permit = tokio::select! {
                        _ = cancel.cancelled() => break 'walk,
                        permit = Arc::clone(&admission).acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break 'walk,
                        },
                    };

                    let probe = Arc::clone(&probe);
                    let res_tx = res_tx.clone();
                    let cancel = cancel.clone();
                    probes.spawn(async move {
                        let _admitted = permit;
                        let alive = probe.probe_proxy(&candidate).await;
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = res_tx.send(ProbeOutcome { candidate, alive }) => {}
                        }
                    });
                }

                while probes.join_next().await.is_some() {}
            })
        };

        let (add_tx, mut add_rx) = mpsc::channel::<String>(APPLY_DEPTH);
        let (del_tx, mut del_rx) = mpsc::channel::<String>(APPLY_DEPTH);

        let mut appliers = JoinSet::new();
        {
            let index = Arc::clone(&self.index);
            let cancel = self.cancel.clone();
            appliers.spawn(async move {
                while let Some(candidate) = add_rx.recv().await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    info!("proxy {candidate} alive");
                    if let Err(e) = index.set_max(&candidate).await {
                        warn!("set_max {candidate} failed: {e}");
                    }
                }
            });
        }
        {
            let index = Arc::clone(&self.index);
            let cancel = self.cancel.clone();
            appliers.spawn(async move {
                while let Some(candidate) = del_rx.recv().await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    info!("proxy {candidate} unavailable");
                    if let Err(e) = index.decrement(&candidate).await {
                        warn!("decrement {candidate} failed: {e}");
                    }
                }
            });
        }

        // Classify until the producer closes the results channel.
        loop {
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => break,
                outcome = res_rx.recv() => match outcome {
                    Some(outcome) => outcome,
                    None => break,
                },
            };
            let routed = match outcome.alive {
                Ok(true) => add_tx.send(outcome.candidate).await,
                Ok(false) => del_tx.send(outcome.candidate).await,
                Err(e) => {
                    warn!("probe {} failed: {e}", outcome.candidate);
                    del_tx.send(outcome.candidate).await
                }
            };
            if routed.is_err() {
                break;
            }
        }
        drop(add_tx);
        drop(del_tx);

        while appliers.join_next().await.is_some() {}
        let _ = producer.await;
        info!("probe sweep done");
    }

    /// One crawl sweep: bounded per-source workers drain every producer
    /// into a single collector that inserts at the initial score.
    async fn crawl_sweep(&self) {
        let count = match self.index.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("crawl sweep: count failed: {e}");
                return;
            }
        };
        if self.config.threshold > 0 && count >= self.config.threshold {
            info!(
                "index holds {count} candidates (threshold {}), skipping crawl",
                self.config.threshold
            );
            return;
        }

        let (add_tx, mut add_rx) = mpsc::channel::<String>(APPLY_DEPTH);

        let collector = {
            let index = Arc::clone(&self.index);
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                while let Some(candidate) = add_rx.recv().await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    info!("add proxy: {candidate}");
                    if let Err(e) = index.add_default(&candidate).await {
                        warn!("add {candidate} failed: {e}");
                    }
                }
            })
        };

        let admission = Arc::new(Semaphore::new(worker_parallelism()));
        let mut workers = JoinSet::new();
        'sources: for source in &self.sources {
            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break 'sources,
                permit = Arc::clone(&admission).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break 'sources,
                },
            };

            let source = Arc::clone(source);
            let add_tx = add_tx.clone();
            let cancel = self.cancel.clone();
            workers.spawn(async move {
                let _admitted = permit;
                let Some(mut rx) = source.start().await else {
                    return;
                };
                loop {
                    let candidate = tokio::select! {
                        _ = cancel.cancelled() => break,
                        candidate = rx.recv() => match candidate {
                            Some(candidate) => candidate,
                            None => break,
                        },
                    };
                    if add_tx.send(candidate).await.is_err() {
                        break;
                    }
                }
                // Drained or aborted either way: release the source's own
                // workers before reporting this one done.
                source.stop().await;
            });
        }

        while workers.join_next().await.is_some() {}
        drop(add_tx);
        let _ = collector.await;
        info!("crawl sweep done");
    }
}

fn worker_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
