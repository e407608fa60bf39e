//! Candidate producers: pluggable origins of proxy endpoint strings.
//!
//! A source hands out the receiving end of a bounded channel and feeds it
//! lazily. Paged listing-site sources share the [`PagedSource`] scaffold,
//! which owns the lifecycle state machine, the auto-stop timer, the
//! politeness delays, and the emit cap; the site module only supplies the
//! page walk.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Output channel depth. Small on purpose: a slow consumer back-pressures
/// the page walk instead of buffering a whole listing site.
pub(crate) const CHANNEL_DEPTH: usize = 5;

/// A pluggable origin of proxy candidates.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Begin producing and return the candidate sequence. Returns `None`
    /// when the source is already running or has terminated — a source never
    /// spawns a second pipeline and is not restartable.
    async fn start(&self) -> Option<mpsc::Receiver<String>>;

    /// Cooperative cancellation. The default is a no-op for single-pass
    /// sources that hold no internal workers.
    async fn stop(&self) {}
}

/// Construction knobs shared by every paged source.
#[derive(Debug, Clone, Copy)]
pub struct SourceOptions {
    /// Auto-stop this long after `start`. Zero disables the timer.
    pub timeout: Duration,
    /// Base wait between page fetches; up to four seconds of jitter are
    /// added on top.
    pub interval: Duration,
    /// Terminate after emitting this many candidates. Zero means the site
    /// decides.
    pub max_count: usize,
}

impl SourceOptions {
    pub fn new(timeout_secs: u64, interval_secs: u64, max_count: usize) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            interval: Duration::from_secs(interval_secs),
            max_count,
        }
    }
}

/// Site-specific page walk driven by [`PagedSource`]. Implementations fetch
/// and parse listing pages, pushing candidates through the sink until the
/// site is exhausted or the sink refuses further output.
#[async_trait]
pub trait PageWalker: Send + Sync + 'static {
    async fn walk(&self, sink: SourceSink);
}

/// The walker's handle onto the running pipeline.
#[derive(Clone)]
pub struct SourceSink {
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
    interval: Duration,
    max_count: usize,
    emitted: Arc<AtomicUsize>,
}

impl SourceSink {
    /// Push one candidate. Returns `false` when the walk should end: the
    /// source was stopped, the consumer went away, or the emit cap was hit.
    pub async fn emit(&self, candidate: String) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(candidate) => {
                if sent.is_err() {
                    return false;
                }
                if self.max_count > 0 {
                    let emitted = self.emitted.fetch_add(1, Ordering::Relaxed) + 1;
                    if emitted >= self.max_count {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Inter-page politeness delay: `interval + rand(0..4)` seconds.
    /// Returns `false` when stopped while waiting.
    pub async fn page_gap(&self) -> bool {
        let jitter: u64 = {
            use rand::prelude::*;
            rand::rng().random_range(0..5)
        };
        self.wait(self.interval + Duration::from_secs(jitter)).await
    }

    /// Short backoff after a failed page fetch. Returns `false` when stopped.
    pub async fn retry_gap(&self) -> bool {
        self.wait(Duration::from_secs(1)).await
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn wait(&self, period: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(period) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Terminated,
}

struct RunState {
    phase: Phase,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

/// Stoppable producer scaffold for paged listing sites.
///
/// Lifecycle: `Idle → Running → Terminated`. All transitions happen under
/// one lock, so no caller can observe a torn state. Termination is one-way:
/// a drained, timed-out, or stopped source stays terminated.
pub struct PagedSource<W> {
    name: &'static str,
    options: SourceOptions,
    walker: Arc<W>,
    state: Mutex<RunState>,
}

impl<W: PageWalker> PagedSource<W> {
    pub fn new(name: &'static str, options: SourceOptions, walker: W) -> Self {
        Self {
            name,
            options,
            walker: Arc::new(walker),
            state: Mutex::new(RunState {
                phase: Phase::Idle,
                cancel: CancellationToken::new(),
                driver: None,
            }),
        }
    }
}

#[async_trait]
impl<W: PageWalker> CandidateSource for PagedSource<W> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn start(&self) -> Option<mpsc::Receiver<String>> {
        let mut state = self.state.lock().await;

        // A driver that drained on its own terminates the source.
        if state.phase == Phase::Running
            && state.driver.as_ref().map(|d| d.is_finished()).unwrap_or(true)
        {
            state.phase = Phase::Terminated;
        }
        if state.phase != Phase::Idle {
            return None;
        }

        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let cancel = CancellationToken::new();
        state.cancel = cancel.clone();

        let sink = SourceSink {
            tx,
            cancel: cancel.clone(),
            interval: self.options.interval,
            max_count: self.options.max_count,
            emitted: Arc::new(AtomicUsize::new(0)),
        };
        let walker = Arc::clone(&self.walker);
        let timeout = self.options.timeout;

        state.driver = Some(tokio::spawn(async move {
            let deadline = async {
                if timeout.is_zero() {
                    futures::future::pending::<()>().await
                } else {
                    tokio::time::sleep(timeout).await
                }
            };
            // Dropping the walk (and with it the sink) closes the output
            // channel exactly once, whichever arm wins.
            tokio::select! {
                _ = walker.walk(sink) => {}
                _ = cancel.cancelled() => {}
                _ = deadline => {}
            }
        }));

        state.phase = Phase::Running;
        Some(rx)
    }

    async fn stop(&self) {
        let mut state = self.state.lock().await;
        if state.phase != Phase::Running {
            return;
        }
        state.cancel.cancel();
        // The lock is held across the join: concurrent stops serialize and
        // each returns only after the driver has exited. The driver never
        // touches the state, so this cannot deadlock.
        if let Some(driver) = state.driver.take() {
            let _ = driver.await;
        }
        state.phase = Phase::Terminated;
    }
}
