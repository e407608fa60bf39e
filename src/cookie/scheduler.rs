//! Cookie pool scheduler: selection API plus two periodic duties per
//! registered site — login refresh and cookie validation. Both duties run
//! once immediately and then repeat on their configured cycle.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cookie::api;
use crate::cookie::jar;
use crate::cookie::login::LoginState;
use crate::cookie::registry::{SiteBinding, SiteRegistry};
use crate::cookie::validate::CookieValidator;

/// Cap on sites serviced concurrently within one sweep.
pub const SITE_CONCURRENCY: usize = 10;

/// Gap before each per-user login or validation call. Politeness toward the
/// target sites, not a throughput knob.
const USER_PACING: Duration = Duration::from_secs(1);

const DELETE_DEPTH: usize = 10;

/// Status a live jar must reproduce at the validation URL.
const VALID_STATUS: u16 = 200;

#[derive(Debug, Clone)]
pub struct CookieSchedulerConfig {
    /// Bind address for the selection API.
    pub api_addr: String,
    /// Pause between validation sweeps.
    pub valid_cycle: Duration,
    /// Pause between login-refresh sweeps.
    pub login_cycle: Duration,
}

struct Inner {
    registry: Arc<SiteRegistry>,
    validator: Arc<dyn CookieValidator>,
    config: CookieSchedulerConfig,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct CookieScheduler {
    inner: Arc<Inner>,
}

impl CookieScheduler {
    pub fn new(
        registry: Arc<SiteRegistry>,
        validator: Arc<dyn CookieValidator>,
        config: CookieSchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                validator,
                config,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Broadcast the abort signal. Idempotent.
    pub fn close(&self) {
        self.inner.cancel.cancel();
    }

    /// Run the API and both refresh loops until [`close`](Self::close).
    pub async fn serve(&self) -> Result<()> {
        let mut duties = JoinSet::new();

        {
            let inner = Arc::clone(&self.inner);
            duties.spawn(async move {
                info!("api duty started");
                if let Err(e) = api::serve(
                    Arc::clone(&inner.registry),
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

        {
            let inner = Arc::clone(&self.inner);
            duties.spawn(async move {
                info!("validate duty started");
                loop {
                    inner.validate_sweep().await;
                    tokio::select! {
                        _ = inner.cancel.cancelled() => break,
                        _ = tokio::time::sleep(inner.config.valid_cycle) => {}
                    }
                }
                info!("validate duty stopped");
            });
        }

        {
            let inner = Arc::clone(&self.inner);
            duties.spawn(async move {
                info!("login duty started");
                loop {
                    inner.login_sweep().await;
                    tokio::select! {
                        _ = inner.cancel.cancelled() => break,
                        _ = tokio::time::sleep(inner.config.login_cycle) => {}
                    }
                }
                info!("login duty stopped");
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
    /// One login sweep: refresh cookies for every account of every
    /// registered site, at most [`SITE_CONCURRENCY`] sites at a time and one
    /// paced user at a time within a site.
    async fn login_sweep(&self) {
        let sites = self.registry.snapshot();
        stream::iter(sites)
            .for_each_concurrent(SITE_CONCURRENCY, |(name, binding)| async move {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.login_site(&name, &binding).await;
            })
            .await;
        info!("login sweep done");
    }

    async fn login_site(&self, name: &str, binding: &SiteBinding) {
        let accounts = match binding.store.all_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("login sweep: accounts for {name} unavailable: {e}");
                return;
            }
        };

        for (user, secret) in accounts {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(USER_PACING) => {}
            }

            match binding.login.login(&user, &secret).await {
                LoginState::PasswordError => {
                    info!("account {user}@{name} has a bad secret, purging");
                    if let Err(e) = binding.store.delete_accounts(&[user.clone()]).await {
                        warn!("purge account {user}@{name} failed: {e}");
                    }
                }
                LoginState::LoginFailed => {
                    // Transient; the account stays and is retried next cycle.
                    warn!("login {user}@{name} failed");
                }
                LoginState::LoginSuccessful(fresh) => match jar::encode(&fresh) {
                    Ok(json) => {
                        info!("login {user}@{name} succeeded, cookie refreshed");
                        if let Err(e) = binding.store.set_cookie(&user, &json).await {
                            warn!("store cookie {user}@{name} failed: {e}");
                        }
                    }
                    Err(e) => warn!("serialize jar for {user}@{name} failed: {e}"),
                },
            }
        }
    }

    /// One validation sweep: replay every stored jar and evict the dead.
    async fn validate_sweep(&self) {
        let sites = self.registry.snapshot();
        stream::iter(sites)
            .for_each_concurrent(SITE_CONCURRENCY, |(name, binding)| async move {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.validate_site(&name, &binding).await;
            })
            .await;
        info!("validate sweep done");
    }

    async fn validate_site(&self, name: &str, binding: &SiteBinding) {
        let cookies = match binding.store.all_cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("validate sweep: cookies for {name} unavailable: {e}");
                return;
            }
        };

        let (del_tx, mut del_rx) = mpsc::channel::<String>(DELETE_DEPTH);
        let deleter = {
            let store = Arc::clone(&binding.store);
            let cancel = self.cancel.clone();
            let name = name.to_string();
            tokio::spawn(async move {
                while let Some(user) = del_rx.recv().await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    info!("cookie for {user}@{name} is dead, deleting");
                    if let Err(e) = store.delete_cookies(&[user]).await {
                        warn!("delete cookie failed: {e}");
                    }
                }
            })
        };

        'users: for (user, raw) in cookies {
            tokio::select! {
                _ = self.cancel.cancelled() => break 'users,
                _ = tokio::time::sleep(USER_PACING) => {}
            }

            let parsed = match jar::decode(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("cookie for {user}@{name} is malformed: {e}");
                    if del_tx.send(user).await.is_err() {
                        break 'users;
                    }
                    continue;
                }
            };

            let alive = match self
                .validator
                .validate(&binding.validation_url, &parsed, VALID_STATUS)
                .await
            {
                Ok(alive) => alive,
                Err(e) => {
                    warn!("validate {user}@{name} failed: {e}");
                    false
                }
            };
            if !alive && del_tx.send(user).await.is_err() {
                break 'users;
            }
        }

        drop(del_tx);
        let _ = deleter.await;
    }
}
