//! Outbound liveness checks for stored proxy candidates.

use anyhow::Result;
use async_trait::async_trait;
use std::borrow::Cow;
use std::time::Duration;

use crate::core::config::DEFAULT_PROBE_URL;
use crate::core::USER_AGENT;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// Boolean liveness predicate over a candidate, plus a reachability check
/// for the probe host itself so a dead uplink doesn't decay the whole pool.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// GET the reference URL through `candidate` as an HTTP/HTTPS/SOCKS5
    /// proxy. `Ok(true)` iff the response is 200; transport failures surface
    /// as `Err` and are scored the same as a dead proxy.
    async fn probe_proxy(&self, candidate: &str) -> Result<bool>;

    /// Whether the external network answers at all (direct, no proxy).
    async fn network_up(&self) -> bool;
}

/// Production probe: plain reqwest clients with per-call timeouts.
pub struct HttpProbe {
    reference_url: String,
}

impl HttpProbe {
    pub fn new(reference_url: impl Into<String>) -> Self {
        Self {
            reference_url: reference_url.into(),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_URL)
    }
}

#[async_trait]
impl LivenessProbe for HttpProbe {
    async fn probe_proxy(&self, candidate: &str) -> Result<bool> {
        let target = url::Url::parse(ensure_scheme(candidate).as_ref())?;
        let proxy = reqwest::Proxy::all(target.as_str())?;
        let client = reqwest::Client::builder()
            .proxy(proxy)
            .user_agent(USER_AGENT)
            .timeout(PROBE_TIMEOUT)
            .build()?;
        let resp = client.get(&self.reference_url).send().await?;
        Ok(resp.status() == reqwest::StatusCode::OK)
    }

    async fn network_up(&self) -> bool {
        let Ok(client) = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(NETWORK_TIMEOUT)
            .build()
        else {
            return false;
        };
        match client.get(&self.reference_url).send().await {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }
}

/// Candidates are stored as harvested; a bare `host:port` is treated as an
/// HTTP proxy at probe time.
pub fn ensure_scheme(candidate: &str) -> Cow<'_, str> {
    const SCHEMES: [&str; 3] = ["http://", "https://", "socks5://"];
    if SCHEMES.iter().any(|scheme| candidate.starts_with(scheme)) {
        Cow::Borrowed(candidate)
    } else {
        Cow::Owned(format!("http://{candidate}"))
    }
}
