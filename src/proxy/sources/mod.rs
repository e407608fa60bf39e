//! Built-in listing-site sources.
//!
//! One module per site. Each paged site supplies a [`PageWalker`] and wraps
//! it in the [`PagedSource`] scaffold; `yqie` is a single-pass source with
//! no internal workers to stop.

pub mod ihuan;
pub mod ip3366;
pub mod ip89;
pub mod kuaidaili;
pub mod kxdaili;
pub mod yqie;
pub mod zdaye;

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use crate::core::USER_AGENT;
use crate::proxy::source::CandidateSource;

const LISTING_TIMEOUT: Duration = Duration::from_secs(15);

/// Fresh default producer list. Built on demand so callers can own and
/// reorder it; nothing here is process-global except the shared client.
pub fn default_sources() -> Vec<Arc<dyn CandidateSource>> {
    vec![
        Arc::new(kuaidaili::source(3600, 5, 2000)),
        Arc::new(ip89::source(3600, 5)),
        Arc::new(ip3366::source(3600, 5)),
        Arc::new(ihuan::source(3600, 5, 2000)),
        Arc::new(kxdaili::source(3600, 5)),
        Arc::new(zdaye::source(3600, 5)),
        Arc::new(yqie::source()),
    ]
}

pub(crate) fn listing_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(LISTING_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

pub(crate) async fn fetch_page(url: &str) -> anyhow::Result<String> {
    let resp = listing_client().get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("{url} returned status {status}");
    }
    Ok(resp.text().await?)
}
