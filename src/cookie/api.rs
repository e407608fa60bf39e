//! Selection API for the cookie pool. One route per registered site,
//! resolved through the registry at request time so late registrations are
//! served without a restart.

use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cookie::registry::SiteRegistry;

const BANNER: &str = "<h2>Welcome to Cookie Pool System</h2>";

pub async fn serve(
    registry: Arc<SiteRegistry>,
    addr: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "cookie selection api listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

pub fn router(registry: Arc<SiteRegistry>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/{site}/random", get(site_random))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

async fn banner() -> Html<&'static str> {
    Html(BANNER)
}

async fn site_random(
    State(registry): State<Arc<SiteRegistry>>,
    Path(site): Path<String>,
) -> String {
    let Some(binding) = registry.get(&site) else {
        return String::new();
    };
    binding.store.random_cookie().await.unwrap_or_default()
}
