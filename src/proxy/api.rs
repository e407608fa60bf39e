//! Selection API for the proxy pool. Advisory by design: selection
//! failures answer 200 with an empty body, so callers poll without
//! special-casing cold starts or eviction storms.

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::proxy::index::ScoredIndex;

const BANNER: &str = "<h2>Welcome to Proxy Pool System</h2>";

pub async fn serve(
    index: Arc<dyn ScoredIndex>,
    addr: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "proxy selection api listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, router(index))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

pub fn router(index: Arc<dyn ScoredIndex>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/random", get(random))
        .route("/count", get(count))
        .layer(TraceLayer::new_for_http())
        .with_state(index)
}

async fn banner() -> Html<&'static str> {
    Html(BANNER)
}

async fn random(State(index): State<Arc<dyn ScoredIndex>>) -> String {
    index.random_top().await.unwrap_or_default()
}

async fn count(State(index): State<Arc<dyn ScoredIndex>>) -> String {
    index.count().await.unwrap_or_default().to_string()
}
