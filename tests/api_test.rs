//! Selection API routes for both pools, served on an ephemeral port.

mod common;

use common::{MemoryCredentialStore, MemoryIndex, ScriptedLogin};
use credpool::cookie::{api as cookie_api, CredentialStore, LoginState, SiteRegistry};
use credpool::proxy::{api as proxy_api, ScoredIndex, INIT_SCORE};
use std::sync::Arc;

async fn serve_router(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn proxy_routes_serve_banner_random_and_count() {
    let index = Arc::new(MemoryIndex::new());
    index.add("http://1.2.3.4:80", INIT_SCORE).await.unwrap();
    index.set_max("http://1.2.3.4:80").await.unwrap();

    let base = serve_router(proxy_api::router(index as Arc<dyn ScoredIndex>)).await;
    let client = reqwest::Client::new();

    let banner = client.get(&base).send().await.unwrap();
    assert_eq!(
        banner.headers()[reqwest::header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert!(banner.text().await.unwrap().contains("Proxy Pool"));

    let random = client.get(format!("{base}/random")).send().await.unwrap();
    assert_eq!(random.text().await.unwrap(), "http://1.2.3.4:80");

    let count = client.get(format!("{base}/count")).send().await.unwrap();
    assert_eq!(count.text().await.unwrap(), "1");
}

#[tokio::test]
async fn proxy_random_is_empty_on_a_cold_pool() {
    let index = Arc::new(MemoryIndex::new());
    let base = serve_router(proxy_api::router(index as Arc<dyn ScoredIndex>)).await;

    let random = reqwest::get(format!("{base}/random")).await.unwrap();
    // advisory API: empty body, not an error status
    assert_eq!(random.status(), reqwest::StatusCode::OK);
    assert_eq!(random.text().await.unwrap(), "");

    let count = reqwest::get(format!("{base}/count")).await.unwrap();
    assert_eq!(count.text().await.unwrap(), "0");
}

#[tokio::test]
async fn cookie_routes_serve_banner_and_per_site_random() {
    let store = Arc::new(MemoryCredentialStore::new());
    store.seed_cookie("u1", r#"[{"Name":"sid","Value":"deadbeef"}]"#);

    let registry = Arc::new(SiteRegistry::new());
    registry.register(
        "example",
        "https://example.com/me",
        store as Arc<dyn CredentialStore>,
        Arc::new(ScriptedLogin {
            outcome: LoginState::LoginFailed,
        }),
    );

    let base = serve_router(cookie_api::router(registry)).await;
    let client = reqwest::Client::new();

    let banner = client.get(&base).send().await.unwrap();
    assert!(banner.text().await.unwrap().contains("Cookie Pool"));

    let random = client
        .get(format!("{base}/example/random"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        random.text().await.unwrap(),
        r#"[{"Name":"sid","Value":"deadbeef"}]"#
    );

    let missing = client
        .get(format!("{base}/nowhere/random"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::OK);
    assert_eq!(missing.text().await.unwrap(), "");
}
