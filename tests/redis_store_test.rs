//! Live-store checks against a local Redis. Run with:
//!
//! ```sh
//! cargo test --test redis_store_test -- --ignored
//! ```

use credpool::cookie::{CredentialStore, RedisCredentialStore};
use credpool::proxy::{RedisIndex, ScoredIndex, INIT_SCORE, MAX_SCORE};
use credpool::StoreError;

const ADDR: &str = "127.0.0.1:6379";
const PASSWORD: &str = "";

#[tokio::test]
#[ignore = "requires a running redis at 127.0.0.1:6379"]
async fn scored_index_lifecycle() {
    let index = RedisIndex::open(ADDR, PASSWORD, "credpool:test:index")
        .await
        .expect("redis reachable");
    let candidates = [
        "http://203.0.113.1:8080".to_string(),
        "http://203.0.113.2:8080".to_string(),
    ];
    index.remove(&candidates).await.unwrap();

    // insert-if-absent keeps the first score
    index.add(&candidates[0], INIT_SCORE).await.unwrap();
    index.add(&candidates[0], 42.0).await.unwrap();
    assert!(index.exists(&candidates[0]).await.unwrap());

    // out-of-range is reported, not stored
    assert!(matches!(
        index.add(&candidates[1], 250.0).await,
        Err(StoreError::OutOfRange(_))
    ));
    assert!(!index.exists(&candidates[1]).await.unwrap());

    // set_max pins and is idempotent; the pinned tier wins random_top
    index.set_max(&candidates[0]).await.unwrap();
    index.set_max(&candidates[0]).await.unwrap();
    assert_eq!(index.random_top().await.unwrap(), candidates[0]);

    // decay from MAX down to eviction
    for _ in 0..(MAX_SCORE as usize) {
        index.decrement(&candidates[0]).await.unwrap();
    }
    assert!(!index.exists(&candidates[0]).await.unwrap());
    assert!(matches!(
        index.decrement(&candidates[0]).await,
        Err(StoreError::NotFound(_))
    ));

    index.remove(&candidates).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running redis at 127.0.0.1:6379"]
async fn credential_store_roles_are_independent() {
    let store = RedisCredentialStore::open(ADDR, PASSWORD, "credpool_test_site")
        .await
        .expect("redis reachable");

    let users: Vec<String> = ["u1", "u2", "u3"].iter().map(|u| u.to_string()).collect();
    store.delete_accounts(&users).await.unwrap();
    store.delete_cookies(&users).await.unwrap();

    store.set_account("u1", "secret1").await.unwrap();
    store.set_account("u2", "secret2").await.unwrap();
    store.set_cookie("u1", r#"[{"Name":"sid","Value":"x"}]"#).await.unwrap();

    assert_eq!(store.get_account("u1").await.unwrap(), "secret1");
    assert!(matches!(
        store.get_account("u3").await,
        Err(StoreError::NotFound(_))
    ));
    // u2 has an account but no cookie yet
    assert!(matches!(
        store.get_cookie("u2").await,
        Err(StoreError::NotFound(_))
    ));

    assert_eq!(store.count_accounts().await.unwrap(), 2);
    assert_eq!(store.count_cookies().await.unwrap(), 1);
    assert_eq!(
        store.random_cookie().await.unwrap(),
        r#"[{"Name":"sid","Value":"x"}]"#
    );

    let mut names = store.usernames().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["u1".to_string(), "u2".to_string()]);

    store.delete_accounts(&users).await.unwrap();
    store.delete_cookies(&users).await.unwrap();
    assert!(matches!(
        store.random_cookie().await,
        Err(StoreError::Empty(_))
    ));
}
