//! Per-site credential storage: an accounts hash {username → secret} and a
//! cookies hash {username → serialized jar}. The two hashes share usernames
//! but neither is a subset of the other — an account may not have produced
//! a cookie yet.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

use crate::core::error::StoreError;
use crate::core::pick_uniform;

const OPEN_TIMEOUT_SECS: u64 = 5;

/// The per-site account/cookie store the cookie scheduler works against.
/// Every operation is individually atomic at the store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn set_account(&self, user: &str, secret: &str) -> Result<(), StoreError>;
    async fn get_account(&self, user: &str) -> Result<String, StoreError>;
    async fn delete_accounts(&self, users: &[String]) -> Result<(), StoreError>;
    async fn count_accounts(&self) -> Result<u64, StoreError>;
    async fn all_accounts(&self) -> Result<HashMap<String, String>, StoreError>;
    /// Usernames with a stored account.
    async fn usernames(&self) -> Result<Vec<String>, StoreError>;

    async fn set_cookie(&self, user: &str, jar_json: &str) -> Result<(), StoreError>;
    async fn get_cookie(&self, user: &str) -> Result<String, StoreError>;
    async fn delete_cookies(&self, users: &[String]) -> Result<(), StoreError>;
    async fn count_cookies(&self) -> Result<u64, StoreError>;
    async fn all_cookies(&self) -> Result<HashMap<String, String>, StoreError>;
    /// Uniform pick over stored jars; [`StoreError::Empty`] when none exist.
    async fn random_cookie(&self) -> Result<String, StoreError>;
}

/// Production [`CredentialStore`] on two Redis hashes: `account:{name}` and
/// `cookie:{name}`.
pub struct RedisCredentialStore {
    conn: redis::aio::MultiplexedConnection,
    account_key: String,
    cookie_key: String,
}

impl RedisCredentialStore {
    /// Open with one site name: both roles keyed under it.
    pub async fn open(addr: &str, password: &str, name: &str) -> Result<Self, StoreError> {
        Self::open_split(addr, password, name, name).await
    }

    /// Open with distinct names per role (accounts under the first, cookies
    /// under the second).
    pub async fn open_split(
        addr: &str,
        password: &str,
        account_name: &str,
        cookie_name: &str,
    ) -> Result<Self, StoreError> {
        let client = redis::Client::open(store_url(addr, password))?;
        let conn = tokio::time::timeout(
            Duration::from_secs(OPEN_TIMEOUT_SECS),
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StoreError::ConnectTimeout(OPEN_TIMEOUT_SECS))??;

        info!("credential store open: {addr} (accounts {account_name}, cookies {cookie_name})");
        Ok(Self {
            conn,
            account_key: format!("account:{account_name}"),
            cookie_key: format!("cookie:{cookie_name}"),
        })
    }

    fn conn(&self) -> redis::aio::MultiplexedConnection {
        self.conn.clone()
    }

    async fn set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str, field: &str) -> Result<String, StoreError> {
        let mut conn = self.conn();
        let value: Option<String> = conn.hget(key, field).await?;
        value.ok_or_else(|| StoreError::NotFound(field.to_string()))
    }

    async fn delete(&self, key: &str, fields: &[String]) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.hdel(key, fields.to_vec()).await?;
        Ok(())
    }

    async fn count(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn();
        Ok(conn.hlen(key).await?)
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.conn();
        Ok(conn.hgetall(key).await?)
    }
}

#[async_trait]
impl CredentialStore for RedisCredentialStore {
    async fn set_account(&self, user: &str, secret: &str) -> Result<(), StoreError> {
        self.set(&self.account_key, user, secret).await
    }

    async fn get_account(&self, user: &str) -> Result<String, StoreError> {
        self.get(&self.account_key, user).await
    }

    async fn delete_accounts(&self, users: &[String]) -> Result<(), StoreError> {
        self.delete(&self.account_key, users).await
    }

    async fn count_accounts(&self) -> Result<u64, StoreError> {
        self.count(&self.account_key).await
    }

    async fn all_accounts(&self) -> Result<HashMap<String, String>, StoreError> {
        self.get_all(&self.account_key).await
    }

    async fn usernames(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn();
        Ok(conn.hkeys(&self.account_key).await?)
    }

    async fn set_cookie(&self, user: &str, jar_json: &str) -> Result<(), StoreError> {
        self.set(&self.cookie_key, user, jar_json).await
    }

    async fn get_cookie(&self, user: &str) -> Result<String, StoreError> {
        self.get(&self.cookie_key, user).await
    }

    async fn delete_cookies(&self, users: &[String]) -> Result<(), StoreError> {
        self.delete(&self.cookie_key, users).await
    }

    async fn count_cookies(&self) -> Result<u64, StoreError> {
        self.count(&self.cookie_key).await
    }

    async fn all_cookies(&self) -> Result<HashMap<String, String>, StoreError> {
        self.get_all(&self.cookie_key).await
    }

    async fn random_cookie(&self) -> Result<String, StoreError> {
        let mut conn = self.conn();
        let jars: Vec<String> = conn.hvals(&self.cookie_key).await?;
        pick_uniform(&jars).ok_or_else(|| StoreError::Empty(self.cookie_key.clone()))
    }
}

fn store_url(addr: &str, password: &str) -> String {
    if password.is_empty() {
        format!("redis://{addr}/0")
    } else {
        format!("redis://:{password}@{addr}/0")
    }
}
