//! Cookie liveness: replay the jar against the site's validation URL and
//! compare the status code. Redirects are deliberately not followed — a
//! bounce to the login page is exactly the expiry signal.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::cookie::jar::{self, CookieJar};
use crate::core::USER_AGENT;

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait CookieValidator: Send + Sync {
    /// GET `url` with the jar attached. `Ok(true)` iff the response status
    /// matches `expected`.
    async fn validate(&self, url: &str, jar: &CookieJar, expected: u16) -> Result<bool>;
}

pub struct HttpValidator;

#[async_trait]
impl CookieValidator for HttpValidator {
    async fn validate(&self, url: &str, jar: &CookieJar, expected: u16) -> Result<bool> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(VALIDATE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let resp = client
            .get(url)
            .header(reqwest::header::COOKIE, jar::header_value(jar))
            .send()
            .await?;
        Ok(resp.status().as_u16() == expected)
    }
}
