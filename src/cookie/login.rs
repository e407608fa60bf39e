//! Per-site login drivers. The scheduler only cares about the three-way
//! outcome; how a site's login form, captcha, or API is driven lives
//! entirely in the driver.

use async_trait::async_trait;
use std::future::Future;

use crate::cookie::jar::CookieJar;

/// Outcome of one automated login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// The stored secret is rejected outright. The account is useless and
    /// gets purged; its stale cookie falls to the validation sweep.
    PasswordError,
    /// Transient failure — captcha, rate limit, outage. Retried next cycle.
    LoginFailed,
    /// A fresh session was established.
    LoginSuccessful(CookieJar),
}

#[async_trait]
pub trait LoginDriver: Send + Sync {
    async fn login(&self, user: &str, secret: &str) -> LoginState;
}

/// Adapter so a plain async closure can serve as a [`LoginDriver`].
pub struct LoginFn<F>(pub F);

#[async_trait]
impl<F, Fut> LoginDriver for LoginFn<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = LoginState> + Send,
{
    async fn login(&self, user: &str, secret: &str) -> LoginState {
        (self.0)(user.to_string(), secret.to_string()).await
    }
}
